//! Scoped current working directory

use std::io;
use std::path::{Path, PathBuf};

use super::{exclusive, Exclusive};

/// Changes the process working directory and changes it back on drop
pub struct WorkingDir {
    previous: PathBuf,
    _exclusive: Exclusive,
}

impl WorkingDir {
    pub fn enter(dir: &Path) -> io::Result<Self> {
        let exclusive = exclusive();
        let previous = std::env::current_dir()?;
        std::env::set_current_dir(dir)?;
        tracing::debug!(dir = %dir.display(), "entered working directory");
        Ok(Self {
            previous,
            _exclusive: exclusive,
        })
    }

    /// The directory that is restored on drop
    pub fn previous(&self) -> &Path {
        &self.previous
    }
}

impl Drop for WorkingDir {
    fn drop(&mut self) {
        if let Err(e) = std::env::set_current_dir(&self.previous) {
            tracing::error!(
                dir = %self.previous.display(),
                "failed to restore working directory: {}",
                e
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enter_and_restore() {
        let _lock = exclusive();
        let original = std::env::current_dir().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().canonicalize().unwrap();

        {
            let guard = WorkingDir::enter(&target).unwrap();
            assert_eq!(guard.previous(), original.as_path());
            assert_eq!(std::env::current_dir().unwrap().canonicalize().unwrap(), target);
        }

        assert_eq!(std::env::current_dir().unwrap(), original);
    }
}
