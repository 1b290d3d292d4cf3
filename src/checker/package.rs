//! Publication archives
//!
//! A directory checked with `-mode exp` is packaged into `<name>.epub` in
//! the current working directory, `mimetype` first and stored
//! uncompressed. The temporary archive is removed when the [`Publication`]
//! is dropped.

use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::report::Location;
use super::CheckerError;

/// Archive entry listing the issues a fixture publication carries
pub const ISSUES_ENTRY: &str = ".issues";
const MIMETYPE: &str = "mimetype";

/// An archive under check
#[derive(Debug)]
pub struct Publication {
    path: PathBuf,
    name: String,
    temporary: bool,
}

impl Publication {
    /// Use an existing archive as is
    pub fn open(path: &Path) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            path: path.to_path_buf(),
            name,
            temporary: false,
        }
    }

    /// Package an expanded directory into `<cwd>/<dirname>.epub`
    pub fn package(dir: &Path) -> Result<Self, CheckerError> {
        let dir = dir.canonicalize()?;
        let stem = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "publication".to_string());
        let name = format!("{}.epub", stem);
        let path = std::env::current_dir()?.join(&name);

        // Owns the file from here on so a failed write still cleans up
        let publication = Self {
            path,
            name,
            temporary: true,
        };

        let mut entries: Vec<(String, PathBuf)> = Vec::new();
        for item in WalkDir::new(&dir).sort_by_file_name() {
            let item = item?;
            if !item.file_type().is_file() {
                continue;
            }
            let relative = item
                .path()
                .strip_prefix(&dir)
                .unwrap_or(item.path())
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/");
            entries.push((relative, item.path().to_path_buf()));
        }
        // mimetype leads the archive
        entries.sort_by_key(|(name, _)| name != MIMETYPE);

        let mut writer = ZipWriter::new(File::create(&publication.path)?);
        for (entry_name, source) in &entries {
            let method = if entry_name == MIMETYPE {
                CompressionMethod::Stored
            } else {
                CompressionMethod::Deflated
            };
            writer.start_file(
                entry_name.as_str(),
                SimpleFileOptions::default().compression_method(method),
            )?;
            let mut data = Vec::new();
            File::open(source)?.read_to_end(&mut data)?;
            writer.write_all(&data)?;
        }
        writer.finish()?;

        tracing::debug!(
            dir = %dir.display(),
            archive = %publication.path.display(),
            entries = entries.len(),
            "packaged expanded publication"
        );
        Ok(publication)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_temporary(&self) -> bool {
        self.temporary
    }

    /// Read the entry listing and the issues entry
    pub fn read(&self) -> Result<Contents, CheckerError> {
        let mut archive = ZipArchive::new(File::open(&self.path)?)?;
        let entries: Vec<String> = archive.file_names().map(String::from).collect();
        let first_entry = if archive.is_empty() {
            None
        } else {
            Some(archive.by_index(0)?.name().to_string())
        };
        let issues = match archive.by_name(ISSUES_ENTRY) {
            Ok(mut entry) => {
                let mut text = String::new();
                entry.read_to_string(&mut text)?;
                parse_issues(&text)?
            }
            Err(zip::result::ZipError::FileNotFound) => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Contents {
            first_entry,
            entries,
            issues,
        })
    }
}

impl Drop for Publication {
    fn drop(&mut self) {
        if self.temporary {
            if let Err(e) = std::fs::remove_file(&self.path) {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to remove temporary archive");
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contents {
    pub first_entry: Option<String>,
    pub entries: Vec<String>,
    pub issues: Vec<Issue>,
}

impl Contents {
    pub fn mimetype_first(&self) -> bool {
        self.first_entry.as_deref() == Some(MIMETYPE)
    }
}

/// One issue carried by a publication: `ID<TAB>location<TAB>args...`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub id: String,
    pub location: Location,
    pub args: Vec<String>,
}

pub fn parse_issues(text: &str) -> Result<Vec<Issue>, CheckerError> {
    let mut issues = Vec::new();
    for (index, raw) in text.lines().enumerate() {
        let line = raw.trim_end_matches('\r');
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }
        let mut fields = line.split('\t');
        let id = fields.next().unwrap_or_default().trim();
        let Some(location) = fields.next() else {
            return Err(CheckerError::Manifest {
                line: index + 1,
                reason: "expected ID<TAB>location".to_string(),
            });
        };
        if super::catalog::lookup(id).is_none() {
            return Err(CheckerError::Manifest {
                line: index + 1,
                reason: format!("unknown message id '{}'", id),
            });
        }
        issues.push(Issue {
            id: id.to_string(),
            location: Location::parse(location),
            args: fields.map(String::from).collect(),
        });
    }
    Ok(issues)
}
