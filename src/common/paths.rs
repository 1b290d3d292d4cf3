//! Corpus layout and configuration paths
//!
//! Golden and actual artifacts are resolved by test name plus a fixed
//! suffix: `<test>_expected_results.<ext>` lives in the corpus,
//! `<test>_actual_results.<ext>` in the output directory.

use std::io;
use std::path::{Path, PathBuf};

use crate::golden::ArtifactFormat;

/// Name used for the configuration and log directories
const APP_NAME: &str = "epubcheck-harness";

/// Suffix of checked-in golden artifacts
pub const EXPECTED_SUFFIX: &str = "_expected_results";

/// Suffix of artifacts produced by a run
pub const ACTUAL_SUFFIX: &str = "_actual_results";

/// A fixture corpus: read-only inputs and goldens plus a scratch output directory
#[derive(Debug, Clone)]
pub struct Corpus {
    root: PathBuf,
    output_dir: PathBuf,
}

impl Corpus {
    /// Corpus rooted at `root`, writing actual artifacts into `output_dir`
    pub fn new(root: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            output_dir: output_dir.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Path of a fixture resource (input folder, override file, ...)
    pub fn resource(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Golden artifact for a test
    pub fn expected(&self, test_name: &str, format: ArtifactFormat) -> PathBuf {
        self.root.join(artifact_file_name(test_name, EXPECTED_SUFFIX, format))
    }

    /// Actual artifact for a test
    pub fn actual(&self, test_name: &str, format: ArtifactFormat) -> PathBuf {
        self.output_dir
            .join(artifact_file_name(test_name, ACTUAL_SUFFIX, format))
    }

    /// Create the output directory if needed
    pub fn ensure_output_dir(&self) -> io::Result<()> {
        std::fs::create_dir_all(&self.output_dir)
    }
}

fn artifact_file_name(test_name: &str, suffix: &str, format: ArtifactFormat) -> String {
    format!("{}{}.{}", test_name, suffix, format.extension())
}

/// Get the configuration directory path
///
/// Uses the directories crate for platform-appropriate locations:
/// - Linux: `~/.config/epubcheck-harness/`
/// - macOS: `~/Library/Application Support/epubcheck-harness/`
/// - Windows: `%APPDATA%\epubcheck-harness\`
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the configuration file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("harness.toml"))
}

/// Get the path to the log directory
pub fn log_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.data_dir().join("logs"))
}

/// Default scratch directory for actual artifacts
pub fn default_output_dir() -> PathBuf {
    std::env::temp_dir().join(APP_NAME)
}
