//! Error types for the harness
//!
//! Checker outcomes (usage errors, bad override files, validation issues)
//! are never errors here: they arrive as exit codes and captured text.
//! These variants cover harness and fixture problems only.

use std::io;
use thiserror::Error;

use crate::golden::GoldenError;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the harness
#[derive(Error, Debug)]
pub enum Error {
    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    // === Fixture Errors ===
    #[error("Fixture missing: {0}")]
    Fixture(String),

    #[error("Failed to parse scenario '{path}': {error}")]
    ScenarioParse { path: String, error: String },

    // === Comparison Errors ===
    #[error(transparent)]
    Golden(#[from] GoldenError),

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },
}

impl Error {
    /// Create a file read error for a path
    pub fn file_read(path: &std::path::Path, error: &io::Error) -> Self {
        Self::FileRead {
            path: path.display().to_string(),
            error: error.to_string(),
        }
    }

    /// Create a fixture error for a missing resource
    pub fn fixture_missing(what: &str, path: &std::path::Path) -> Self {
        Self::Fixture(format!("{} is missing: {}", what, path.display()))
    }

    /// Whether this error means a fixture is absent rather than contradicted
    pub fn is_fixture_absent(&self) -> bool {
        matches!(
            self,
            Error::Fixture(_) | Error::Golden(GoldenError::ExpectedMissing(_))
        )
    }
}
