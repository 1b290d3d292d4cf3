//! Golden-file comparison
//!
//! Two modes: plain string equivalence after trimming, and artifact
//! equivalence between an expected file and an actual file. Artifact
//! comparison normalizes volatile fragments first and reports the first
//! differing line, token or JSON pointer with both values.
//!
//! A missing expected file is [`GoldenError::ExpectedMissing`], never a
//! mismatch, so an absent fixture can be told apart from a contradicted one.

mod json;
mod normalize;

use serde::Deserialize;
use similar::TextDiff;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::common::config::GoldenConfig;
use crate::common::Result;

pub use json::{first_difference, strip_pointer};
pub use normalize::{
    apply_rules, markup_tokens, normalize_whitespace, normalized_lines, NormalizationRule,
};

/// Kind of artifact being compared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactFormat {
    Text,
    Json,
    Xml,
    Xmp,
}

impl ArtifactFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ArtifactFormat::Text => "txt",
            ArtifactFormat::Json => "json",
            ArtifactFormat::Xml => "xml",
            ArtifactFormat::Xmp => "xmp",
        }
    }
}

impl fmt::Display for ArtifactFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl std::str::FromStr for ArtifactFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "txt" => Ok(ArtifactFormat::Text),
            "json" => Ok(ArtifactFormat::Json),
            "xml" => Ok(ArtifactFormat::Xml),
            "xmp" => Ok(ArtifactFormat::Xmp),
            other => Err(format!("unknown artifact format '{}'", other)),
        }
    }
}

impl ArtifactFormat {
    /// Format implied by a file extension; anything unknown is text
    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| ext.parse().ok())
            .unwrap_or(ArtifactFormat::Text)
    }
}

/// Where two artifacts first disagree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Position {
    /// The whole (trimmed) string
    Whole,
    /// 1-based line number
    Line(usize),
    /// 1-based markup token index
    Token(usize),
    /// JSON pointer
    Pointer(String),
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Position::Whole => f.write_str("content"),
            Position::Line(n) => write!(f, "line {}", n),
            Position::Token(n) => write!(f, "token {}", n),
            Position::Pointer(p) => write!(f, "{}", p),
        }
    }
}

/// Comparison failures
#[derive(Error, Debug)]
pub enum GoldenError {
    #[error("Expected artifact missing: {}", .0.display())]
    ExpectedMissing(PathBuf),

    #[error("Actual artifact missing: {}", .0.display())]
    ActualMissing(PathBuf),

    #[error("Mismatch at {position}: expected '{expected}', got '{actual}'")]
    Mismatch {
        position: Position,
        expected: String,
        actual: String,
        /// Unified diff of the normalized artifacts, when files were compared
        diff: Option<String>,
    },

    #[error("Failed to read artifact '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Artifact '{}' is not valid {format}: {message}", .path.display())]
    Parse {
        path: PathBuf,
        format: ArtifactFormat,
        message: String,
    },
}

impl GoldenError {
    fn mismatch(position: Position, expected: impl Into<String>, actual: impl Into<String>) -> Self {
        GoldenError::Mismatch {
            position,
            expected: expected.into(),
            actual: actual.into(),
            diff: None,
        }
    }

    fn with_diff(self, diff: String) -> Self {
        match self {
            GoldenError::Mismatch {
                position,
                expected,
                actual,
                ..
            } => GoldenError::Mismatch {
                position,
                expected,
                actual,
                diff: Some(diff),
            },
            other => other,
        }
    }

    /// The unified diff attached to a mismatch
    pub fn diff(&self) -> Option<&str> {
        match self {
            GoldenError::Mismatch { diff, .. } => diff.as_deref(),
            _ => None,
        }
    }
}

const END_OF_FILE: &str = "<end of file>";

/// Exact equality after trimming both sides
pub fn assert_trimmed_eq(expected: &str, actual: &str) -> std::result::Result<(), GoldenError> {
    let (expected, actual) = (expected.trim(), actual.trim());
    if expected == actual {
        Ok(())
    } else {
        Err(GoldenError::mismatch(Position::Whole, expected, actual))
    }
}

/// `haystack` contains `needle` once all whitespace runs are collapsed
pub fn assert_contains_normalized(
    haystack: &str,
    needle: &str,
) -> std::result::Result<(), GoldenError> {
    let haystack = normalize_whitespace(haystack);
    let needle = normalize_whitespace(needle);
    if haystack.contains(needle.trim()) {
        Ok(())
    } else {
        Err(GoldenError::mismatch(Position::Whole, needle.trim(), haystack.trim()))
    }
}

/// Compares expected and actual artifacts under configured normalization
#[derive(Debug, Clone, Default)]
pub struct Comparator {
    rules: Vec<NormalizationRule>,
    ignore_json: Vec<String>,
}

impl Comparator {
    pub fn new(rules: Vec<NormalizationRule>, ignore_json: Vec<String>) -> Self {
        Self { rules, ignore_json }
    }

    pub fn from_config(config: &GoldenConfig) -> Result<Self> {
        let rules = config
            .rules
            .iter()
            .map(NormalizationRule::from_config)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(rules, config.ignore_json.clone()))
    }

    /// Compare two files of the given format
    pub fn compare(
        &self,
        expected: &Path,
        actual: &Path,
        format: ArtifactFormat,
    ) -> std::result::Result<(), GoldenError> {
        let expected_text = read_artifact(expected, true)?;
        let actual_text = read_artifact(actual, false)?;
        tracing::debug!(
            expected = %expected.display(),
            actual = %actual.display(),
            %format,
            "comparing artifacts"
        );
        self.compare_sources(
            (&expected_text, expected),
            (&actual_text, actual),
            format,
        )
        .map_err(|err| match format {
                ArtifactFormat::Json => err,
                _ => {
                    let diff = self.render_diff(&expected_text, &actual_text);
                    err.with_diff(diff)
                }
            })
    }

    /// Compare two in-memory artifacts of the given format
    pub fn compare_str(
        &self,
        expected: &str,
        actual: &str,
        format: ArtifactFormat,
    ) -> std::result::Result<(), GoldenError> {
        self.compare_sources(
            (expected, Path::new("expected")),
            (actual, Path::new("actual")),
            format,
        )
    }

    /// Compare texts, naming each side by its origin in parse errors
    fn compare_sources(
        &self,
        (expected, expected_origin): (&str, &Path),
        (actual, actual_origin): (&str, &Path),
        format: ArtifactFormat,
    ) -> std::result::Result<(), GoldenError> {
        match format {
            ArtifactFormat::Text => self.compare_lines(expected, actual),
            ArtifactFormat::Xml | ArtifactFormat::Xmp => self.compare_tokens(expected, actual),
            ArtifactFormat::Json => {
                let expected = parse_json(expected, expected_origin)?;
                let actual = parse_json(actual, actual_origin)?;
                self.compare_json(expected, actual)
            }
        }
    }

    fn compare_lines(&self, expected: &str, actual: &str) -> std::result::Result<(), GoldenError> {
        let expected = normalized_lines(&self.rules, expected);
        let actual = normalized_lines(&self.rules, actual);
        first_mismatch(&expected, &actual).map_or(Ok(()), |(index, exp, act)| {
            Err(GoldenError::mismatch(Position::Line(index + 1), exp, act))
        })
    }

    fn compare_tokens(&self, expected: &str, actual: &str) -> std::result::Result<(), GoldenError> {
        let expected = markup_tokens(&self.rules, expected);
        let actual = markup_tokens(&self.rules, actual);
        first_mismatch(&expected, &actual).map_or(Ok(()), |(index, exp, act)| {
            Err(GoldenError::mismatch(Position::Token(index + 1), exp, act))
        })
    }

    fn compare_json(
        &self,
        mut expected: serde_json::Value,
        mut actual: serde_json::Value,
    ) -> std::result::Result<(), GoldenError> {
        for pointer in &self.ignore_json {
            strip_pointer(&mut expected, pointer);
            strip_pointer(&mut actual, pointer);
        }
        first_difference(&expected, &actual).map_or(Ok(()), |(pointer, exp, act)| {
            Err(GoldenError::mismatch(Position::Pointer(pointer), exp, act))
        })
    }

    fn render_diff(&self, expected: &str, actual: &str) -> String {
        let expected = apply_rules(&self.rules, expected);
        let actual = apply_rules(&self.rules, actual);
        TextDiff::from_lines(&expected, &actual)
            .unified_diff()
            .context_radius(3)
            .header("expected", "actual")
            .to_string()
    }
}

fn first_mismatch<'a>(
    expected: &'a [String],
    actual: &'a [String],
) -> Option<(usize, &'a str, &'a str)> {
    let longest = expected.len().max(actual.len());
    (0..longest).find_map(|i| {
        let exp = expected.get(i).map_or(END_OF_FILE, String::as_str);
        let act = actual.get(i).map_or(END_OF_FILE, String::as_str);
        (exp != act).then_some((i, exp, act))
    })
}

fn parse_json(text: &str, origin: &Path) -> std::result::Result<serde_json::Value, GoldenError> {
    serde_json::from_str(text).map_err(|e| GoldenError::Parse {
        path: origin.to_path_buf(),
        format: ArtifactFormat::Json,
        message: e.to_string(),
    })
}

fn read_artifact(path: &Path, expected: bool) -> std::result::Result<String, GoldenError> {
    std::fs::read_to_string(path).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound if expected => GoldenError::ExpectedMissing(path.to_path_buf()),
        io::ErrorKind::NotFound => GoldenError::ActualMissing(path.to_path_buf()),
        _ => GoldenError::Read {
            path: path.to_path_buf(),
            source,
        },
    })
}
