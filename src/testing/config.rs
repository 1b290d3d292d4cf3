//! Test scenario configuration types
//!
//! Defines the data structures for deserializing YAML test scenarios.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::common::{Error, Result};
use crate::golden::ArtifactFormat;

/// A complete test scenario loaded from a YAML file or built in code
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TestScenario {
    /// Name of the scenario; also the stem of its golden artifacts
    pub name: String,
    /// Optional description of what the scenario verifies
    pub description: Option<String>,
    /// Input folder or archive, relative to the corpus root
    pub input: Option<String>,
    /// Checker mode passed as `-mode <mode>`
    pub mode: Option<String>,
    /// Extra arguments placed after the input and mode
    #[serde(default)]
    pub args: Vec<String>,
    /// Override file passed as `-c <file>`, relative to the corpus root
    pub override_config: Option<String>,
    /// Where the checker's console output goes
    #[serde(default)]
    pub capture: CaptureMode,
    /// Report written next to the other actual artifacts
    pub report: Option<ArtifactFormat>,
    /// What the run must produce
    #[serde(default)]
    pub expect: Expectations,
}

/// Console capture target
#[derive(Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CaptureMode {
    /// Separate in-memory stdout and stderr buffers
    #[default]
    Memory,
    /// Both channels into `<test>_actual_results.txt`
    File,
}

/// Expectations checked in the COMPARE phase
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Expectations {
    #[serde(default)]
    pub exit_code: i32,
    /// Exact stdout after trimming
    pub stdout_equals: Option<String>,
    /// Exact stderr after trimming
    pub stderr_equals: Option<String>,
    /// Substrings of stdout, whitespace-insensitive
    #[serde(default)]
    pub stdout_contains: Vec<String>,
    /// Substrings of stderr, whitespace-insensitive
    #[serde(default)]
    pub stderr_contains: Vec<String>,
    /// Compare actual artifacts against `<test>_expected_results.*`
    #[serde(default)]
    pub golden: bool,
}

impl Default for Expectations {
    fn default() -> Self {
        Self {
            exit_code: 0,
            stdout_equals: None,
            stderr_equals: None,
            stdout_contains: Vec::new(),
            stderr_contains: Vec::new(),
            golden: false,
        }
    }
}

impl TestScenario {
    /// A scenario with no input, arguments or expectations yet
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            input: None,
            mode: None,
            args: Vec::new(),
            override_config: None,
            capture: CaptureMode::default(),
            report: None,
            expect: Expectations::default(),
        }
    }

    /// Check an expanded fixture folder (`-mode exp`)
    pub fn expanded(name: impl Into<String>, input: impl Into<String>) -> Self {
        Self {
            input: Some(input.into()),
            mode: Some("exp".to_string()),
            ..Self::new(name)
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn override_config(mut self, file: impl Into<String>) -> Self {
        self.override_config = Some(file.into());
        self
    }

    pub fn capture(mut self, capture: CaptureMode) -> Self {
        self.capture = capture;
        self
    }

    pub fn report(mut self, format: ArtifactFormat) -> Self {
        self.report = Some(format);
        self
    }

    pub fn exit_code(mut self, code: i32) -> Self {
        self.expect.exit_code = code;
        self
    }

    pub fn golden(mut self) -> Self {
        self.expect.golden = true;
        self
    }

    pub fn stdout_equals(mut self, text: impl Into<String>) -> Self {
        self.expect.stdout_equals = Some(text.into());
        self
    }

    pub fn stderr_equals(mut self, text: impl Into<String>) -> Self {
        self.expect.stderr_equals = Some(text.into());
        self
    }

    pub fn stdout_contains(mut self, text: impl Into<String>) -> Self {
        self.expect.stdout_contains.push(text.into());
        self
    }

    pub fn stderr_contains(mut self, text: impl Into<String>) -> Self {
        self.expect.stderr_contains.push(text.into());
        self
    }

    /// Parse a scenario from YAML text; `origin` names the source in errors
    pub fn from_yaml(content: &str, origin: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| Error::ScenarioParse {
            path: origin.to_string(),
            error: e.to_string(),
        })
    }

    /// Load a scenario from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::file_read(path, &e))?;
        Self::from_yaml(&content, &path.display().to_string())
    }
}

/// Scenario files under `path`: the file itself, or every `*.yaml`/`*.yml`
/// directly inside a directory, sorted by name
pub fn scenario_files(path: &Path) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    if !path.is_dir() {
        return Err(Error::fixture_missing("Scenario path", path));
    }
    let mut files = Vec::new();
    for entry in walkdir::WalkDir::new(path)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| Error::Io(e.into()))?;
        let is_yaml = entry
            .path()
            .extension()
            .is_some_and(|ext| ext == "yaml" || ext == "yml");
        if entry.file_type().is_file() && is_yaml {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}
