//! Configuration file handling

use serde::Deserialize;
use std::path::{Path, PathBuf};

use super::paths::{config_path, default_output_dir, Corpus};
use super::Result;

/// Main configuration structure
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Fixture corpus locations
    #[serde(default)]
    pub corpus: CorpusConfig,

    /// Golden comparison settings
    #[serde(default)]
    pub golden: GoldenConfig,

    /// Scenario runner settings
    #[serde(default)]
    pub runner: RunnerConfig,
}

/// Where fixtures live and where actual artifacts go
#[derive(Debug, Deserialize)]
pub struct CorpusConfig {
    /// Directory holding inputs, override files and golden artifacts
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// Directory receiving `<test>_actual_results.*` files
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Working directory the checker runs in (temp archives land here)
    pub work_dir: Option<PathBuf>,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            output_dir: default_output_dir(),
            work_dir: None,
        }
    }
}

fn default_root() -> PathBuf {
    PathBuf::from("tests/fixtures/command_line")
}

/// A regex replacement applied to both sides before comparing
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct NormalizationRuleConfig {
    pub pattern: String,
    pub replacement: String,
}

/// Golden comparison settings
#[derive(Debug, Deserialize)]
pub struct GoldenConfig {
    /// Regex rules for volatile text (timestamps, tool versions)
    #[serde(default = "default_rules")]
    pub rules: Vec<NormalizationRuleConfig>,

    /// JSON pointers removed from both documents before comparing
    #[serde(default = "default_ignore_json")]
    pub ignore_json: Vec<String>,
}

impl Default for GoldenConfig {
    fn default() -> Self {
        Self {
            rules: default_rules(),
            ignore_json: default_ignore_json(),
        }
    }
}

fn default_rules() -> Vec<NormalizationRuleConfig> {
    [
        (r"\d{4}-\d{2}-\d{2}T[\d:.Z+\-]+", "TIMESTAMP"),
        (r#"version="[^"]*""#, r#"version="VERSION""#),
        (r"EPUBCheck v\d+(\.\d+)*", "EPUBCheck vVERSION"),
    ]
    .into_iter()
    .map(|(pattern, replacement)| NormalizationRuleConfig {
        pattern: pattern.to_string(),
        replacement: replacement.to_string(),
    })
    .collect()
}

fn default_ignore_json() -> Vec<String> {
    [
        "/checker/path",
        "/checker/checkerVersion",
        "/checker/checkDate",
        "/checker/elapsedTime",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

/// Scenario runner settings
#[derive(Debug, Deserialize, Default)]
pub struct RunnerConfig {
    /// Keep actual artifacts of passing scenarios
    #[serde(default)]
    pub keep_actual: bool,
}

impl Config {
    /// Load configuration from the default config file
    ///
    /// Returns default configuration if file doesn't exist
    pub fn load() -> Result<Self> {
        if let Some(path) = config_path() {
            if path.exists() {
                return Self::load_from(&path);
            }
        }
        Ok(Self::default())
    }

    /// Load configuration from an explicit file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| super::Error::file_read(path, &e))?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| super::Error::ConfigParse(e.to_string()))
    }

    /// The corpus described by this configuration
    pub fn corpus(&self) -> Corpus {
        Corpus::new(&self.corpus.root, &self.corpus.output_dir)
    }
}
