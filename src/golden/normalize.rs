//! Normalization applied before comparing artifacts

use regex::Regex;
use std::sync::OnceLock;

use crate::common::config::NormalizationRuleConfig;
use crate::common::{Error, Result};

fn whitespace_run() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").unwrap_or_else(|e| panic!("invalid whitespace regex: {e}")))
}

/// Collapse every run of whitespace to a single space.
///
/// Leading and trailing runs become a single space too; callers that want
/// them gone trim afterwards.
pub fn normalize_whitespace(text: &str) -> String {
    whitespace_run().replace_all(text, " ").into_owned()
}

/// A regex replacement for volatile output (timestamps, versions)
#[derive(Debug, Clone)]
pub struct NormalizationRule {
    regex: Regex,
    replacement: String,
}

impl NormalizationRule {
    pub fn new(pattern: &str, replacement: &str) -> Result<Self> {
        let regex = Regex::new(pattern).map_err(|e| {
            Error::Config(format!("invalid normalization pattern '{}': {}", pattern, e))
        })?;
        Ok(Self {
            regex,
            replacement: replacement.to_string(),
        })
    }

    pub fn from_config(config: &NormalizationRuleConfig) -> Result<Self> {
        Self::new(&config.pattern, &config.replacement)
    }

    pub fn apply(&self, text: &str) -> String {
        self.regex
            .replace_all(text, self.replacement.as_str())
            .into_owned()
    }
}

/// Apply every rule in order
pub fn apply_rules(rules: &[NormalizationRule], text: &str) -> String {
    rules
        .iter()
        .fold(text.to_string(), |acc, rule| rule.apply(&acc))
}

/// Text lines with rules applied, whitespace collapsed and trimmed.
/// Trailing blank lines are dropped.
pub fn normalized_lines(rules: &[NormalizationRule], text: &str) -> Vec<String> {
    let mut lines: Vec<String> = apply_rules(rules, text)
        .lines()
        .map(|line| normalize_whitespace(line).trim().to_string())
        .collect();
    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines
}

/// Markup tokens: tags and text runs split apart, whitespace insignificant
pub fn markup_tokens(rules: &[NormalizationRule], text: &str) -> Vec<String> {
    apply_rules(rules, text)
        .replace('<', " <")
        .replace('>', "> ")
        .split_whitespace()
        .map(String::from)
        .collect()
}
