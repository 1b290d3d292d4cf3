//! Message catalog: ids, default severities and message templates

use std::fmt;
use std::str::FromStr;

use super::messages::render;

/// Message severity, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Severity {
    /// Never reported
    Suppressed,
    Info,
    Usage,
    Warning,
    Error,
    Fatal,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Suppressed => "SUPPRESSED",
            Severity::Info => "INFO",
            Severity::Usage => "USAGE",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
            Severity::Fatal => "FATAL",
        }
    }

    /// Errors and fatals go to stderr
    pub fn is_error(self) -> bool {
        self >= Severity::Error
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SUPPRESSED" => Ok(Severity::Suppressed),
            "INFO" => Ok(Severity::Info),
            "USAGE" => Ok(Severity::Usage),
            "WARNING" => Ok(Severity::Warning),
            "ERROR" => Ok(Severity::Error),
            "FATAL" => Ok(Severity::Fatal),
            _ => Err(s.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogEntry {
    pub id: &'static str,
    pub severity: Severity,
    pub template: &'static str,
}

const fn entry(id: &'static str, severity: Severity, template: &'static str) -> CatalogEntry {
    CatalogEntry {
        id,
        severity,
        template,
    }
}

const ENTRIES: &[CatalogEntry] = &[
    entry(
        "CHK-001",
        Severity::Error,
        "The custom message overrides file was not found: %1$s",
    ),
    entry(
        "CHK-002",
        Severity::Error,
        "Unrecognized custom message id %1$s encountered in message overrides file '%2$s'.",
    ),
    entry(
        "CHK-003",
        Severity::Error,
        "Unrecognized custom message severity '%1$s' encountered in message overrides file '%2$s'.",
    ),
    entry(
        "CHK-004",
        Severity::Error,
        "The custom message for id %1$s contains too many parameters in message overrides file '%2$s'.",
    ),
    entry(
        "CHK-005",
        Severity::Error,
        "Unable to parse line %1$s of message overrides file '%2$s'.",
    ),
    entry(
        "PKG-006",
        Severity::Error,
        "Mimetype file entry is missing or is not the first file in the archive.",
    ),
    entry(
        "PKG-010",
        Severity::Warning,
        "Filename contains spaces, therefore URI escaping is necessary. Consider removing spaces from filename.",
    ),
    entry("RSC-005", Severity::Error, "Error while parsing file: %1$s"),
    entry(
        "RSC-007",
        Severity::Error,
        "Referenced resource \"%1$s\" could not be found in the EPUB.",
    ),
    entry(
        "RSC-016",
        Severity::Fatal,
        "Fatal Error while parsing file: %1$s",
    ),
    entry(
        "OPF-003",
        Severity::Usage,
        "Item \"%1$s\" exists in the EPUB, but is not declared in the OPF manifest.",
    ),
    entry(
        "OPF-085",
        Severity::Warning,
        "\"dc:identifier\" value \"%1$s\" is marked as a UUID, but is an invalid UUID.",
    ),
    entry("ACC-004", Severity::Usage, "Html \"a\" element must have text."),
];

pub fn entries() -> &'static [CatalogEntry] {
    ENTRIES
}

pub fn lookup(id: &str) -> Option<&'static CatalogEntry> {
    ENTRIES.iter().find(|e| e.id == id)
}

impl CatalogEntry {
    pub fn render<S: AsRef<str>>(&self, args: &[S]) -> String {
        render(self.template, args)
    }
}
