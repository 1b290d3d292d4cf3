//! Custom message override files
//!
//! One override per line, tab separated: `ID<TAB>SEVERITY[<TAB>message]`.
//! Blank lines and lines starting with `#` are ignored. A line that cannot
//! be applied is reported as a CHK message and skipped; the remaining lines
//! still take effect.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use super::catalog::{self, CatalogEntry, Severity};
use super::messages::{parameter_count, render};
use super::report::Message;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Override {
    severity: Severity,
    message: Option<String>,
}

/// Catalog defaults with user overrides applied
#[derive(Debug, Clone, Default)]
pub struct Dictionary {
    overrides: HashMap<String, Override>,
}

impl Dictionary {
    /// Effective severity of a catalog entry
    pub fn severity(&self, entry: &CatalogEntry) -> Severity {
        self.overrides
            .get(entry.id)
            .map(|o| o.severity)
            .unwrap_or(entry.severity)
    }

    /// Effective severity and rendered text for an id, `None` when unknown
    pub fn resolve<S: AsRef<str>>(&self, id: &str, args: &[S]) -> Option<(Severity, String)> {
        let entry = catalog::lookup(id)?;
        let text = match self.overrides.get(id).and_then(|o| o.message.as_deref()) {
            Some(template) => render(template, args),
            None => entry.render(args),
        };
        Some((self.severity(entry), text))
    }

    pub fn len(&self) -> usize {
        self.overrides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.overrides.is_empty()
    }
}

fn problem(id: &str, args: &[&str]) -> Message {
    let (severity, text) = match catalog::lookup(id) {
        Some(entry) => (entry.severity, entry.render(args)),
        None => (Severity::Error, id.to_string()),
    };
    Message {
        id: id.to_string(),
        severity,
        text,
        location: None,
    }
}

/// Load an override file. Problems come back as CHK messages, never as errors.
pub fn load(path: &Path) -> (Dictionary, Vec<Message>) {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    match fs::read_to_string(path) {
        Ok(content) => parse(&content, &name),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "override file unreadable");
            (Dictionary::default(), vec![problem("CHK-001", &[&name])])
        }
    }
}

/// Parse override text; `name` is used in CHK messages
pub fn parse(content: &str, name: &str) -> (Dictionary, Vec<Message>) {
    let mut dictionary = Dictionary::default();
    let mut problems = Vec::new();

    for (index, raw) in content.lines().enumerate() {
        let line = raw.trim_end_matches('\r');
        if line.trim().is_empty() || line.trim_start().starts_with('#') {
            continue;
        }

        let mut fields = line.splitn(3, '\t');
        let id = fields.next().unwrap_or_default().trim();
        let Some(severity_text) = fields.next() else {
            problems.push(problem("CHK-005", &[&(index + 1).to_string(), name]));
            continue;
        };
        let message = fields
            .next()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(String::from);

        let Some(entry) = catalog::lookup(id) else {
            problems.push(problem("CHK-002", &[id, name]));
            continue;
        };
        let Ok(severity) = severity_text.parse::<Severity>() else {
            problems.push(problem("CHK-003", &[severity_text.trim(), name]));
            continue;
        };
        if let Some(template) = &message {
            if parameter_count(template) > parameter_count(entry.template) {
                problems.push(problem("CHK-004", &[id, name]));
                continue;
            }
        }

        tracing::debug!(id, %severity, "message override");
        dictionary
            .overrides
            .insert(id.to_string(), Override { severity, message });
    }

    (dictionary, problems)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_applies_severity_and_message() {
        let (dict, problems) = parse(
            "# comment\n\nRSC-005\tWARNING\nOPF-003\tsuppressed\nACC-004\tERROR\tHyperlink has no text content.\n",
            "ok.txt",
        );
        assert!(problems.is_empty());
        assert_eq!(dict.len(), 3);
        assert_eq!(
            dict.resolve("RSC-005", &["x"]),
            Some((Severity::Warning, "Error while parsing file: x".to_string()))
        );
        assert_eq!(
            dict.resolve::<&str>("OPF-003", &[]).map(|r| r.0),
            Some(Severity::Suppressed)
        );
        assert_eq!(
            dict.resolve::<&str>("ACC-004", &[]),
            Some((Severity::Error, "Hyperlink has no text content.".to_string()))
        );
    }

    #[test]
    fn test_bad_lines_are_reported_and_skipped() {
        let (dict, problems) = parse(
            "XYZ-999\tERROR\nRSC-005\tSEVERE\nRSC-005\tERROR\tnear %1$s and %2$s\nPKG-010\nOPF-085\tUSAGE\n",
            "bad.txt",
        );
        let ids: Vec<_> = problems.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["CHK-002", "CHK-003", "CHK-004", "CHK-005"]);
        assert_eq!(
            problems[0].text,
            "Unrecognized custom message id XYZ-999 encountered in message overrides file 'bad.txt'."
        );
        assert_eq!(
            problems[3].text,
            "Unable to parse line 4 of message overrides file 'bad.txt'."
        );
        assert!(problems.iter().all(|p| p.location.is_none()));

        assert_eq!(dict.len(), 1);
        assert_eq!(
            dict.resolve("OPF-085", &["u"]).map(|r| r.0),
            Some(Severity::Usage)
        );
    }

    #[test]
    fn test_missing_file_names_file_only() {
        let dir = tempfile::tempdir().unwrap();
        let (dict, problems) = load(&dir.path().join("nowhere.txt"));
        assert!(dict.is_empty());
        assert_eq!(problems.len(), 1);
        assert_eq!(
            problems[0].text,
            "The custom message overrides file was not found: nowhere.txt"
        );
    }
}
