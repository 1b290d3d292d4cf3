//! Reported messages and the console, JSON, XML and XMP renderings of them

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use serde::Serialize;

use super::catalog::Severity;
use super::messages;
use super::CheckerError;

/// Where a message points, relative to the publication root.
///
/// An empty path means the publication as a whole.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub path: String,
    pub line: Option<u32>,
    pub column: Option<u32>,
}

impl Location {
    pub fn archive() -> Self {
        Self {
            path: String::new(),
            line: None,
            column: None,
        }
    }

    /// Parse `path`, `path(line,column)` or `-` (the whole publication)
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        if text == "-" || text.is_empty() {
            return Self::archive();
        }
        if let Some(inner) = text.strip_suffix(')') {
            if let Some((path, coords)) = inner.rsplit_once('(') {
                if let Some((line, column)) = coords.split_once(',') {
                    if let (Ok(line), Ok(column)) =
                        (line.trim().parse::<u32>(), column.trim().parse::<u32>())
                    {
                        return Self {
                            path: path.to_string(),
                            line: Some(line),
                            column: Some(column),
                        };
                    }
                }
            }
        }
        Self {
            path: text.to_string(),
            line: None,
            column: None,
        }
    }

    /// Location as printed on the console, prefixed with the publication name
    pub fn display(&self, publication: &str) -> String {
        let mut out = publication.to_string();
        if !self.path.is_empty() {
            out.push('/');
            out.push_str(&self.path);
        }
        if let (Some(line), Some(column)) = (self.line, self.column) {
            let _ = write!(out, "({},{})", line, column);
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: String,
    pub severity: Severity,
    pub text: String,
    /// `None` for messages about the checker run itself
    pub location: Option<Location>,
}

impl Message {
    /// One console line: `SEVERITY(ID): location: text`
    pub fn console_line(&self, publication: &str) -> String {
        match &self.location {
            Some(location) => format!(
                "{}({}): {}: {}",
                self.severity,
                self.id,
                location.display(publication),
                self.text
            ),
            None => format!("{}({}): {}", self.severity, self.id, self.text),
        }
    }
}

/// Per-severity counts of reported messages
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub fatals: usize,
    pub errors: usize,
    pub warnings: usize,
    pub usages: usize,
}

impl Summary {
    pub fn of(messages: &[Message]) -> Self {
        messages.iter().fold(Self::default(), |mut acc, m| {
            match m.severity {
                Severity::Fatal => acc.fatals += 1,
                Severity::Error => acc.errors += 1,
                Severity::Warning => acc.warnings += 1,
                Severity::Usage => acc.usages += 1,
                Severity::Info | Severity::Suppressed => {}
            }
            acc
        })
    }

    pub fn has_errors(&self) -> bool {
        self.fatals + self.errors > 0
    }

    /// Closing status line
    pub fn status_line(&self) -> String {
        let key = if self.has_errors() {
            "check_errors"
        } else if self.warnings > 0 {
            "check_warnings"
        } else {
            "no_errors"
        };
        messages::format(key, &[])
    }

    pub fn counts_line(&self) -> String {
        messages::format(
            "messages_summary",
            &[
                &self.fatals.to_string(),
                &self.errors.to_string(),
                &self.warnings.to_string(),
                &self.usages.to_string(),
            ],
        )
    }
}

/// Run-level facts every report format records
#[derive(Debug, Clone)]
pub struct ReportContext {
    /// Input path as given on the command line
    pub input_path: String,
    /// File name of the checked publication
    pub publication: String,
    pub version: String,
    pub check_date: String,
    pub elapsed_ms: u64,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    checker: JsonChecker<'a>,
    messages: Vec<JsonMessage<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonChecker<'a> {
    path: &'a str,
    filename: &'a str,
    checker_version: &'a str,
    check_date: &'a str,
    elapsed_time: u64,
    n_fatal: usize,
    n_error: usize,
    n_warning: usize,
    n_usage: usize,
}

#[derive(Serialize)]
struct JsonMessage<'a> {
    #[serde(rename = "ID")]
    id: &'a str,
    severity: &'static str,
    message: &'a str,
    locations: Vec<JsonLocation<'a>>,
}

#[derive(Serialize)]
struct JsonLocation<'a> {
    path: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    line: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    column: Option<u32>,
}

pub fn render_json(context: &ReportContext, reported: &[Message]) -> Result<String, CheckerError> {
    let summary = Summary::of(reported);
    let report = JsonReport {
        checker: JsonChecker {
            path: &context.input_path,
            filename: &context.publication,
            checker_version: &context.version,
            check_date: &context.check_date,
            elapsed_time: context.elapsed_ms,
            n_fatal: summary.fatals,
            n_error: summary.errors,
            n_warning: summary.warnings,
            n_usage: summary.usages,
        },
        messages: reported
            .iter()
            .map(|m| JsonMessage {
                id: &m.id,
                severity: m.severity.as_str(),
                message: &m.text,
                locations: m
                    .location
                    .iter()
                    .map(|l| JsonLocation {
                        path: if l.path.is_empty() {
                            &context.publication
                        } else {
                            &l.path
                        },
                        line: l.line,
                        column: l.column,
                    })
                    .collect(),
            })
            .collect(),
    };
    let mut text = serde_json::to_string_pretty(&report)?;
    text.push('\n');
    Ok(text)
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn render_xml(context: &ReportContext, reported: &[Message]) -> String {
    let summary = Summary::of(reported);
    let status = if summary.has_errors() {
        "Not well-formed"
    } else {
        "Well-formed"
    };

    let mut out = String::new();
    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    let _ = writeln!(
        out,
        "<epubcheck version=\"{}\" date=\"{}\">",
        escape_xml(&context.version),
        escape_xml(&context.check_date)
    );
    let _ = writeln!(out, "  <repInfo uri=\"{}\">", escape_xml(&context.publication));
    out.push_str("    <format>application/epub+zip</format>\n");
    let _ = writeln!(out, "    <status>{}</status>", status);
    let _ = writeln!(
        out,
        "    <summary fatals=\"{}\" errors=\"{}\" warnings=\"{}\" usages=\"{}\"/>",
        summary.fatals, summary.errors, summary.warnings, summary.usages
    );
    if reported.is_empty() {
        out.push_str("    <messages/>\n");
    } else {
        out.push_str("    <messages>\n");
        for message in reported {
            let _ = writeln!(
                out,
                "      <message id=\"{}\" severity=\"{}\">",
                escape_xml(&message.id),
                message.severity
            );
            let _ = writeln!(out, "        <text>{}</text>", escape_xml(&message.text));
            if let Some(location) = &message.location {
                let path = if location.path.is_empty() {
                    context.publication.as_str()
                } else {
                    location.path.as_str()
                };
                let _ = write!(out, "        <location path=\"{}\"", escape_xml(path));
                if let (Some(line), Some(column)) = (location.line, location.column) {
                    let _ = write!(out, " line=\"{}\" column=\"{}\"", line, column);
                }
                out.push_str("/>\n");
            }
            out.push_str("      </message>\n");
        }
        out.push_str("    </messages>\n");
    }
    out.push_str("  </repInfo>\n");
    out.push_str("</epubcheck>\n");
    out
}

pub fn render_xmp(context: &ReportContext, reported: &[Message]) -> String {
    let summary = Summary::of(reported);
    let mut out = String::new();
    out.push_str("<?xpacket begin=\"\" id=\"W5M0MpCehiHzreSzNTczkc9d\"?>\n");
    out.push_str("<x:xmpmeta xmlns:x=\"adobe:ns:meta/\">\n");
    out.push_str("  <rdf:RDF xmlns:rdf=\"http://www.w3.org/1999/02/22-rdf-syntax-ns#\">\n");
    out.push_str(
        "    <rdf:Description rdf:about=\"\" xmlns:dc=\"http://purl.org/dc/elements/1.1/\" xmlns:xmp=\"http://ns.adobe.com/xap/1.0/\">\n",
    );
    out.push_str("      <dc:format>application/epub+zip</dc:format>\n");
    let _ = writeln!(
        out,
        "      <dc:identifier>{}</dc:identifier>",
        escape_xml(&context.publication)
    );
    let _ = writeln!(
        out,
        "      <xmp:CreatorTool>EPUBCheck v{}</xmp:CreatorTool>",
        escape_xml(&context.version)
    );
    let _ = writeln!(
        out,
        "      <xmp:MetadataDate>{}</xmp:MetadataDate>",
        escape_xml(&context.check_date)
    );
    let _ = writeln!(
        out,
        "      <xmp:Label>{}</xmp:Label>",
        if summary.has_errors() {
            "Not well-formed"
        } else {
            "Well-formed"
        }
    );
    out.push_str("    </rdf:Description>\n");
    out.push_str("  </rdf:RDF>\n");
    out.push_str("</x:xmpmeta>\n");
    out.push_str("<?xpacket end=\"r\"?>\n");
    out
}

/// Machine-readable report selected on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Json,
    Xml,
    Xmp,
}

impl ReportFormat {
    pub fn render(self, context: &ReportContext, reported: &[Message]) -> Result<String, CheckerError> {
        Ok(match self {
            ReportFormat::Json => render_json(context, reported)?,
            ReportFormat::Xml => render_xml(context, reported),
            ReportFormat::Xmp => render_xmp(context, reported),
        })
    }

    pub fn write(
        self,
        path: &Path,
        context: &ReportContext,
        reported: &[Message],
    ) -> Result<(), CheckerError> {
        let text = self.render(context, reported)?;
        fs::write(path, text)?;
        tracing::debug!(format = ?self, path = %path.display(), "report written");
        Ok(())
    }
}
