//! Command-line parsing for the checker
//!
//! The option set mirrors the upstream tool: single-dash short options,
//! long options in camelCase and a positional input path. Parsing is by
//! hand because `-mode`, `-help` and `-?` are not expressible as clap flags.

use std::path::PathBuf;

use thiserror::Error;

use super::catalog::Severity;
use super::messages;
use super::report::ReportFormat;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckerArgs {
    pub input: Option<PathBuf>,
    pub mode: Option<String>,
    /// Every report flag seen, in order; more than one is a conflict
    pub reports: Vec<(ReportFormat, PathBuf)>,
    /// Least severe level that is reported
    pub floor: Severity,
    pub custom_messages: Option<PathBuf>,
    pub fail_on_warnings: bool,
    pub help: bool,
    pub version: bool,
    pub list_checks: bool,
}

impl Default for CheckerArgs {
    fn default() -> Self {
        Self {
            input: None,
            mode: None,
            reports: Vec::new(),
            floor: Severity::Warning,
            custom_messages: None,
            fail_on_warnings: false,
            help: false,
            version: false,
            list_checks: false,
        }
    }
}

/// Rejected command line
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UsageError {
    #[error("{}", usage_text("unrecognized_argument", .0))]
    Unrecognized(String),

    #[error("{}", usage_text("missing_value", .0))]
    MissingValue(String),
}

fn usage_text(key: &str, arg: &str) -> String {
    messages::format(key, &[arg])
}

pub fn parse(args: &[String]) -> Result<CheckerArgs, UsageError> {
    let mut parsed = CheckerArgs::default();
    let mut i = 0;

    while i < args.len() {
        let arg = args[i].as_str();
        let mut value = |flag: &str| -> Result<String, UsageError> {
            i += 1;
            args.get(i)
                .cloned()
                .ok_or_else(|| UsageError::MissingValue(flag.to_string()))
        };

        match arg {
            "-mode" | "--mode" => parsed.mode = Some(value(arg)?),
            "-o" | "--out" => parsed.reports.push((ReportFormat::Xml, value(arg)?.into())),
            "-x" | "--xmp" => parsed.reports.push((ReportFormat::Xmp, value(arg)?.into())),
            "-j" | "--json" => parsed.reports.push((ReportFormat::Json, value(arg)?.into())),
            "-c" | "--customMessages" => parsed.custom_messages = Some(value(arg)?.into()),
            "-f" | "--fatal" => parsed.floor = Severity::Fatal,
            "-e" | "--error" => parsed.floor = Severity::Error,
            "-w" | "--warn" => parsed.floor = Severity::Warning,
            "-u" | "--usage" => parsed.floor = Severity::Usage,
            "--failonwarnings" => parsed.fail_on_warnings = true,
            "-l" | "--listChecks" => parsed.list_checks = true,
            "--version" => parsed.version = true,
            "-?" | "-h" | "-help" | "--help" => parsed.help = true,
            _ if arg.starts_with('-') && arg.len() > 1 => {
                return Err(UsageError::Unrecognized(arg.to_string()));
            }
            _ => {
                if parsed.input.is_some() {
                    return Err(UsageError::Unrecognized(arg.to_string()));
                }
                parsed.input = Some(PathBuf::from(arg));
            }
        }
        i += 1;
    }

    Ok(parsed)
}
