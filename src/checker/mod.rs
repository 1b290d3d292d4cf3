//! Stand-in EPUB checker
//!
//! A small command-line checker with the argument surface, console format,
//! report formats and exit-code policy of EPUBCheck. It does not validate
//! content: a publication lists the issues it carries in a `.issues` entry,
//! and the checker reports them through the severity floor and any custom
//! message overrides. This is enough to drive the command-line test suite
//! end to end.
//!
//! All output goes through [`crate::process::console`] and the exit code
//! through [`crate::process::exit::terminate`], so the checker behaves the
//! same as a real process and under [`crate::invoke::invoke`].

pub mod args;
pub mod catalog;
pub mod messages;
pub mod overrides;
pub mod package;
pub mod report;

use std::io::{self, Write};
use std::time::Instant;

use chrono::{SecondsFormat, Utc};
use thiserror::Error;

use crate::invoke::EntryPoint;
use crate::process::console;
use crate::process::exit::terminate;

pub use catalog::Severity;
use overrides::Dictionary;
use package::Publication;
use report::{Location, Message, ReportContext, Summary};

/// Exit codes
pub mod exit_codes {
    /// Nothing at or above error was reported
    pub const SUCCESS: i32 = 0;
    /// Usage problem, or errors were reported
    pub const FAILURE: i32 = 1;
    /// The checker itself failed
    pub const INTERNAL: i32 = 2;
}

/// Checker failures that are not findings about the publication
#[derive(Debug, Error)]
pub enum CheckerError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Report serialization error: {0}")]
    Report(#[from] serde_json::Error),

    #[error("Invalid issue list line {line}: {reason}")]
    Manifest { line: usize, reason: String },
}

/// Checker version, shared with the harness package
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

fn out(line: &str) {
    let _ = writeln!(console::stdout(), "{}", line);
}

fn err(line: &str) {
    let _ = writeln!(console::stderr(), "{}", line);
}

/// The checker entry point
#[derive(Debug, Clone, Copy, Default)]
pub struct Checker;

impl EntryPoint for Checker {
    fn main(&self, args: &[String]) {
        let code = self.run(args);
        terminate(code)
    }
}

impl Checker {
    /// Run with `args` and return the exit code
    pub fn run(&self, args: &[String]) -> i32 {
        match self.execute(args) {
            Ok(code) => code,
            Err(e) => {
                tracing::error!(error = %e, "checker failed");
                err(&messages::format("internal_error", &[&e.to_string()]));
                exit_codes::INTERNAL
            }
        }
    }

    fn execute(&self, args: &[String]) -> Result<i32, CheckerError> {
        if args.is_empty() {
            err(&messages::format("argument_needed", &[]));
            return Ok(exit_codes::FAILURE);
        }

        let options = match args::parse(args) {
            Ok(options) => options,
            Err(e) => {
                err(&e.to_string());
                return Ok(exit_codes::FAILURE);
            }
        };

        if options.help {
            let _ = write!(console::stdout(), "{}", messages::help_text(version()));
        }
        if options.reports.len() > 1 {
            err(&messages::format("output_type_conflict", &[]));
            return Ok(exit_codes::FAILURE);
        }
        if options.version && !options.help {
            out(&messages::format("version", &[version()]));
        }

        let (dictionary, problems) = match &options.custom_messages {
            Some(path) => overrides::load(path),
            None => (Dictionary::default(), Vec::new()),
        };

        if options.list_checks {
            for problem in &problems {
                err(&problem.console_line(""));
            }
            list_checks(&dictionary);
            return Ok(exit_codes::SUCCESS);
        }

        let Some(input) = options.input.as_deref() else {
            if options.version && !options.help {
                return Ok(exit_codes::SUCCESS);
            }
            err(&messages::format("no_file_specified", &[]));
            return Ok(exit_codes::FAILURE);
        };
        let input_text = input.display().to_string();

        if let Some(mode) = options.mode.as_deref() {
            if mode != "exp" {
                err(&messages::format("mode_unsupported", &[mode]));
                return Ok(exit_codes::FAILURE);
            }
        }
        if !input.exists() {
            err(&messages::format("file_not_found", &[&input_text]));
            return Ok(exit_codes::FAILURE);
        }
        if input.is_dir() && options.mode.is_none() {
            err(&messages::format("mode_required", &[&input_text]));
            return Ok(exit_codes::FAILURE);
        }

        let started = Instant::now();
        let publication = if input.is_dir() {
            Publication::package(input)?
        } else {
            Publication::open(input)
        };
        tracing::info!(
            input = %input_text,
            publication = publication.name(),
            floor = %options.floor,
            "checking publication"
        );

        let mut reported = Vec::new();
        for problem in problems {
            report_message(problem, options.floor, publication.name(), &mut reported);
        }

        out(&messages::format("validating_version", &[]));

        for message in findings(&publication, &dictionary)? {
            report_message(message, options.floor, publication.name(), &mut reported);
        }

        let summary = Summary::of(&reported);
        out(&summary.status_line());
        out(&summary.counts_line());

        if let Some((format, path)) = options.reports.first() {
            let context = ReportContext {
                input_path: input_text.clone(),
                publication: publication.name().to_string(),
                version: version().to_string(),
                check_date: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
                elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            };
            format.write(path, &context, &reported)?;
        }

        out("");
        out(&messages::format("completed", &[]));

        let failed =
            summary.has_errors() || (options.fail_on_warnings && summary.warnings > 0);
        Ok(if failed {
            exit_codes::FAILURE
        } else {
            exit_codes::SUCCESS
        })
    }
}

/// Findings for a publication, resolved through the override dictionary
fn findings(publication: &Publication, dictionary: &Dictionary) -> Result<Vec<Message>, CheckerError> {
    let contents = publication.read()?;
    let mut found = Vec::new();

    if !contents.mimetype_first() {
        if let Some((severity, text)) = dictionary.resolve::<&str>("PKG-006", &[]) {
            found.push(Message {
                id: "PKG-006".to_string(),
                severity,
                text,
                location: Some(Location::archive()),
            });
        }
    }

    for issue in contents.issues {
        if let Some((severity, text)) = dictionary.resolve(&issue.id, &issue.args) {
            found.push(Message {
                id: issue.id,
                severity,
                text,
                location: Some(issue.location),
            });
        }
    }
    Ok(found)
}

/// Print a message if it clears the floor and record it
fn report_message(message: Message, floor: Severity, publication: &str, reported: &mut Vec<Message>) {
    if message.severity == Severity::Suppressed || message.severity < floor {
        tracing::trace!(id = %message.id, severity = %message.severity, "message filtered");
        return;
    }
    let line = message.console_line(publication);
    if message.severity.is_error() {
        err(&line);
    } else {
        out(&line);
    }
    reported.push(message);
}

fn list_checks(dictionary: &Dictionary) {
    for entry in catalog::entries() {
        out(&format!(
            "{}\t{}\t{}",
            entry.id,
            dictionary.severity(entry),
            entry.template
        ));
    }
}

/// Run the checker as the real process: real streams, real exit
pub fn main_with_args(args: &[String]) -> ! {
    let code = Checker.run(args);
    let _ = io::stdout().flush();
    terminate(code)
}
