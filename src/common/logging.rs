//! Logging and tracing configuration
//!
//! Log output always goes to the real stderr (or a log file), never through
//! `process::console`, so it cannot leak into captured checker output.

use std::path::{Path, PathBuf};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use super::paths;

/// Initialize tracing for the CLI (stderr logging)
///
/// Logs are controlled by the `RUST_LOG` environment variable.
/// Default level is INFO for this crate, WARN for dependencies.
pub fn init_cli() {
    init_with_default("epubcheck_harness=info,warn");
}

/// Initialize stderr logging with a fallback filter for when `RUST_LOG` is unset
pub fn init_with_default(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .init();
}

/// Initialize tracing with a log file in addition to stderr
///
/// The file gets DEBUG detail with span enter/exit events so a scenario's
/// phases can be followed after the fact. Falls back to [`init_cli`] when the
/// file cannot be opened.
pub fn init_with_log_file(log_file: &Path) -> Option<PathBuf> {
    if let Some(dir) = log_file.parent() {
        if let Err(e) = std::fs::create_dir_all(dir) {
            eprintln!("Warning: Could not create log directory: {}", e);
        }
    }

    let file = match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
    {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Warning: Could not open log file: {}", e);
            init_cli();
            return None;
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("epubcheck_harness=debug,info"));

    let file_layer = fmt::layer()
        .with_writer(file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::ENTER | FmtSpan::EXIT);

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .compact();

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .init();

    Some(log_file.to_path_buf())
}

/// Default log file location
pub fn default_log_path() -> Option<PathBuf> {
    paths::log_dir().map(|d| d.join("harness.log"))
}
