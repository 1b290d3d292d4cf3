//! In-process invocation of a command-line entry point
//!
//! [`invoke`] runs an [`EntryPoint`] with the exit interceptor and a stream
//! capture installed, and returns what it printed together with the exit
//! code it asked for.

use std::path::PathBuf;

use crate::common::Result;
use crate::process::exit::{run_intercepted, ExitGuard};
use crate::process::{exclusive, CapturedStreams, StreamCapture, WorkingDir};

/// A command-line `main` that can be called in-process
pub trait EntryPoint {
    fn main(&self, args: &[String]);
}

impl<F> EntryPoint for F
where
    F: Fn(&[String]),
{
    fn main(&self, args: &[String]) {
        self(args)
    }
}

/// Arguments and environment for one invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvocationRequest {
    args: Vec<String>,
    working_dir: Option<PathBuf>,
    redirect: Option<PathBuf>,
}

impl InvocationRequest {
    pub fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Append one token
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Run the entry point with this as the current directory
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Send both output channels to this file instead of memory
    pub fn redirect_to(mut self, path: impl Into<PathBuf>) -> Self {
        self.redirect = Some(path.into());
        self
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

/// What one invocation produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationResult {
    /// Captured stdout (empty when redirected to a file)
    pub stdout: String,
    /// Captured stderr (empty when redirected to a file)
    pub stderr: String,
    /// Requested exit code, 0 if the entry point just returned
    pub code: i32,
    /// The closed redirection file, when one was requested
    pub output_file: Option<PathBuf>,
}

impl InvocationResult {
    pub fn stdout_trimmed(&self) -> &str {
        self.stdout.trim()
    }

    pub fn stderr_trimmed(&self) -> &str {
        self.stderr.trim()
    }

    pub fn succeeded(&self) -> bool {
        self.code == 0
    }
}

/// Run `entry` in-process and collect its output and exit code.
///
/// Guards are acquired in order (exclusive lock, working directory, exit
/// interceptor, capture) and released in reverse, on every path. A panic
/// that is not a termination request is re-raised after restoration.
pub fn invoke<E>(entry: &E, request: &InvocationRequest) -> Result<InvocationResult>
where
    E: EntryPoint + ?Sized,
{
    let _exclusive = exclusive();
    let _cwd = request
        .working_dir
        .as_deref()
        .map(WorkingDir::enter)
        .transpose()?;
    let mut exit_guard = ExitGuard::intercept();

    let capture = match &request.redirect {
        Some(path) => StreamCapture::to_file(path)?,
        None => StreamCapture::in_memory(),
    };

    tracing::debug!(args = ?request.args, "invoking entry point");
    let code = run_intercepted(|| entry.main(&request.args));

    let streams = capture.finish()?;
    exit_guard.uninstall();
    tracing::debug!(code, "entry point finished");

    Ok(match streams {
        CapturedStreams::Memory { stdout, stderr } => InvocationResult {
            stdout,
            stderr,
            code,
            output_file: None,
        },
        CapturedStreams::File(path) => InvocationResult {
            stdout: String::new(),
            stderr: String::new(),
            code,
            output_file: Some(path),
        },
    })
}
