//! Redirectable stdout/stderr
//!
//! The checker prints through [`stdout()`] and [`stderr()`] rather than the
//! std macros. A [`StreamCapture`] swaps both channels for in-memory buffers
//! or for one shared file and puts the previous sinks back when finished or
//! dropped.

use parking_lot::Mutex;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::slot::{ScopedSlot, SlotToken};
use super::{exclusive, Exclusive};

type Buffer = Arc<Mutex<Vec<u8>>>;
type FileSink = Arc<Mutex<BufWriter<File>>>;

#[derive(Clone)]
enum Sink {
    Memory(Buffer),
    File(FileSink),
}

impl Sink {
    fn write_all(&self, buf: &[u8]) -> io::Result<()> {
        match self {
            Sink::Memory(buffer) => {
                buffer.lock().extend_from_slice(buf);
                Ok(())
            }
            Sink::File(file) => file.lock().write_all(buf),
        }
    }

    fn flush(&self) -> io::Result<()> {
        match self {
            Sink::Memory(_) => Ok(()),
            Sink::File(file) => file.lock().flush(),
        }
    }
}

#[derive(Clone)]
struct Redirection {
    out: Sink,
    err: Sink,
}

static REDIRECTION: ScopedSlot<Redirection> = ScopedSlot::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Channel {
    Stdout,
    Stderr,
}

/// Write handle for one console channel
#[derive(Debug, Clone, Copy)]
pub struct Console {
    channel: Channel,
}

/// Handle to the current standard output
pub fn stdout() -> Console {
    Console {
        channel: Channel::Stdout,
    }
}

/// Handle to the current standard error
pub fn stderr() -> Console {
    Console {
        channel: Channel::Stderr,
    }
}

/// Whether output is currently redirected
pub fn is_redirected() -> bool {
    REDIRECTION.depth() > 0
}

impl Write for Console {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match (REDIRECTION.current(), self.channel) {
            (Some(redirect), Channel::Stdout) => redirect.out.write_all(buf).map(|_| buf.len()),
            (Some(redirect), Channel::Stderr) => redirect.err.write_all(buf).map(|_| buf.len()),
            (None, Channel::Stdout) => io::stdout().write(buf),
            (None, Channel::Stderr) => io::stderr().write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match (REDIRECTION.current(), self.channel) {
            (Some(redirect), Channel::Stdout) => redirect.out.flush(),
            (Some(redirect), Channel::Stderr) => redirect.err.flush(),
            (None, Channel::Stdout) => io::stdout().flush(),
            (None, Channel::Stderr) => io::stderr().flush(),
        }
    }
}

enum Target {
    Memory { out: Buffer, err: Buffer },
    File { path: PathBuf, sink: FileSink },
}

/// What a finished capture collected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapturedStreams {
    Memory { stdout: String, stderr: String },
    /// Both channels were written, in order, to this closed file
    File(PathBuf),
}

/// Redirects both console channels until finished or dropped
pub struct StreamCapture {
    token: Option<SlotToken>,
    target: Option<Target>,
    _exclusive: Exclusive,
}

impl StreamCapture {
    /// Capture stdout and stderr into separate fresh buffers
    pub fn in_memory() -> Self {
        let exclusive = exclusive();
        let out: Buffer = Arc::default();
        let err: Buffer = Arc::default();
        let token = REDIRECTION.push(Redirection {
            out: Sink::Memory(Arc::clone(&out)),
            err: Sink::Memory(Arc::clone(&err)),
        });
        Self {
            token: Some(token),
            target: Some(Target::Memory { out, err }),
            _exclusive: exclusive,
        }
    }

    /// Capture both channels into one file, truncating it
    pub fn to_file(path: &Path) -> io::Result<Self> {
        let exclusive = exclusive();
        let file = File::create(path)?;
        let sink: FileSink = Arc::new(Mutex::new(BufWriter::new(file)));
        let token = REDIRECTION.push(Redirection {
            out: Sink::File(Arc::clone(&sink)),
            err: Sink::File(Arc::clone(&sink)),
        });
        Ok(Self {
            token: Some(token),
            target: Some(Target::File {
                path: path.to_path_buf(),
                sink,
            }),
            _exclusive: exclusive,
        })
    }

    /// Captured stdout so far (empty for file captures)
    pub fn stdout_text(&self) -> String {
        match &self.target {
            Some(Target::Memory { out, .. }) => String::from_utf8_lossy(&out.lock()).into_owned(),
            _ => String::new(),
        }
    }

    /// Captured stderr so far (empty for file captures)
    pub fn stderr_text(&self) -> String {
        match &self.target {
            Some(Target::Memory { err, .. }) => String::from_utf8_lossy(&err.lock()).into_owned(),
            _ => String::new(),
        }
    }

    /// Restore the previous sinks and hand back what was captured.
    ///
    /// A file capture is flushed and closed before this returns, so the
    /// file can be read back safely.
    pub fn finish(mut self) -> io::Result<CapturedStreams> {
        self.restore();
        match self.target.take() {
            Some(Target::Memory { out, err }) => Ok(CapturedStreams::Memory {
                stdout: String::from_utf8_lossy(&out.lock()).into_owned(),
                stderr: String::from_utf8_lossy(&err.lock()).into_owned(),
            }),
            Some(Target::File { path, sink }) => {
                close_file(sink)?;
                Ok(CapturedStreams::File(path))
            }
            None => Err(io::Error::new(
                io::ErrorKind::Other,
                "stream capture already finished",
            )),
        }
    }

    fn restore(&mut self) {
        if let Some(token) = self.token.take() {
            REDIRECTION.release(token, "console");
        }
    }
}

fn close_file(sink: FileSink) -> io::Result<()> {
    match Arc::try_unwrap(sink) {
        Ok(mutex) => {
            let file = mutex.into_inner().into_inner().map_err(|e| e.into_error())?;
            file.sync_all()
        }
        // A console handle elsewhere still shares the writer; flush what we can
        Err(shared) => shared.lock().flush(),
    }
}

impl Drop for StreamCapture {
    fn drop(&mut self) {
        self.restore();
        if let Some(Target::File { sink, .. }) = self.target.take() {
            if let Err(e) = close_file(sink) {
                tracing::warn!("failed to close capture file: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_capture_separates_channels() {
        let capture = StreamCapture::in_memory();
        writeln!(stdout(), "to out").unwrap();
        writeln!(stderr(), "to err").unwrap();

        assert_eq!(capture.stdout_text(), "to out\n");
        match capture.finish().unwrap() {
            CapturedStreams::Memory { stdout, stderr } => {
                assert_eq!(stdout, "to out\n");
                assert_eq!(stderr, "to err\n");
            }
            other => panic!("unexpected capture {:?}", other),
        }
    }

    #[test]
    fn test_file_capture_preserves_interleaving() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("combined.txt");

        let capture = StreamCapture::to_file(&path).unwrap();
        writeln!(stdout(), "first").unwrap();
        writeln!(stderr(), "second").unwrap();
        writeln!(stdout(), "third").unwrap();
        let captured = capture.finish().unwrap();

        assert_eq!(captured, CapturedStreams::File(path.clone()));
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "first\nsecond\nthird\n"
        );
    }

    #[test]
    fn test_nested_capture_restores_outer() {
        let outer = StreamCapture::in_memory();
        writeln!(stdout(), "outer 1").unwrap();
        {
            let inner = StreamCapture::in_memory();
            writeln!(stdout(), "inner").unwrap();
            assert_eq!(inner.stdout_text(), "inner\n");
        }
        writeln!(stdout(), "outer 2").unwrap();
        assert_eq!(outer.stdout_text(), "outer 1\nouter 2\n");
    }

    #[test]
    fn test_drop_restores_after_panic() {
        let _lock = exclusive();
        let before = REDIRECTION.depth();

        let result = std::panic::catch_unwind(|| {
            let _capture = StreamCapture::in_memory();
            std::panic::resume_unwind(Box::new("comparison blew up"));
        });

        assert!(result.is_err());
        assert_eq!(REDIRECTION.depth(), before);
    }
}
