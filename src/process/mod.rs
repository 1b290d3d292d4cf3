//! Process-wide resources the checker touches
//!
//! The checker writes through [`console`] handles and ends through
//! [`exit::terminate`]. Both resolve to the innermost installed guard, so the
//! harness can swap them per invocation and restore them afterwards.
//!
//! Every guard holds the process-wide [`Exclusive`] lock. It is reentrant:
//! one thread may nest guards, other threads wait until the outermost guard
//! is dropped.

pub mod console;
pub mod exit;
mod slot;
pub mod workdir;

use parking_lot::{const_reentrant_mutex, ReentrantMutex, ReentrantMutexGuard};

pub use console::{CapturedStreams, StreamCapture};
pub use exit::{terminate, ExitGuard, InterceptExit, ProcessExit, TerminationAuthority};
pub use workdir::WorkingDir;

static EXCLUSIVE: ReentrantMutex<()> = const_reentrant_mutex(());

/// Ownership of the process-wide redirected state
pub struct Exclusive {
    _guard: ReentrantMutexGuard<'static, ()>,
}

/// Block until this thread is the only holder of process-wide state
pub fn exclusive() -> Exclusive {
    Exclusive {
        _guard: EXCLUSIVE.lock(),
    }
}
