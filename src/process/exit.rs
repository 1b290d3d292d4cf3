//! Exit interception
//!
//! Code that would call `std::process::exit` calls [`terminate`] instead.
//! Without a guard that still ends the process. Under an [`ExitGuard`]
//! running [`InterceptExit`], the request unwinds with a
//! [`TerminationRequested`] payload that [`run_intercepted`] turns back into
//! an exit code, so a terminating entry point can be invoked many times in
//! one test process.
//!
//! Interception relies on unwinding: it does not work under `panic = "abort"`,
//! and an entry point that catches every unwind will swallow the request.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use super::slot::{ScopedSlot, SlotToken};
use super::{exclusive, Exclusive};

/// Exit code of an entry point that returned without requesting termination
pub const IMPLICIT_SUCCESS: i32 = 0;

/// The authority that decides what a termination request does
pub trait TerminationAuthority: Send + Sync {
    fn request_termination(&self, code: i32) -> !;
}

/// Ends the process for real
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessExit;

impl TerminationAuthority for ProcessExit {
    fn request_termination(&self, code: i32) -> ! {
        std::process::exit(code)
    }
}

/// Unwind payload carrying the requested exit code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminationRequested {
    pub code: i32,
}

/// Converts termination requests into [`TerminationRequested`] unwinds
#[derive(Debug, Default, Clone, Copy)]
pub struct InterceptExit;

impl TerminationAuthority for InterceptExit {
    fn request_termination(&self, code: i32) -> ! {
        tracing::debug!(code, "termination request intercepted");
        // resume_unwind skips the panic hook, so nothing is printed
        panic::resume_unwind(Box::new(TerminationRequested { code }))
    }
}

static AUTHORITY: ScopedSlot<Arc<dyn TerminationAuthority>> = ScopedSlot::new();

/// Request process termination through the innermost installed authority
pub fn terminate(code: i32) -> ! {
    // Clone out of the slot first: the authority must not run under its lock
    let current = AUTHORITY.current();
    match current {
        Some(authority) => authority.request_termination(code),
        None => ProcessExit.request_termination(code),
    }
}

/// Whether any guard is installed
pub fn is_guarded() -> bool {
    AUTHORITY.depth() > 0
}

/// Installs a termination authority until uninstalled or dropped
pub struct ExitGuard {
    token: Option<SlotToken>,
    _exclusive: Exclusive,
}

impl ExitGuard {
    /// Install `authority` on top of whatever is installed now
    pub fn install(authority: Arc<dyn TerminationAuthority>) -> Self {
        let exclusive = exclusive();
        let token = AUTHORITY.push(authority);
        Self {
            token: Some(token),
            _exclusive: exclusive,
        }
    }

    /// Install [`InterceptExit`]
    pub fn intercept() -> Self {
        Self::install(Arc::new(InterceptExit))
    }

    /// Restore the previous authority. Calling this twice is a no-op.
    pub fn uninstall(&mut self) {
        if let Some(token) = self.token.take() {
            AUTHORITY.release(token, "exit authority");
        }
    }

    pub fn is_installed(&self) -> bool {
        self.token.is_some()
    }
}

impl Drop for ExitGuard {
    fn drop(&mut self) {
        self.uninstall();
    }
}

/// Run `f`, turning a [`TerminationRequested`] unwind into its exit code.
///
/// Returns [`IMPLICIT_SUCCESS`] when `f` returns normally. Any other panic
/// is resumed unchanged.
pub fn run_intercepted<F: FnOnce()>(f: F) -> i32 {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(()) => IMPLICIT_SUCCESS,
        Err(payload) => match payload.downcast::<TerminationRequested>() {
            Ok(request) => request.code,
            Err(other) => panic::resume_unwind(other),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intercepted_termination_yields_code() {
        let _guard = ExitGuard::intercept();
        assert_eq!(run_intercepted(|| terminate(3)), 3);
        assert_eq!(run_intercepted(|| terminate(0)), 0);
    }

    #[test]
    fn test_returning_normally_is_implicit_success() {
        let _guard = ExitGuard::intercept();
        assert_eq!(run_intercepted(|| {}), IMPLICIT_SUCCESS);
    }

    #[test]
    fn test_uninstall_is_idempotent_and_restores() {
        let _lock = exclusive();
        let before = AUTHORITY.depth();

        let mut guard = ExitGuard::intercept();
        assert!(guard.is_installed());
        assert_eq!(AUTHORITY.depth(), before + 1);

        guard.uninstall();
        guard.uninstall();
        assert!(!guard.is_installed());
        assert_eq!(AUTHORITY.depth(), before);

        drop(guard);
        assert_eq!(AUTHORITY.depth(), before);
    }

    #[test]
    fn test_nested_guards_restore_outer() {
        struct Fixed;
        impl TerminationAuthority for Fixed {
            fn request_termination(&self, _code: i32) -> ! {
                panic::resume_unwind(Box::new(TerminationRequested { code: 42 }))
            }
        }

        let _outer = ExitGuard::intercept();
        {
            let _inner = ExitGuard::install(Arc::new(Fixed));
            assert_eq!(run_intercepted(|| terminate(1)), 42);
        }
        assert_eq!(run_intercepted(|| terminate(1)), 1);
    }

    #[test]
    fn test_other_panics_propagate_and_guard_still_restores() {
        let _lock = exclusive();
        let before = AUTHORITY.depth();

        let outcome = panic::catch_unwind(|| {
            let _guard = ExitGuard::intercept();
            run_intercepted(|| panic::resume_unwind(Box::new("harness bug")));
        });

        let payload = outcome.unwrap_err();
        assert_eq!(payload.downcast_ref::<&str>(), Some(&"harness bug"));
        assert_eq!(AUTHORITY.depth(), before);
    }
}
