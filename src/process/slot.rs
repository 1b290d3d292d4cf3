//! Stack-disciplined holder for process-wide state

use parking_lot::{const_mutex, Mutex};
use std::sync::atomic::{AtomicU64, Ordering};

/// Proof of one push onto a [`ScopedSlot`]
#[derive(Debug, PartialEq, Eq)]
#[must_use = "dropping the token leaks the slot entry"]
pub(crate) struct SlotToken(u64);

/// A LIFO stack of values where only the innermost one is current.
///
/// Process-wide resources (exit authority, console sinks) are pushed at
/// scenario start and released at scenario end; the previous value becomes
/// current again.
pub(crate) struct ScopedSlot<T> {
    stack: Mutex<Vec<(u64, T)>>,
    next_id: AtomicU64,
}

impl<T: Clone> ScopedSlot<T> {
    pub(crate) const fn new() -> Self {
        Self {
            stack: const_mutex(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Make `value` current until the returned token is released
    pub(crate) fn push(&self, value: T) -> SlotToken {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.stack.lock().push((id, value));
        SlotToken(id)
    }

    /// The innermost value, if any
    pub(crate) fn current(&self) -> Option<T> {
        self.stack.lock().last().map(|(_, value)| value.clone())
    }

    pub(crate) fn depth(&self) -> usize {
        self.stack.lock().len()
    }

    /// Remove the entry for `token`, restoring whatever was current before it.
    ///
    /// Releasing anything but the innermost entry breaks LIFO order; the entry
    /// is still removed so later scenarios are not corrupted.
    pub(crate) fn release(&self, token: SlotToken, name: &'static str) -> Option<T> {
        let mut stack = self.stack.lock();
        let pos = stack.iter().rposition(|(id, _)| *id == token.0)?;
        if pos + 1 != stack.len() {
            tracing::error!(
                slot = name,
                depth = stack.len(),
                position = pos,
                "process-wide guard released out of order"
            );
        }
        Some(stack.remove(pos).1)
    }
}
