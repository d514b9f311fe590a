//! Mutation Lock
//!
//! Shared state may only be written inside a reducer. The lock is a single
//! flag per runtime; [`Runtime::with_mutation_allowed`] opens it for the
//! duration of one call and restores the previous state afterwards, even
//! when the call panics.
//!
//! Each write inside a reducer still triggers on its own. Coalescing
//! notifications is up to the scheduler callbacks of the calling layer.

use std::cell::Cell;

use super::runtime::Runtime;

#[derive(Debug)]
pub(crate) struct MutationLock {
    open: Cell<bool>,
}

/// Restores the lock to its previous state when dropped.
pub(crate) struct Unlocked<'a> {
    lock: &'a MutationLock,
    previous: bool,
}

impl MutationLock {
    pub(crate) fn new(open: bool) -> Self {
        Self {
            open: Cell::new(open),
        }
    }

    pub(crate) fn is_open(&self) -> bool {
        self.open.get()
    }

    pub(crate) fn open(&self) -> Unlocked<'_> {
        let previous = self.open.replace(true);
        Unlocked {
            lock: self,
            previous,
        }
    }
}

impl Drop for Unlocked<'_> {
    fn drop(&mut self) {
        self.lock.open.set(self.previous);
    }
}

impl Runtime {
    /// Run `f` with tracked mutation permitted.
    ///
    /// This is the reducer boundary: every write through a shared
    /// [`Reactive`](crate::Reactive) outside of it fails with
    /// [`Error::MutationOutsideReducer`](crate::Error::MutationOutsideReducer).
    pub fn with_mutation_allowed<R>(&self, f: impl FnOnce() -> R) -> R {
        let _unlocked = self.inner.lock.open();
        f()
    }

    /// Wrap `f` so that every call runs inside
    /// [`with_mutation_allowed`](Self::with_mutation_allowed).
    pub fn reducer<A, R>(&self, f: impl Fn(A) -> R) -> impl Fn(A) -> R {
        let runtime = self.clone();
        move |args| runtime.with_mutation_allowed(|| f(args))
    }

    /// Whether writes are currently permitted.
    pub fn is_mutation_allowed(&self) -> bool {
        self.inner.lock.is_open()
    }
}
