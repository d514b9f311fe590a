//! Graph Nodes
//!
//! Subscribers in the dependency graph are effects. This module defines
//! how they are identified and how they are ranked for dispatch.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Unique identifier for an effect.
///
/// Ids come from one process-wide counter so effects of different runtimes
/// never collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EffectId(u64);

impl EffectId {
    /// Generate a new unique effect ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for EffectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EffectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "effect#{}", self.0)
    }
}

/// The priority class of an effect.
///
/// Declaration order is dispatch order: for a single trigger every
/// `Computed` effect completes before any `Plain` one starts, and every
/// `Plain` effect before any `Trace` one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum EffectKind {
    /// Invalidates a memoized derived value.
    Computed,

    /// An ordinary tracked computation.
    #[default]
    Plain,

    /// A per-consumer observer.
    Trace,
}
