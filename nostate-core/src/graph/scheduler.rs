//! Dispatch Scheduler
//!
//! A trigger resolves to a set of effects. Before any of them runs, the set
//! is partitioned by priority class:
//!
//! 1. computed effects, so every memoized value touched by the change is
//!    invalidated first,
//! 2. plain effects,
//! 3. per-consumer observers.
//!
//! Within a class the order is the order the effects were resolved in
//! (first subscription first). Callers must not rely on anything finer.

use smallvec::SmallVec;

use super::node::{EffectId, EffectKind};

/// A resolved trigger, bucketed by priority.
#[derive(Debug, Default)]
pub struct Dispatch {
    computed: SmallVec<[EffectId; 4]>,
    plain: SmallVec<[EffectId; 4]>,
    trace: SmallVec<[EffectId; 4]>,
}

impl Dispatch {
    /// Partition `effects` by the class `kind_of` reports.
    ///
    /// Effects `kind_of` does not know (already disposed) are dropped.
    pub fn partition<I, F>(effects: I, kind_of: F) -> Self
    where
        I: IntoIterator<Item = EffectId>,
        F: Fn(EffectId) -> Option<EffectKind>,
    {
        let mut dispatch = Self::default();
        for effect in effects {
            match kind_of(effect) {
                Some(EffectKind::Computed) => dispatch.computed.push(effect),
                Some(EffectKind::Plain) => dispatch.plain.push(effect),
                Some(EffectKind::Trace) => dispatch.trace.push(effect),
                None => {}
            }
        }
        dispatch
    }

    /// Total number of effects to run.
    pub fn len(&self) -> usize {
        self.computed.len() + self.plain.len() + self.trace.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Effects in dispatch order.
    pub fn into_order(self) -> impl Iterator<Item = EffectId> {
        self.computed
            .into_iter()
            .chain(self.plain)
            .chain(self.trace)
    }
}
