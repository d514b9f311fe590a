//! Target arena.
//!
//! Raw targets are owned by the runtime and addressed by [`TargetId`].
//! There is no garbage collector: a target lives until it is released
//! explicitly, and releasing it is what "weak" means for weak collections.

use std::collections::HashMap;

use crate::value::{RawTarget, TargetId, TargetKind};

#[derive(Debug, Default)]
pub(crate) struct TargetStore {
    next: u64,
    slots: HashMap<TargetId, RawTarget>,
}

impl TargetStore {
    pub(crate) fn insert(&mut self, raw: RawTarget) -> TargetId {
        let id = TargetId(self.next);
        self.next += 1;
        self.slots.insert(id, raw);
        id
    }

    pub(crate) fn get(&self, id: TargetId) -> Option<&RawTarget> {
        self.slots.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: TargetId) -> Option<&mut RawTarget> {
        self.slots.get_mut(&id)
    }

    pub(crate) fn kind(&self, id: TargetId) -> Option<TargetKind> {
        self.slots.get(&id).map(RawTarget::kind)
    }

    /// Remove `id` and purge it from every weak collection.
    pub(crate) fn remove(&mut self, id: TargetId) -> Option<RawTarget> {
        let removed = self.slots.remove(&id)?;
        for raw in self.slots.values_mut() {
            raw.forget_weak(id);
        }
        Some(removed)
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn clear(&mut self) {
        self.slots.clear();
    }
}
