//! Reactive Facades
//!
//! A [`Reactive`] is an intercepting view of one raw target. Every read
//! through it is tracked and every write through it is checked against the
//! mutation lock, forwarded to the raw data and triggered.
//!
//! # Two Flavours
//!
//! - The canonical facade (no tracker) is the shared, mutable state. Its
//!   reads record into whichever effect is running.
//! - A tracked facade is bound to one effect, the private view of one
//!   observer. Its reads always record into that effect and it can never
//!   write.
//!
//! Nested targets read through a facade come back wrapped in a facade of
//! the same flavour, bound to the same tracker.
//!
//! # Identity
//!
//! Facades are memoized per `(target, tracker)` in the runtime's handle
//! table. Two facades for the same pair compare equal and hash alike, so a
//! facade can serve as a map key or set member.
//!
//! # Object and Array Interception
//!
//! This file implements the property-based interception of objects and
//! arrays, and the dispatch of every operation by target kind. The
//! method-based interception of collections lives in `collection.rs`.

use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};

use tracing::warn;

use super::runtime::Runtime;
use crate::error::{Error, MutationOp, Result};
use crate::graph::{DepKey, EffectId, TriggerOp};
use crate::value::{RawTarget, TargetId, TargetKind, Value};

/// Most `Undefined` slots a single array write may create past the end.
const MAX_ARRAY_GAP: usize = 1 << 16;

/// Memo of the facades created so far.
#[derive(Debug, Default)]
pub(crate) struct HandleTable {
    handles: HashSet<(TargetId, Option<EffectId>)>,
}

impl HandleTable {
    pub(crate) fn intern(&mut self, target: TargetId, tracker: Option<EffectId>) -> bool {
        self.handles.insert((target, tracker))
    }

    pub(crate) fn contains(&self, target: TargetId, tracker: Option<EffectId>) -> bool {
        self.handles.contains(&(target, tracker))
    }

    pub(crate) fn forget_target(&mut self, target: TargetId) {
        self.handles.retain(|(id, _)| *id != target);
    }

    pub(crate) fn forget_tracker(&mut self, tracker: EffectId) {
        self.handles.retain(|(_, bound)| *bound != Some(tracker));
    }

    pub(crate) fn len(&self) -> usize {
        self.handles.len()
    }

    pub(crate) fn clear(&mut self) {
        self.handles.clear();
    }
}

/// Intercepting facade over one raw target.
#[derive(Clone)]
pub struct Reactive {
    pub(crate) runtime: Runtime,
    pub(crate) target: TargetId,
    pub(crate) tracker: Option<EffectId>,
}

impl Reactive {
    /// The raw target behind this facade.
    pub fn raw(&self) -> TargetId {
        self.target
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    /// Kind of the raw target, `None` once it has been released.
    pub fn kind(&self) -> Option<TargetKind> {
        self.runtime.targets().kind(self.target)
    }

    /// The effect this view records into, if it is a tracked view.
    pub fn tracker(&self) -> Option<EffectId> {
        self.tracker
    }

    pub fn is_tracked(&self) -> bool {
        self.tracker.is_some()
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Read `key`. Absent keys read as [`Value::Undefined`].
    ///
    /// Objects take property names, arrays take indices (and `"length"`),
    /// maps take any value. Nested targets come back wrapped.
    pub fn get(&self, key: impl Into<Value>) -> Value {
        let key = key.into().into_raw();
        match self.kind() {
            Some(TargetKind::Object | TargetKind::Array) => self.get_property(&key),
            Some(_) => self.collection_get(&key),
            None => Value::Undefined,
        }
    }

    /// Whether `key` (or member, for sets) is present.
    pub fn has(&self, key: impl Into<Value>) -> bool {
        let key = key.into().into_raw();
        match self.kind() {
            Some(kind @ (TargetKind::Object | TargetKind::Array)) => {
                self.track(kind.structural_key());
                self.runtime
                    .with_raw(self.target, |raw| match raw {
                        RawTarget::Object(fields) => key
                            .to_property_key()
                            .is_some_and(|name| fields.contains_key(&name)),
                        RawTarget::Array(items) => key.to_index().is_some_and(|i| i < items.len()),
                        _ => false,
                    })
                    .unwrap_or(false)
            }
            Some(_) => self.collection_has(&key),
            None => false,
        }
    }

    /// Number of keys, elements, entries or members. Tracks the key set.
    pub fn len(&self) -> usize {
        let Some(kind) = self.kind() else {
            return 0;
        };
        self.track(kind.structural_key());
        self.runtime
            .with_raw(self.target, RawTarget::len)
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get_property(&self, key: &Value) -> Value {
        let kind = match self.kind() {
            Some(kind) => kind,
            None => return Value::Undefined,
        };
        if kind == TargetKind::Array && key.as_str() == Some("length") {
            return Value::from(self.len());
        }
        let Some(dep) = property_key(kind, key) else {
            return Value::Undefined;
        };

        let value = self
            .runtime
            .with_raw(self.target, |raw| match (raw, &dep) {
                (RawTarget::Object(fields), DepKey::Field(name)) => fields.get(name).cloned(),
                (RawTarget::Array(items), DepKey::Index(i)) => items.get(*i).cloned(),
                _ => None,
            })
            .flatten()
            .unwrap_or_default();
        self.track(dep);
        self.wrap(value)
    }

    // ------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------

    /// Write `value` under `key`.
    ///
    /// Triggers an add for a new key, a set for a changed value and
    /// nothing when the value is unchanged. Writing past the end of an
    /// array fills the gap with `Undefined`. Indices above
    /// [`MAX_ARRAY_INDEX`](crate::value::MAX_ARRAY_INDEX), and writes that
    /// would open a gap of more than 65536 slots, fail with
    /// [`Error::InvalidKey`].
    pub fn set(&self, key: impl Into<Value>, value: impl Into<Value>) -> Result<()> {
        let key = key.into().into_raw();
        let value = value.into().into_raw();
        self.check_writable(MutationOp::Set, &key)?;

        match self.require_kind()? {
            TargetKind::Object => self.set_field(&key, value),
            TargetKind::Array => self.set_index(&key, value),
            kind @ (TargetKind::Map | TargetKind::WeakMap) => {
                self.collection_set(kind, key, value)
            }
            kind => Err(Error::UnsupportedOperation {
                op: MutationOp::Set,
                kind,
            }),
        }
    }

    /// Remove `key`. Returns whether it was present.
    ///
    /// Deleting an array element leaves a hole (`Undefined`); the length
    /// does not change. A hole is a stored `Undefined`: `has` still reports
    /// it, deleting it again succeeds, and writing it triggers a set.
    pub fn delete(&self, key: impl Into<Value>) -> Result<bool> {
        let key = key.into().into_raw();
        self.check_writable(MutationOp::Delete, &key)?;

        match self.require_kind()? {
            TargetKind::Object => self.delete_field(&key),
            TargetKind::Array => self.delete_index(&key),
            kind => self.collection_delete(kind, &key),
        }
    }

    /// Append to an array. Returns the new length.
    pub fn push(&self, value: impl Into<Value>) -> Result<usize> {
        let value = value.into().into_raw();
        self.check_writable(MutationOp::Push, &"length")?;

        let index = {
            let mut targets = self.runtime.inner.targets.borrow_mut();
            match targets.get_mut(self.target) {
                Some(RawTarget::Array(items)) => {
                    items.push(value);
                    items.len() - 1
                }
                Some(raw) => {
                    return Err(Error::UnsupportedOperation {
                        op: MutationOp::Push,
                        kind: raw.kind(),
                    })
                }
                None => return Err(Error::UnknownTarget(self.target)),
            }
        };
        self.runtime
            .trigger(self.target, TriggerOp::Add, Some(DepKey::Index(index)));
        Ok(index + 1)
    }

    /// Remove the last element of an array. `Undefined` when empty.
    pub fn pop(&self) -> Result<Value> {
        self.check_writable(MutationOp::Pop, &"length")?;

        let popped = {
            let mut targets = self.runtime.inner.targets.borrow_mut();
            match targets.get_mut(self.target) {
                Some(RawTarget::Array(items)) => items.pop().map(|value| (items.len(), value)),
                Some(raw) => {
                    return Err(Error::UnsupportedOperation {
                        op: MutationOp::Pop,
                        kind: raw.kind(),
                    })
                }
                None => return Err(Error::UnknownTarget(self.target)),
            }
        };
        let Some((index, value)) = popped else {
            return Ok(Value::Undefined);
        };
        self.runtime
            .trigger(self.target, TriggerOp::Delete, Some(DepKey::Index(index)));
        Ok(self.wrap(value))
    }

    fn set_field(&self, key: &Value, value: Value) -> Result<()> {
        let name = key.to_property_key().ok_or_else(|| Error::InvalidKey {
            key: key.to_string(),
            kind: TargetKind::Object,
        })?;

        let op = {
            let mut targets = self.runtime.inner.targets.borrow_mut();
            let Some(RawTarget::Object(fields)) = targets.get_mut(self.target) else {
                return Err(Error::UnknownTarget(self.target));
            };
            match fields.insert(name.clone(), value.clone()) {
                None => Some(TriggerOp::Add),
                Some(old) if old != value => Some(TriggerOp::Set),
                Some(_) => None,
            }
        };
        if let Some(op) = op {
            self.runtime
                .trigger(self.target, op, Some(DepKey::Field(name)));
        }
        Ok(())
    }

    fn set_index(&self, key: &Value, value: Value) -> Result<()> {
        let invalid = || Error::InvalidKey {
            key: key.to_string(),
            kind: TargetKind::Array,
        };
        let index = key.to_index().ok_or_else(invalid)?;

        let op = {
            let mut targets = self.runtime.inner.targets.borrow_mut();
            let Some(RawTarget::Array(items)) = targets.get_mut(self.target) else {
                return Err(Error::UnknownTarget(self.target));
            };
            if index.saturating_sub(items.len()) > MAX_ARRAY_GAP {
                return Err(invalid());
            }
            if let Some(slot) = items.get_mut(index) {
                if *slot == value {
                    None
                } else {
                    *slot = value;
                    Some(TriggerOp::Set)
                }
            } else {
                items.resize(index, Value::Undefined);
                items.push(value);
                Some(TriggerOp::Add)
            }
        };
        if let Some(op) = op {
            self.runtime
                .trigger(self.target, op, Some(DepKey::Index(index)));
        }
        Ok(())
    }

    fn delete_field(&self, key: &Value) -> Result<bool> {
        let Some(name) = key.to_property_key() else {
            return Ok(false);
        };
        let removed = {
            let mut targets = self.runtime.inner.targets.borrow_mut();
            let Some(RawTarget::Object(fields)) = targets.get_mut(self.target) else {
                return Err(Error::UnknownTarget(self.target));
            };
            fields.shift_remove(&name).is_some()
        };
        if removed {
            self.runtime
                .trigger(self.target, TriggerOp::Delete, Some(DepKey::Field(name)));
        }
        Ok(removed)
    }

    fn delete_index(&self, key: &Value) -> Result<bool> {
        let Some(index) = key.to_index() else {
            return Ok(false);
        };
        let removed = {
            let mut targets = self.runtime.inner.targets.borrow_mut();
            let Some(RawTarget::Array(items)) = targets.get_mut(self.target) else {
                return Err(Error::UnknownTarget(self.target));
            };
            match items.get_mut(index) {
                Some(slot) => {
                    *slot = Value::Undefined;
                    true
                }
                None => false,
            }
        };
        if removed {
            self.runtime
                .trigger(self.target, TriggerOp::Delete, Some(DepKey::Index(index)));
        }
        Ok(removed)
    }

    // ------------------------------------------------------------------
    // Shared plumbing
    // ------------------------------------------------------------------

    /// Record a read of `key` into the bound tracker or the running effect.
    pub(crate) fn track(&self, key: DepKey) {
        self.runtime.track_with(self.target, key, self.tracker);
    }

    /// Wrap a nested target in a facade of the same flavour.
    pub(crate) fn wrap(&self, value: Value) -> Value {
        self.runtime.wrap(value, self.tracker)
    }

    /// Writes need an open lock and a canonical facade.
    pub(crate) fn check_writable(&self, op: MutationOp, key: &dyn fmt::Display) -> Result<()> {
        if !self.runtime.is_mutation_allowed() {
            return Err(Error::MutationOutsideReducer {
                op,
                key: key.to_string(),
            });
        }
        if self.tracker.is_some() {
            return Err(Error::ReadOnlyViolation {
                op,
                key: key.to_string(),
            });
        }
        Ok(())
    }

    pub(crate) fn require_kind(&self) -> Result<TargetKind> {
        self.kind().ok_or(Error::UnknownTarget(self.target))
    }
}

fn property_key(kind: TargetKind, key: &Value) -> Option<DepKey> {
    match kind {
        TargetKind::Object => key.to_property_key().map(DepKey::Field),
        TargetKind::Array => key.to_index().map(DepKey::Index),
        _ => None,
    }
}

impl PartialEq for Reactive {
    fn eq(&self, other: &Self) -> bool {
        self.runtime.ptr_eq(&other.runtime)
            && self.target == other.target
            && self.tracker == other.tracker
    }
}

impl Eq for Reactive {}

impl Hash for Reactive {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.target.hash(state);
        self.tracker.hash(state);
    }
}

impl fmt::Debug for Reactive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reactive")
            .field("target", &self.target)
            .field("tracker", &self.tracker)
            .finish()
    }
}

impl From<&Reactive> for TargetId {
    fn from(handle: &Reactive) -> Self {
        handle.raw()
    }
}

impl From<Reactive> for TargetId {
    fn from(handle: Reactive) -> Self {
        handle.raw()
    }
}

impl Runtime {
    /// The canonical facade of `target`.
    ///
    /// Passing a facade yields the canonical facade of its raw target.
    pub fn reactive(&self, target: impl Into<TargetId>) -> Reactive {
        self.handle(target.into(), None)
    }

    /// Wrap a value if it can be wrapped.
    ///
    /// Targets (raw or already wrapped) come back as canonical facades.
    /// Anything else is returned unchanged and logged, since only objects,
    /// arrays and collections can be observed.
    pub fn reactive_value(&self, value: Value) -> Value {
        match value.as_target() {
            Some(target) => Value::Reactive(self.handle(target, None)),
            None => {
                warn!(runtime = %self.name(), value = %value, "value cannot be made reactive");
                value
            }
        }
    }

    /// Whether `value` is a facade created by this runtime.
    pub fn is_reactive(&self, value: &Value) -> bool {
        match value {
            Value::Reactive(handle) => {
                handle.runtime.ptr_eq(self)
                    && self
                        .inner
                        .handles
                        .borrow()
                        .contains(handle.target, handle.tracker)
            }
            _ => false,
        }
    }

    /// Strip the facade off a value. Non-facades are returned as-is.
    pub fn unwrap(&self, value: Value) -> Value {
        value.into_raw()
    }

    /// Number of memoized facades.
    pub fn handle_count(&self) -> usize {
        self.inner.handles.borrow().len()
    }

    pub(crate) fn handle(&self, target: TargetId, tracker: Option<EffectId>) -> Reactive {
        self.inner.handles.borrow_mut().intern(target, tracker);
        Reactive {
            runtime: self.clone(),
            target,
            tracker,
        }
    }

    /// Wrap a nested target read through a facade bound to `tracker`.
    pub(crate) fn wrap(&self, value: Value, tracker: Option<EffectId>) -> Value {
        match value {
            Value::Target(target) => Value::Reactive(self.handle(target, tracker)),
            other => other,
        }
    }
}
