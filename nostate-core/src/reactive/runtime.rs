//! Reactive Runtime
//!
//! The runtime is the explicit reactivity context. It owns every piece of
//! state the engine needs and connects facades, effects, computed values
//! and observers:
//!
//! - the target arena holding the raw data,
//! - the dependency graph,
//! - the effect registry,
//! - the handle table memoizing facades,
//! - the active-effect stack,
//! - the mutation lock.
//!
//! # How It Works
//!
//! 1. A facade read calls [`Runtime::track`] with the key it read. The edge
//!    goes to the facade's bound tracker, or to the effect on top of the
//!    stack.
//!
//! 2. A facade write forwards the change to the raw data, then calls
//!    [`Runtime::trigger`] with what kind of change it was.
//!
//! 3. The trigger resolves the subscribers, buckets them by priority and
//!    runs each one through its scheduler, or directly when it has none.
//!
//! # Ownership
//!
//! Runtimes are independent: nothing is shared between two of them, so
//! tests and embedders can create as many as they like. Handles keep their
//! runtime alive. Closures stored in effects may in turn hold handles, so
//! call [`Runtime::dispose`] to break those cycles when a context is torn
//! down.

use std::cell::{Ref, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use indexmap::{IndexMap, IndexSet};
use tracing::{debug, trace};

use super::context::EffectStack;
use super::effect::{Effect, EffectSlot};
use super::handle::HandleTable;
use super::lock::MutationLock;
use crate::config::RuntimeConfig;
use crate::graph::{DepKey, DependencyGraph, Dispatch, EffectId, TriggerOp};
use crate::store::TargetStore;
use crate::value::{RawTarget, TargetId, Value};

/// Handle to one reactivity context. Cloning is cheap and shares the
/// context.
#[derive(Clone)]
pub struct Runtime {
    pub(crate) inner: Rc<Inner>,
}

pub(crate) struct Inner {
    pub(crate) config: RuntimeConfig,
    pub(crate) targets: RefCell<TargetStore>,
    pub(crate) graph: RefCell<DependencyGraph>,
    pub(crate) effects: RefCell<HashMap<EffectId, EffectSlot>>,
    pub(crate) handles: RefCell<HandleTable>,
    pub(crate) stack: EffectStack,
    pub(crate) lock: MutationLock,
}

impl Runtime {
    /// Create a runtime with the default configuration.
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    pub fn with_config(config: RuntimeConfig) -> Self {
        debug!(runtime = %config.name, unlocked = config.start_unlocked, "runtime created");
        let lock = MutationLock::new(config.start_unlocked);
        Self {
            inner: Rc::new(Inner {
                config,
                targets: RefCell::new(TargetStore::default()),
                graph: RefCell::new(DependencyGraph::new()),
                effects: RefCell::new(HashMap::new()),
                handles: RefCell::new(HandleTable::default()),
                stack: EffectStack::default(),
                lock,
            }),
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.inner.config
    }

    pub(crate) fn name(&self) -> &str {
        &self.inner.config.name
    }

    /// Whether two handles refer to the same context.
    pub fn ptr_eq(&self, other: &Runtime) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    // ------------------------------------------------------------------
    // Raw targets
    // ------------------------------------------------------------------

    /// Move `raw` into the arena. Nested facades are stored raw.
    pub fn insert(&self, raw: RawTarget) -> TargetId {
        let raw = match raw {
            RawTarget::Object(fields) => RawTarget::Object(
                fields
                    .into_iter()
                    .map(|(key, value)| (key, value.into_raw()))
                    .collect(),
            ),
            RawTarget::Array(items) => {
                RawTarget::Array(items.into_iter().map(Value::into_raw).collect())
            }
            RawTarget::Map(entries) => RawTarget::Map(raw_entries(entries)),
            RawTarget::WeakMap(entries) => RawTarget::WeakMap(raw_entries(entries)),
            RawTarget::Set(members) => RawTarget::Set(raw_members(members)),
            RawTarget::WeakSet(members) => RawTarget::WeakSet(raw_members(members)),
        };
        self.inner.targets.borrow_mut().insert(raw)
    }

    /// Allocate a plain object.
    pub fn object<K, V>(&self, fields: impl IntoIterator<Item = (K, V)>) -> TargetId
    where
        K: Into<String>,
        V: Into<Value>,
    {
        self.insert(RawTarget::Object(
            fields
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        ))
    }

    /// Allocate an array.
    pub fn array<V: Into<Value>>(&self, items: impl IntoIterator<Item = V>) -> TargetId {
        self.insert(RawTarget::Array(items.into_iter().map(Into::into).collect()))
    }

    /// Allocate a keyed collection.
    pub fn map<K, V>(&self, entries: impl IntoIterator<Item = (K, V)>) -> TargetId
    where
        K: Into<Value>,
        V: Into<Value>,
    {
        self.insert(RawTarget::Map(
            entries
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        ))
    }

    /// Allocate a set collection.
    pub fn set<V: Into<Value>>(&self, members: impl IntoIterator<Item = V>) -> TargetId {
        self.insert(RawTarget::Set(members.into_iter().map(Into::into).collect()))
    }

    /// Allocate an empty weak keyed collection.
    pub fn weak_map(&self) -> TargetId {
        self.insert(RawTarget::WeakMap(IndexMap::new()))
    }

    /// Allocate an empty weak set collection.
    pub fn weak_set(&self) -> TargetId {
        self.insert(RawTarget::WeakSet(IndexSet::new()))
    }

    /// Read the raw data directly. Nothing is tracked.
    ///
    /// `f` must not write through a facade of this runtime.
    pub fn with_raw<R>(&self, target: TargetId, f: impl FnOnce(&RawTarget) -> R) -> Option<R> {
        let targets = self.inner.targets.borrow();
        targets.get(target).map(f)
    }

    /// Mutate the raw data directly. Bypasses the lock and triggers
    /// nothing: effects will not hear about the change.
    ///
    /// `f` must not go through a facade of this runtime.
    pub fn with_raw_mut<R>(
        &self,
        target: TargetId,
        f: impl FnOnce(&mut RawTarget) -> R,
    ) -> Option<R> {
        let mut targets = self.inner.targets.borrow_mut();
        targets.get_mut(target).map(f)
    }

    pub(crate) fn targets(&self) -> Ref<'_, TargetStore> {
        self.inner.targets.borrow()
    }

    /// Number of live targets.
    pub fn target_count(&self) -> usize {
        self.inner.targets.borrow().len()
    }

    /// Destroy `target` together with its dependency entries and memoized
    /// facades, and purge it from every weak collection.
    ///
    /// Returns `false` if the target did not exist.
    pub fn release(&self, target: TargetId) -> bool {
        if self.inner.targets.borrow_mut().remove(target).is_none() {
            return false;
        }
        self.inner.graph.borrow_mut().remove_target(target);
        self.inner.handles.borrow_mut().forget_target(target);
        debug!(runtime = %self.name(), %target, "target released");
        true
    }

    /// Tear the context down: stop every effect, drop their closures and
    /// forget every target and facade.
    pub fn dispose(&self) {
        let effects: Vec<EffectSlot> = self
            .inner
            .effects
            .borrow_mut()
            .drain()
            .map(|(_, slot)| slot)
            .collect();
        self.inner.graph.borrow_mut().clear();
        self.inner.handles.borrow_mut().clear();
        self.inner.targets.borrow_mut().clear();
        debug!(runtime = %self.name(), effects = effects.len(), "runtime disposed");
        // closures may own facades of this runtime; drop them last
        drop(effects);
    }

    // ------------------------------------------------------------------
    // Tracking
    // ------------------------------------------------------------------

    /// Record that `effect`, or the running effect when `None`, depends on
    /// `key` of `target`. No-op when neither is available.
    pub fn track(&self, target: TargetId, key: DepKey, effect: Option<&Effect>) {
        self.track_with(target, key, effect.map(Effect::id));
    }

    pub(crate) fn track_with(&self, target: TargetId, key: DepKey, tracker: Option<EffectId>) {
        let Some(effect) = tracker.or_else(|| self.inner.stack.current()) else {
            return;
        };
        if !self.is_effect_active(effect) {
            return;
        }
        if self.inner.graph.borrow_mut().track(target, key.clone(), effect) {
            trace!(runtime = %self.name(), %target, %key, %effect, "tracked");
        }
    }

    /// Subscribe the running effect to everything `from` depends on.
    pub(crate) fn promote_into_current(&self, from: EffectId) {
        let Some(into) = self.inner.stack.current() else {
            return;
        };
        if !self.is_effect_active(into) {
            return;
        }
        let added = self.inner.graph.borrow_mut().promote(from, into);
        if added > 0 {
            trace!(runtime = %self.name(), %from, %into, added, "dependencies promoted");
        }
    }

    /// The innermost running effect.
    pub fn active_effect(&self) -> Option<EffectId> {
        self.inner.stack.current()
    }

    // ------------------------------------------------------------------
    // Triggering
    // ------------------------------------------------------------------

    /// Notify the effects a change to `target` concerns.
    ///
    /// `Set` and `Add` notify the subscribers of `key`; `Add` and `Delete`
    /// also notify the structural sentinel; `Clear` notifies everyone
    /// subscribed to any key of the target. Computed effects run first,
    /// then plain ones, then observers.
    pub fn trigger(&self, target: TargetId, op: TriggerOp, key: Option<DepKey>) {
        let structural = self
            .inner
            .targets
            .borrow()
            .kind(target)
            .map_or(DepKey::Iterate, |kind| kind.structural_key());

        let resolved =
            self.inner
                .graph
                .borrow()
                .subscribers(target, op, key.as_ref(), &structural);
        if resolved.is_empty() {
            return;
        }

        let dispatch = {
            let effects = self.inner.effects.borrow();
            Dispatch::partition(resolved, |id| effects.get(&id).map(|slot| slot.kind))
        };
        debug!(
            runtime = %self.name(),
            %target,
            ?op,
            ?key,
            effects = dispatch.len(),
            "trigger"
        );

        for effect in dispatch.into_order() {
            self.dispatch(effect);
        }
    }

    /// Run one notified effect through its scheduler, or directly.
    fn dispatch(&self, id: EffectId) {
        // stopped by an effect that ran earlier in this dispatch
        let Some(effect) = self.effect_handle(id) else {
            return;
        };
        match effect.scheduler() {
            Some(scheduler) => scheduler(&effect),
            None => {
                effect.run();
            }
        }
    }

    // ------------------------------------------------------------------
    // Effects
    // ------------------------------------------------------------------

    pub(crate) fn is_effect_active(&self, id: EffectId) -> bool {
        self.inner.effects.borrow().contains_key(&id)
    }

    pub(crate) fn effect_handle(&self, id: EffectId) -> Option<Effect> {
        let effects = self.inner.effects.borrow();
        effects
            .get(&id)
            .map(|slot| Effect::from_slot(self.clone(), id, slot))
    }

    /// The invocation protocol.
    ///
    /// A stopped effect runs `f` untracked. An effect already on the stack
    /// is skipped (`None`). Otherwise the effect is unsubscribed from all of
    /// its previous dependencies, pushed, `f` runs, and the effect pops.
    pub(crate) fn run_effect_with<R>(&self, id: EffectId, f: impl FnOnce() -> R) -> Option<R> {
        if !self.is_effect_active(id) {
            return Some(f());
        }
        if self.inner.stack.contains(id) {
            trace!(runtime = %self.name(), effect = %id, "skipping re-entrant run");
            return None;
        }

        self.inner.graph.borrow_mut().cleanup(id);
        let _frame = self.inner.stack.enter(id);
        Some(f())
    }

    /// Stop `id`: unsubscribe it everywhere and never schedule it again.
    pub(crate) fn stop_effect(&self, id: EffectId) -> bool {
        let Some(slot) = self.inner.effects.borrow_mut().remove(&id) else {
            return false;
        };
        let removed = self.inner.graph.borrow_mut().cleanup(id);
        self.inner.handles.borrow_mut().forget_tracker(id);
        debug!(runtime = %self.name(), effect = %id, kind = ?slot.kind, removed, "effect stopped");
        true
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("name", &self.name())
            .field("targets", &self.target_count())
            .field("effects", &self.inner.effects.borrow().len())
            .field("running", &self.inner.stack.depth())
            .field("mutation_allowed", &self.is_mutation_allowed())
            .finish()
    }
}

fn raw_entries(entries: IndexMap<Value, Value>) -> IndexMap<Value, Value> {
    entries
        .into_iter()
        .map(|(key, value)| (key.into_raw(), value.into_raw()))
        .collect()
}

fn raw_members(members: IndexSet<Value>) -> IndexSet<Value> {
    members.into_iter().map(Value::into_raw).collect()
}
