//! Per-Consumer Observers
//!
//! An observer gives one external subscriber a private view of shared
//! state. Each call to [`Runtime::observe`] creates a brand-new lazy effect
//! of the trace kind together with a read-only facade bound to it:
//!
//! - reads through [`TraceRef::value`] record into that effect only,
//! - a change to anything read calls the subscriber's callback,
//! - stopping the observer unsubscribes that effect and nothing else.
//!
//! Observers are dispatched last, after computed values were invalidated
//! and plain effects re-ran, so a callback always sees settled state.
//!
//! The effect never re-runs on its own. Running it (see [`Effect::run`])
//! drops every dependency recorded so far, which is how a consumer starts
//! a fresh render pass.

use std::fmt;

use super::computed::Computed;
use super::effect::{Effect, EffectOptions};
use super::handle::Reactive;
use super::runtime::Runtime;
use crate::error::Result;
use crate::graph::EffectKind;
use crate::value::TargetId;

/// One consumer's tracked view of a target.
#[derive(Clone)]
pub struct TraceRef {
    value: Reactive,
    effect: Effect,
}

impl TraceRef {
    /// The read-only facade. Every read through it is tracked.
    pub fn value(&self) -> &Reactive {
        &self.value
    }

    pub fn effect(&self) -> &Effect {
        &self.effect
    }

    /// Stop observing. Other observers of the same target are unaffected.
    pub fn stop(&self) {
        self.effect.stop();
    }
}

impl fmt::Debug for TraceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TraceRef")
            .field("target", &self.value.raw())
            .field("effect", &self.effect.id())
            .finish()
    }
}

/// One consumer's tracked view of a computed value.
pub struct ComputedTraceRef<T> {
    computed: Computed<T>,
    effect: Effect,
}

impl<T: Clone + 'static> ComputedTraceRef<T> {
    /// Read the computed value and subscribe this observer to everything
    /// it depends on.
    ///
    /// # Panics
    ///
    /// Panics under the same condition as [`Computed::get`].
    pub fn value(&self) -> T {
        match self.try_value() {
            Ok(value) => value,
            Err(err) => panic!("{err}"),
        }
    }

    /// Fallible form of [`value`](Self::value).
    pub fn try_value(&self) -> Result<T> {
        let computed = &self.computed;
        self.effect
            .runtime()
            .run_effect_with(self.effect.id(), || computed.try_get())
            .unwrap_or_else(|| computed.try_get())
    }
}

impl<T> ComputedTraceRef<T> {
    pub fn computed(&self) -> &Computed<T> {
        &self.computed
    }

    pub fn effect(&self) -> &Effect {
        &self.effect
    }

    pub fn stop(&self) {
        self.effect.stop();
    }
}

impl<T> Clone for ComputedTraceRef<T> {
    fn clone(&self) -> Self {
        Self {
            computed: self.computed.clone(),
            effect: self.effect.clone(),
        }
    }
}

impl<T> fmt::Debug for ComputedTraceRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComputedTraceRef")
            .field("computed", &self.computed.effect().id())
            .field("effect", &self.effect.id())
            .finish()
    }
}

impl Runtime {
    /// Give one consumer its own tracked view of `target`.
    ///
    /// `on_invalidate` is called whenever something read through the view
    /// changes.
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::cell::Cell;
    /// use std::rc::Rc;
    /// use nostate_core::{Runtime, Value};
    ///
    /// let runtime = Runtime::new();
    /// let state = runtime.reactive(runtime.object([("foo", 1)]));
    ///
    /// let calls = Rc::new(Cell::new(0));
    /// let counter = calls.clone();
    /// let view = runtime.observe(&state, move || counter.set(counter.get() + 1));
    ///
    /// assert_eq!(view.value().get("foo"), Value::from(1));
    /// runtime.with_mutation_allowed(|| state.set("foo", 2)).unwrap();
    /// assert_eq!(calls.get(), 1);
    /// ```
    pub fn observe(&self, target: impl Into<TargetId>, on_invalidate: impl Fn() + 'static) -> TraceRef {
        let effect = self.trace_effect(on_invalidate);
        let value = self.handle(target.into(), Some(effect.id()));
        TraceRef { value, effect }
    }

    /// Give one consumer its own subscription to `computed`.
    ///
    /// Every [`value`](ComputedTraceRef::value) read promotes the
    /// computed's dependencies into this observer's effect.
    pub fn observe_computed<T>(
        &self,
        computed: &Computed<T>,
        on_invalidate: impl Fn() + 'static,
    ) -> ComputedTraceRef<T> {
        ComputedTraceRef {
            computed: computed.clone(),
            effect: self.trace_effect(on_invalidate),
        }
    }

    fn trace_effect(&self, on_invalidate: impl Fn() + 'static) -> Effect {
        self.effect_with(
            || {},
            EffectOptions::lazy()
                .kind(EffectKind::Trace)
                .scheduler(move |_| on_invalidate()),
        )
    }
}
