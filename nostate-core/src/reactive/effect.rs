//! Effect Implementation
//!
//! An Effect is a function whose facade reads are recorded while it runs,
//! and which is notified whenever any of those reads would now observe
//! something different.
//!
//! # How Effects Work
//!
//! 1. When created, the effect runs once to establish its dependencies,
//!    unless it is lazy.
//!
//! 2. When a dependency changes, the effect's scheduler is called. Without
//!    a scheduler the effect simply re-runs.
//!
//! 3. Every run first unsubscribes the effect from all of its previous
//!    dependencies, so an effect only ever depends on what its latest run
//!    read.
//!
//! # Kinds
//!
//! The [`EffectKind`] decides the dispatch priority: computed values are
//! invalidated first, then plain effects run, then observers are told.
//!
//! # Stopping
//!
//! A stopped effect is unsubscribed everywhere and never scheduled again.
//! Running it directly still calls its function, untracked.

use std::fmt;
use std::rc::Rc;

use tracing::debug;

use super::runtime::Runtime;
use crate::graph::{EffectId, EffectKind};

/// Called instead of re-running when an effect is notified.
pub type Scheduler = Rc<dyn Fn(&Effect)>;

/// Options for [`Runtime::effect_with`].
#[derive(Clone, Default)]
pub struct EffectOptions {
    /// Skip the initial run.
    pub lazy: bool,
    pub kind: EffectKind,
    pub scheduler: Option<Scheduler>,
}

impl EffectOptions {
    /// Options for an effect that does not run on creation.
    pub fn lazy() -> Self {
        Self {
            lazy: true,
            ..Self::default()
        }
    }

    pub fn kind(mut self, kind: EffectKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn scheduler(mut self, scheduler: impl Fn(&Effect) + 'static) -> Self {
        self.scheduler = Some(Rc::new(scheduler));
        self
    }
}

impl fmt::Debug for EffectOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectOptions")
            .field("lazy", &self.lazy)
            .field("kind", &self.kind)
            .field("scheduler", &self.scheduler.is_some())
            .finish()
    }
}

/// Registry entry of a live effect.
pub(crate) struct EffectSlot {
    pub(crate) kind: EffectKind,
    pub(crate) scheduler: Option<Scheduler>,
    pub(crate) func: Rc<dyn Fn()>,
}

/// Handle to an effect. Clones refer to the same effect.
#[derive(Clone)]
pub struct Effect {
    runtime: Runtime,
    id: EffectId,
    kind: EffectKind,
    scheduler: Option<Scheduler>,
    func: Rc<dyn Fn()>,
}

impl Effect {
    pub(crate) fn from_slot(runtime: Runtime, id: EffectId, slot: &EffectSlot) -> Self {
        Self {
            runtime,
            id,
            kind: slot.kind,
            scheduler: slot.scheduler.clone(),
            func: slot.func.clone(),
        }
    }

    pub fn id(&self) -> EffectId {
        self.id
    }

    pub fn kind(&self) -> EffectKind {
        self.kind
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    pub(crate) fn scheduler(&self) -> Option<&Scheduler> {
        self.scheduler.as_ref()
    }

    /// Run the effect now, re-collecting its dependencies.
    ///
    /// Returns `false` when the effect is already running further up the
    /// stack; such a run is skipped. A stopped effect runs untracked.
    pub fn run(&self) -> bool {
        let func = self.func.clone();
        self.runtime.run_effect_with(self.id, || func()).is_some()
    }

    /// Unsubscribe the effect everywhere and never schedule it again.
    /// Stopping twice is a no-op.
    pub fn stop(&self) {
        self.runtime.stop_effect(self.id);
    }

    pub fn is_active(&self) -> bool {
        self.runtime.is_effect_active(self.id)
    }

    /// Number of `(target, key)` pairs the effect is subscribed to.
    pub fn dependency_count(&self) -> usize {
        self.runtime.inner.graph.borrow().dependency_count(self.id)
    }
}

impl PartialEq for Effect {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Effect {}

impl fmt::Debug for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Effect")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("active", &self.is_active())
            .finish()
    }
}

impl Runtime {
    /// Create a plain effect and run it once.
    ///
    /// # Example
    ///
    /// ```rust
    /// use nostate_core::Runtime;
    ///
    /// let runtime = Runtime::new();
    /// let state = runtime.reactive(runtime.object([("count", 0)]));
    ///
    /// let reader = state.clone();
    /// let effect = runtime.effect(move || println!("count is {}", reader.get("count")));
    /// assert_eq!(effect.dependency_count(), 1);
    /// ```
    pub fn effect(&self, f: impl Fn() + 'static) -> Effect {
        self.effect_with(f, EffectOptions::default())
    }

    /// Create an effect with explicit options.
    pub fn effect_with(&self, f: impl Fn() + 'static, options: EffectOptions) -> Effect {
        let id = EffectId::new();
        let slot = EffectSlot {
            kind: options.kind,
            scheduler: options.scheduler,
            func: Rc::new(f),
        };
        let effect = Effect::from_slot(self.clone(), id, &slot);
        self.inner.effects.borrow_mut().insert(id, slot);
        debug!(runtime = %self.name(), effect = %id, kind = ?options.kind, lazy = options.lazy, "effect created");

        if !options.lazy {
            effect.run();
        }
        effect
    }

    /// Stop `effect`. Same as [`Effect::stop`].
    pub fn stop(&self, effect: &Effect) {
        effect.stop();
    }
}
