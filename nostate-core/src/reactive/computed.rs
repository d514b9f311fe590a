//! Computed Values
//!
//! A Computed is a derived value that caches its result. It is built on a
//! lazy effect of the computed kind whose scheduler only marks the cache
//! dirty.
//!
//! # How Computed Values Work
//!
//! 1. Creating a computed runs nothing. The cache starts dirty.
//!
//! 2. Reading a dirty computed runs the derivation as its effect, so every
//!    facade read inside is recorded, caches the result and clears the
//!    flag. Reading a clean computed returns the cache.
//!
//! 3. When anything the derivation read changes, the scheduler sets the
//!    dirty flag. Nothing is recomputed until the next read.
//!
//! # Dependency Promotion
//!
//! Every read also subscribes the running effect to everything the
//! computed depends on. An outer effect that only reads the computed is
//! therefore notified when the underlying sources change, even though the
//! computed itself was served from cache.
//!
//! Computed effects are dispatched before everything else, so by the time
//! a dependent effect re-runs within the same trigger the cache is already
//! marked dirty.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use super::effect::{Effect, EffectOptions};
use super::runtime::Runtime;
use crate::error::{Error, Result};
use crate::graph::EffectKind;

struct Cache<T> {
    dirty: Cell<bool>,
    value: RefCell<Option<T>>,
}

/// A lazily evaluated, cached derived value.
pub struct Computed<T> {
    runtime: Runtime,
    effect: Effect,
    cache: Rc<Cache<T>>,
}

impl<T> Clone for Computed<T> {
    fn clone(&self) -> Self {
        Self {
            runtime: self.runtime.clone(),
            effect: self.effect.clone(),
            cache: self.cache.clone(),
        }
    }
}

impl<T> Computed<T> {
    /// The effect the derivation runs as.
    pub fn effect(&self) -> &Effect {
        &self.effect
    }

    /// Whether the next read will recompute.
    pub fn is_dirty(&self) -> bool {
        self.cache.dirty.get()
    }

    /// Stop tracking. The cached value is kept and never invalidated again.
    pub fn stop(&self) {
        self.effect.stop();
    }
}

impl<T: 'static> Computed<T> {
    /// The current value, recomputing if dirty.
    ///
    /// # Panics
    ///
    /// Panics if called from inside its own derivation. Use
    /// [`try_get`](Self::try_get) to handle that case.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        match self.try_get() {
            Ok(value) => value,
            Err(err) => panic!("{err}"),
        }
    }

    /// The current value, or [`Error::CyclicComputed`] when the derivation
    /// reads itself.
    pub fn try_get(&self) -> Result<T>
    where
        T: Clone,
    {
        self.try_with(T::clone)
    }

    /// Borrow the current value without cloning it.
    pub fn try_with<R>(&self, f: impl FnOnce(&T) -> R) -> Result<R> {
        self.refresh()?;
        self.runtime.promote_into_current(self.effect.id());

        let value = self.cache.value.borrow();
        value.as_ref().map(f).ok_or(Error::CyclicComputed)
    }

    fn refresh(&self) -> Result<()> {
        if !self.cache.dirty.get() {
            return Ok(());
        }
        if !self.effect.run() {
            return Err(Error::CyclicComputed);
        }
        self.cache.dirty.set(false);
        Ok(())
    }
}

impl<T> fmt::Debug for Computed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Computed")
            .field("effect", &self.effect.id())
            .field("dirty", &self.cache.dirty.get())
            .finish()
    }
}

impl Runtime {
    /// Create a computed value from `derive`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use nostate_core::Runtime;
    ///
    /// let runtime = Runtime::new();
    /// let state = runtime.reactive(runtime.object([("count", 2)]));
    ///
    /// let reader = state.clone();
    /// let doubled = runtime.computed(move || reader.get("count").as_f64().unwrap_or(0.0) * 2.0);
    /// assert_eq!(doubled.get(), 4.0);
    ///
    /// runtime.with_mutation_allowed(|| state.set("count", 5)).unwrap();
    /// assert_eq!(doubled.get(), 10.0);
    /// ```
    pub fn computed<T: 'static>(&self, derive: impl Fn() -> T + 'static) -> Computed<T> {
        let cache = Rc::new(Cache {
            dirty: Cell::new(true),
            value: RefCell::new(None),
        });

        let writer = Rc::downgrade(&cache);
        let invalidate = Rc::downgrade(&cache);
        let effect = self.effect_with(
            move || {
                let value = derive();
                if let Some(cache) = writer.upgrade() {
                    *cache.value.borrow_mut() = Some(value);
                }
            },
            EffectOptions::lazy()
                .kind(EffectKind::Computed)
                .scheduler(move |_| {
                    if let Some(cache) = invalidate.upgrade() {
                        cache.dirty.set(true);
                    }
                }),
        );

        Computed {
            runtime: self.clone(),
            effect,
            cache,
        }
    }
}
