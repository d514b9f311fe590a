//! Reactive Primitives
//!
//! This module implements the reactivity engine on top of the dependency
//! graph: facades, effects, computed values and observers.
//!
//! # Concepts
//!
//! ## Facades
//!
//! A [`Reactive`] intercepts every operation on one raw target. Reads are
//! tracked into the running effect; writes are forwarded to the raw data
//! and trigger the effects that read what changed. Writes are only
//! permitted inside a reducer (see [`Runtime::with_mutation_allowed`]).
//!
//! ## Effects
//!
//! An [`Effect`] is a function whose reads are recorded. When something it
//! read changes, its scheduler is called, or it simply re-runs.
//!
//! ## Computed Values
//!
//! A [`Computed`] caches a derived value and recomputes it lazily, only
//! after one of its inputs changed and only when it is read again.
//!
//! ## Observers
//!
//! A [`TraceRef`] is one consumer's private, read-only view of shared
//! state. Each consumer owns its subscription and can drop it without
//! affecting anyone else.
//!
//! # Implementation Notes
//!
//! Everything lives in a [`Runtime`], the explicit context. The engine is
//! single-threaded: handles are `Rc` based and neither `Send` nor `Sync`.

mod collection;
mod computed;
mod context;
mod effect;
mod handle;
mod iter;
mod lock;
mod runtime;
mod trace;

pub use computed::Computed;
pub use effect::{Effect, EffectOptions, Scheduler};
pub use handle::Reactive;
pub use iter::{Entries, Keys, Values};
pub use runtime::Runtime;
pub use trace::{ComputedTraceRef, TraceRef};
