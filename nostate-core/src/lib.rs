//! Nostate Core
//!
//! This crate provides fine-grained reactive dependency tracking for plain
//! application data. It implements:
//!
//! - Intercepting facades over objects, arrays and keyed/set collections
//! - Effects that re-run when the data they read changes
//! - Lazily recomputed, cached derived values
//! - Per-consumer observers with independent lifecycles
//! - A mutation lock that confines writes to reducers
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `value`: dynamically typed values and raw targets
//! - `graph`: the dependency graph and dispatch ordering
//! - `reactive`: the runtime, facades, effects, computed values, observers
//! - `snapshot`: serde views of state and JSON import
//!
//! # Example
//!
//! ```rust
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use nostate_core::{Runtime, Value};
//!
//! let runtime = Runtime::new();
//! let state = runtime.reactive(runtime.object([("count", 0)]));
//!
//! // Create a derived value
//! let reader = state.clone();
//! let doubled = runtime.computed(move || reader.get("count").as_f64().unwrap_or(0.0) * 2.0);
//!
//! // Create an effect
//! let seen = Rc::new(RefCell::new(Vec::new()));
//! let log = seen.clone();
//! runtime.effect(move || log.borrow_mut().push(doubled.get()));
//!
//! // Writes only succeed inside a reducer
//! assert!(state.set("count", 1).is_err());
//! runtime.with_mutation_allowed(|| state.set("count", 5)).unwrap();
//!
//! assert_eq!(*seen.borrow(), vec![0.0, 10.0]);
//! assert_eq!(state.get("count"), Value::from(5));
//! ```

pub mod config;
pub mod error;
pub mod graph;
pub mod reactive;
pub mod snapshot;
pub mod value;

mod store;

pub use config::RuntimeConfig;
pub use error::{Error, MutationOp, Result};
pub use graph::{DepKey, EffectId, EffectKind, TriggerOp};
pub use reactive::{
    Computed, ComputedTraceRef, Effect, EffectOptions, Reactive, Runtime, Scheduler, TraceRef,
};
pub use snapshot::Snapshot;
pub use value::{RawTarget, TargetId, TargetKind, Value};
