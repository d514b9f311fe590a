//! Dependency Graph
//!
//! This module implements the bookkeeping that links raw data to the
//! effects that read it.
//!
//! # Overview
//!
//! The graph maps `(target, key)` pairs to sets of subscribed effects, where
//! a key is either a concrete property/element/entry or a structural
//! sentinel standing for "the key set changed". Every effect also keeps the
//! list of sets it is in, so it can unsubscribe without a scan.
//!
//! When a target changes, the graph resolves which effects must hear about
//! it and the scheduler orders them by priority class.
//!
//! # Design Decisions
//!
//! 1. Sentinels differ by shape: arrays use [`DepKey::Length`], objects and
//!    collections share [`DepKey::Iterate`].
//!
//! 2. Dependency sets are insertion ordered, so dispatch within a priority
//!    class follows subscription order.
//!
//! 3. Nothing here runs user code. The runtime releases its borrow of the
//!    graph before dispatching.

mod deps;
mod key;
mod node;
mod scheduler;

pub use deps::{Dep, DependencyGraph};
pub use key::{DepKey, TriggerOp};
pub use node::{EffectId, EffectKind};
pub use scheduler::Dispatch;
