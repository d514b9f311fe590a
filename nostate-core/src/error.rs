//! Error taxonomy for the reactivity engine.
//!
//! Every error here signals a programming error in the calling layer, not a
//! transient condition: nothing is retried and nothing is recovered inside
//! the engine. Errors are returned synchronously to the caller of the
//! offending operation.

use std::fmt;

use thiserror::Error;

use crate::value::{TargetId, TargetKind};

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The kind of write that was attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationOp {
    Set,
    Add,
    Delete,
    Clear,
    Push,
    Pop,
}

impl fmt::Display for MutationOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MutationOp::Set => "set",
            MutationOp::Add => "add",
            MutationOp::Delete => "delete",
            MutationOp::Clear => "clear",
            MutationOp::Push => "push",
            MutationOp::Pop => "pop",
        };
        f.write_str(name)
    }
}

/// Errors raised by intercepted operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// A write was attempted while the mutation lock was closed.
    #[error("cannot {op} key `{key}`: state is read-only except inside a reducer")]
    MutationOutsideReducer { op: MutationOp, key: String },

    /// A write was attempted through an observer's view.
    #[error("cannot {op} key `{key}`: observed views are read-only, write through the shared state instead")]
    ReadOnlyViolation { op: MutationOp, key: String },

    /// The operation does not exist for this kind of target.
    #[error("{op} is not supported on {kind} targets")]
    UnsupportedOperation { op: MutationOp, kind: TargetKind },

    /// The key cannot address a slot of this kind of target.
    #[error("invalid key `{key}` for {kind} target")]
    InvalidKey { key: String, kind: TargetKind },

    /// Weak collections only hold targets.
    #[error("invalid value used as weak collection key: `{key}`")]
    InvalidWeakKey { key: String },

    /// The target was released or never belonged to this runtime.
    #[error("target {0} does not exist in this runtime")]
    UnknownTarget(TargetId),

    /// A computed value was read while it was deriving itself.
    #[error("computed value was read while it was being derived")]
    CyclicComputed,
}
