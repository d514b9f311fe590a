//! Values and raw targets.
//!
//! A [`RawTarget`] is application-owned data: a plain object, an array, or
//! a keyed/set collection. Targets live in a runtime's arena and are
//! addressed by a [`TargetId`]; a [`Value`] that points at another target
//! holds its id, which is how targets nest.
//!
//! [`Value`] equality is SameValueZero: `NaN` equals `NaN`, `+0` equals
//! `-0`, targets compare by id. The same rule decides whether a write
//! changed anything and how map keys and set members hash.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use indexmap::{IndexMap, IndexSet};

use crate::graph::DepKey;
use crate::reactive::Reactive;

/// Largest valid array index, `2^32 - 2`.
pub const MAX_ARRAY_INDEX: usize = 4_294_967_294;

/// Stable address of a raw target inside one runtime. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(pub(crate) u64);

impl TargetId {
    /// Get the raw index.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A dynamically typed value stored in, or read from, a target.
#[derive(Clone, Debug, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(Rc<str>),
    /// A nested raw target.
    Target(TargetId),
    /// A nested target, wrapped by the facade it was read through.
    Reactive(Reactive),
}

impl Value {
    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(&**s),
            _ => None,
        }
    }

    /// The facade this value was wrapped in, if it is a nested target read
    /// through a [`Reactive`].
    pub fn as_reactive(&self) -> Option<&Reactive> {
        match self {
            Value::Reactive(handle) => Some(handle),
            _ => None,
        }
    }

    /// The target this value points at, whether raw or wrapped.
    pub fn as_target(&self) -> Option<TargetId> {
        match self {
            Value::Target(id) => Some(*id),
            Value::Reactive(handle) => Some(handle.raw()),
            _ => None,
        }
    }

    /// Whether this value addresses a target (and so can be wrapped).
    pub fn is_target(&self) -> bool {
        matches!(self, Value::Target(_) | Value::Reactive(_))
    }

    /// Strip a facade, leaving the raw target it wraps.
    pub fn into_raw(self) -> Value {
        match self {
            Value::Reactive(handle) => Value::Target(handle.raw()),
            other => other,
        }
    }

    /// Property name for object access. Targets have no property name.
    pub(crate) fn to_property_key(&self) -> Option<String> {
        match self {
            Value::Target(_) | Value::Reactive(_) => None,
            Value::String(s) => Some(s.to_string()),
            other => Some(other.to_string()),
        }
    }

    /// Element index for array access: integral numbers in
    /// `0..=MAX_ARRAY_INDEX` and their canonical string spelling.
    pub(crate) fn to_index(&self) -> Option<usize> {
        let index = match self {
            Value::Number(n) if *n >= 0.0 && *n <= MAX_ARRAY_INDEX as f64 && n.fract() == 0.0 => {
                *n as usize
            }
            Value::String(s) => {
                let index: usize = s.parse().ok()?;
                if index.to_string() != **s {
                    return None;
                }
                index
            }
            _ => return None,
        };
        (index <= MAX_ARRAY_INDEX).then_some(index)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Target(a), Value::Target(b)) => a == b,
            (Value::Reactive(a), Value::Reactive(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Undefined | Value::Null => {}
            Value::Bool(b) => b.hash(state),
            Value::Number(n) => {
                // keep in step with SameValueZero
                let bits = if n.is_nan() {
                    f64::NAN.to_bits()
                } else if *n == 0.0 {
                    0
                } else {
                    n.to_bits()
                };
                bits.hash(state);
            }
            Value::String(s) => s.hash(state),
            Value::Target(id) => id.hash(state),
            Value::Reactive(handle) => handle.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("undefined"),
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) if n.is_nan() => f.write_str("NaN"),
            Value::Number(n) if n.is_infinite() => {
                f.write_str(if *n > 0.0 { "Infinity" } else { "-Infinity" })
            }
            Value::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            Value::Number(n) => write!(f, "{n}"),
            Value::String(s) => f.write_str(s),
            Value::Target(id) => write!(f, "[target {id}]"),
            Value::Reactive(handle) => write!(f, "[reactive {}]", handle.raw()),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Number(n as f64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(Rc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(Rc::from(s))
    }
}

impl From<TargetId> for Value {
    fn from(id: TargetId) -> Self {
        Value::Target(id)
    }
}

impl From<Reactive> for Value {
    fn from(handle: Reactive) -> Self {
        Value::Reactive(handle)
    }
}

impl From<&Reactive> for Value {
    fn from(handle: &Reactive) -> Self {
        Value::Reactive(handle.clone())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

/// The shape of a raw target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetKind {
    Object,
    Array,
    Map,
    Set,
    WeakMap,
    WeakSet,
}

impl TargetKind {
    /// Keyed and set collections are intercepted by method, not by property.
    pub fn is_collection(&self) -> bool {
        !matches!(self, TargetKind::Object | TargetKind::Array)
    }

    pub fn is_weak(&self) -> bool {
        matches!(self, TargetKind::WeakMap | TargetKind::WeakSet)
    }

    /// The sentinel standing for "the key/member set changed".
    ///
    /// Arrays use a length-like sentinel; every other shape shares the
    /// iteration sentinel.
    pub fn structural_key(&self) -> DepKey {
        match self {
            TargetKind::Array => DepKey::Length,
            _ => DepKey::Iterate,
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TargetKind::Object => "object",
            TargetKind::Array => "array",
            TargetKind::Map => "map",
            TargetKind::Set => "set",
            TargetKind::WeakMap => "weak map",
            TargetKind::WeakSet => "weak set",
        };
        f.write_str(name)
    }
}

/// Application-owned data behind a facade.
///
/// Stored values are always raw: a nested target appears as
/// [`Value::Target`], never as [`Value::Reactive`].
#[derive(Debug, Clone, PartialEq)]
pub enum RawTarget {
    Object(IndexMap<String, Value>),
    Array(Vec<Value>),
    Map(IndexMap<Value, Value>),
    Set(IndexSet<Value>),
    WeakMap(IndexMap<Value, Value>),
    WeakSet(IndexSet<Value>),
}

impl RawTarget {
    pub fn kind(&self) -> TargetKind {
        match self {
            RawTarget::Object(_) => TargetKind::Object,
            RawTarget::Array(_) => TargetKind::Array,
            RawTarget::Map(_) => TargetKind::Map,
            RawTarget::Set(_) => TargetKind::Set,
            RawTarget::WeakMap(_) => TargetKind::WeakMap,
            RawTarget::WeakSet(_) => TargetKind::WeakSet,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            RawTarget::Object(fields) => fields.len(),
            RawTarget::Array(items) => items.len(),
            RawTarget::Map(entries) | RawTarget::WeakMap(entries) => entries.len(),
            RawTarget::Set(members) | RawTarget::WeakSet(members) => members.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Key/value pairs in iteration order. Arrays pair each element with
    /// its index, sets pair each member with itself.
    pub fn entries(&self) -> Vec<(Value, Value)> {
        match self {
            RawTarget::Object(fields) => fields
                .iter()
                .map(|(key, value)| (Value::from(key.as_str()), value.clone()))
                .collect(),
            RawTarget::Array(items) => items
                .iter()
                .enumerate()
                .map(|(index, value)| (Value::from(index), value.clone()))
                .collect(),
            RawTarget::Map(entries) | RawTarget::WeakMap(entries) => entries
                .iter()
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
            RawTarget::Set(members) | RawTarget::WeakSet(members) => members
                .iter()
                .map(|member| (member.clone(), member.clone()))
                .collect(),
        }
    }

    /// Drop every weak entry keyed by `target`. Returns whether anything
    /// was removed.
    pub(crate) fn forget_weak(&mut self, target: TargetId) -> bool {
        let key = Value::Target(target);
        match self {
            RawTarget::WeakMap(entries) => entries.shift_remove(&key).is_some(),
            RawTarget::WeakSet(members) => members.shift_remove(&key),
            _ => false,
        }
    }
}
