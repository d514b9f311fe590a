//! Moving state in and out of a runtime.
//!
//! [`Runtime::snapshot`] borrows a value as a serde [`Serialize`] view that
//! follows nested targets: objects and maps become maps, arrays and sets
//! become sequences. Reading a snapshot never tracks. A target that
//! contains itself cannot be serialized and fails with a custom error.
//!
//! [`Runtime::from_json`] goes the other way and allocates one target per
//! JSON object or array.

use serde::ser::{Error as _, SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

use crate::reactive::Runtime;
use crate::store::TargetStore;
use crate::value::{RawTarget, TargetId, Value};

/// Largest integer an `f64` represents exactly.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Serializable view of a value and everything it reaches.
pub struct Snapshot<'a> {
    runtime: &'a Runtime,
    value: &'a Value,
}

impl Serialize for Snapshot<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let targets = self.runtime.targets();
        Node {
            targets: &targets,
            value: self.value,
            ancestors: &[],
        }
        .serialize(serializer)
    }
}

struct Node<'a> {
    targets: &'a TargetStore,
    value: &'a Value,
    ancestors: &'a [TargetId],
}

impl Node<'_> {
    fn child<'b>(&'b self, value: &'b Value, ancestors: &'b [TargetId]) -> Node<'b> {
        Node {
            targets: self.targets,
            value,
            ancestors,
        }
    }
}

impl Serialize for Node<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let id = match self.value {
            Value::Undefined | Value::Null => return serializer.serialize_unit(),
            Value::Bool(b) => return serializer.serialize_bool(*b),
            Value::Number(n) if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER => {
                return serializer.serialize_i64(*n as i64)
            }
            Value::Number(n) => return serializer.serialize_f64(*n),
            Value::String(s) => return serializer.serialize_str(s),
            Value::Target(id) => *id,
            Value::Reactive(handle) => handle.raw(),
        };

        if self.ancestors.contains(&id) {
            return Err(S::Error::custom(format!(
                "target {id} contains itself and cannot be serialized"
            )));
        }
        let Some(raw) = self.targets.get(id) else {
            return serializer.serialize_unit();
        };

        let mut ancestors = self.ancestors.to_vec();
        ancestors.push(id);

        match raw {
            RawTarget::Object(fields) => {
                let mut map = serializer.serialize_map(Some(fields.len()))?;
                for (key, value) in fields {
                    map.serialize_entry(key, &self.child(value, &ancestors))?;
                }
                map.end()
            }
            RawTarget::Map(entries) | RawTarget::WeakMap(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(&key.to_string(), &self.child(value, &ancestors))?;
                }
                map.end()
            }
            RawTarget::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(&self.child(item, &ancestors))?;
                }
                seq.end()
            }
            RawTarget::Set(members) | RawTarget::WeakSet(members) => {
                let mut seq = serializer.serialize_seq(Some(members.len()))?;
                for member in members {
                    seq.serialize_element(&self.child(member, &ancestors))?;
                }
                seq.end()
            }
        }
    }
}

impl Runtime {
    /// Serializable view of `value`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use nostate_core::{Runtime, Value};
    ///
    /// let runtime = Runtime::new();
    /// let todo = runtime.object([("title", Value::from("write docs")), ("done", Value::from(false))]);
    ///
    /// let json = serde_json::to_string(&runtime.snapshot(&Value::Target(todo))).unwrap();
    /// assert_eq!(json, r#"{"title":"write docs","done":false}"#);
    /// ```
    pub fn snapshot<'a>(&'a self, value: &'a Value) -> Snapshot<'a> {
        Snapshot {
            runtime: self,
            value,
        }
    }

    /// Convert `value` into a JSON tree.
    pub fn to_json(&self, value: &Value) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self.snapshot(value))
    }

    /// Allocate targets for a JSON tree. Objects become objects, arrays
    /// become arrays, everything else becomes the matching primitive.
    pub fn from_json(&self, json: &serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => n.as_f64().map_or(Value::Null, Value::Number),
            serde_json::Value::String(s) => Value::from(s.as_str()),
            serde_json::Value::Array(items) => {
                let items: Vec<Value> = items.iter().map(|item| self.from_json(item)).collect();
                Value::Target(self.array(items))
            }
            serde_json::Value::Object(fields) => {
                let fields: Vec<(String, Value)> = fields
                    .iter()
                    .map(|(key, value)| (key.clone(), self.from_json(value)))
                    .collect();
                Value::Target(self.object(fields))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn round_trips_nested_state() {
        let runtime = Runtime::new();
        let source = json!({
            "todos": [{ "title": "a", "done": false }, { "title": "b", "done": true }],
            "filter": null,
            "ratio": 0.5
        });

        let value = runtime.from_json(&source);
        assert!(value.is_target());
        assert_eq!(runtime.to_json(&value).unwrap(), source);
    }

    #[test]
    fn snapshot_follows_facades() {
        let runtime = Runtime::new();
        let state = runtime.reactive(runtime.object([("count", 1)]));
        let nested = runtime.object([("inner", Value::from(&state))]);

        assert_eq!(
            runtime.to_json(&Value::Target(nested)).unwrap(),
            json!({ "inner": { "count": 1 } })
        );
    }

    #[test]
    fn collections_serialize_by_shape() {
        let runtime = Runtime::new();
        let map = runtime.map([(1, "one")]);
        let set = runtime.set(["x", "y"]);
        let root = runtime.object([("map", map), ("set", set)]);

        assert_eq!(
            runtime.to_json(&Value::Target(root)).unwrap(),
            json!({ "map": { "1": "one" }, "set": ["x", "y"] })
        );
    }

    #[test]
    fn self_reference_is_an_error() {
        let runtime = Runtime::new();
        let list = runtime.array::<Value>([]);
        runtime.with_raw_mut(list, |raw| {
            if let RawTarget::Array(items) = raw {
                items.push(Value::Target(list));
            }
        });

        assert!(runtime.to_json(&Value::Target(list)).is_err());
    }

    #[test]
    fn shared_subtrees_are_not_cycles() {
        let runtime = Runtime::new();
        let shared = runtime.object([("id", 1)]);
        let root = runtime.array([shared, shared]);

        assert_eq!(
            runtime.to_json(&Value::Target(root)).unwrap(),
            json!([{ "id": 1 }, { "id": 1 }])
        );
    }
}
