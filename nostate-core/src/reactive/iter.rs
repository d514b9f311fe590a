//! Tracked iteration.
//!
//! Iterating a facade depends on the key set, so creating an iterator
//! tracks the structural sentinel once. Iterating the values of an object
//! or array also reads every key, so those reads are tracked up front as
//! well; [`Reactive::keys`] stays structural. Maps and sets only track the
//! sentinel.
//!
//! The raw pairs are copied when the iterator is created; nested targets
//! are wrapped lazily, one item at a time, through the same handle table
//! every other read goes through.

use std::vec;

use super::handle::Reactive;
use super::runtime::Runtime;
use crate::graph::{DepKey, EffectId};
use crate::value::{RawTarget, TargetKind, Value};

/// Iterator over `(key, value)` pairs of a facade.
///
/// Objects yield property names, arrays yield indices, maps yield their
/// keys and sets yield each member paired with itself.
pub struct Entries {
    runtime: Runtime,
    tracker: Option<EffectId>,
    pairs: vec::IntoIter<(Value, Value)>,
}

/// Iterator over the keys of a facade.
pub struct Keys(Entries);

/// Iterator over the values of a facade.
pub struct Values(Entries);

impl Iterator for Entries {
    type Item = (Value, Value);

    fn next(&mut self) -> Option<Self::Item> {
        let (key, value) = self.pairs.next()?;
        Some((
            self.runtime.wrap(key, self.tracker),
            self.runtime.wrap(value, self.tracker),
        ))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.pairs.size_hint()
    }
}

impl ExactSizeIterator for Entries {}

impl Iterator for Keys {
    type Item = Value;

    fn next(&mut self) -> Option<Value> {
        let (key, _) = self.0.pairs.next()?;
        Some(self.0.runtime.wrap(key, self.0.tracker))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}

impl ExactSizeIterator for Keys {}

impl Iterator for Values {
    type Item = Value;

    fn next(&mut self) -> Option<Value> {
        let (_, value) = self.0.pairs.next()?;
        Some(self.0.runtime.wrap(value, self.0.tracker))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}

impl ExactSizeIterator for Values {}

impl Reactive {
    /// Iterate `(key, value)` pairs in insertion order.
    pub fn entries(&self) -> Entries {
        self.collect_entries(true)
    }

    /// Default iteration. Same as [`entries`](Self::entries).
    pub fn iter(&self) -> Entries {
        self.entries()
    }

    /// Iterate keys. Only the key set is tracked, never the values.
    pub fn keys(&self) -> Keys {
        Keys(self.collect_entries(false))
    }

    pub fn values(&self) -> Values {
        Values(self.entries())
    }

    /// Call `f(value, key)` for every entry.
    pub fn for_each(&self, mut f: impl FnMut(Value, Value)) {
        for (key, value) in self.entries() {
            f(value, key);
        }
    }

    fn collect_entries(&self, read_values: bool) -> Entries {
        let pairs = match self.kind() {
            Some(kind) => {
                self.track(kind.structural_key());
                let pairs = self
                    .runtime
                    .with_raw(self.target, RawTarget::entries)
                    .unwrap_or_default();
                if read_values {
                    self.track_each(kind, &pairs);
                }
                pairs
            }
            None => Vec::new(),
        };
        Entries {
            runtime: self.runtime.clone(),
            tracker: self.tracker,
            pairs: pairs.into_iter(),
        }
    }

    fn track_each(&self, kind: TargetKind, pairs: &[(Value, Value)]) {
        match kind {
            TargetKind::Object => {
                for (key, _) in pairs {
                    if let Some(name) = key.to_property_key() {
                        self.track(DepKey::Field(name));
                    }
                }
            }
            TargetKind::Array => {
                for index in 0..pairs.len() {
                    self.track(DepKey::Index(index));
                }
            }
            _ => {}
        }
    }
}

impl IntoIterator for &Reactive {
    type Item = (Value, Value);
    type IntoIter = Entries;

    fn into_iter(self) -> Entries {
        self.entries()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use crate::config::RuntimeConfig;
    use crate::reactive::Runtime;
    use crate::value::Value;

    fn unlocked() -> Runtime {
        Runtime::with_config(RuntimeConfig {
            start_unlocked: true,
            ..RuntimeConfig::default()
        })
    }

    #[test]
    fn iteration_tracks_key_set_only() {
        let runtime = unlocked();
        let map = runtime.reactive(runtime.map([("a", 1)]));
        let runs = Rc::new(Cell::new(0));

        let (reader, counter) = (map.clone(), runs.clone());
        runtime.effect(move || {
            counter.set(counter.get() + 1);
            for _ in reader.keys() {}
        });

        map.set("a", 2).unwrap();
        assert_eq!(runs.get(), 1);

        map.set("b", 1).unwrap();
        assert_eq!(runs.get(), 2);

        map.delete("a").unwrap();
        assert_eq!(runs.get(), 3);
    }

    #[test]
    fn nested_values_come_back_wrapped() {
        let runtime = Runtime::new();
        let inner = runtime.object([("id", 1)]);
        let map = runtime.reactive(runtime.map([(inner, inner)]));

        let (key, value) = map.entries().next().unwrap();
        assert!(runtime.is_reactive(&key));
        assert!(runtime.is_reactive(&value));
        assert_eq!(key, value);
    }

    #[test]
    fn repeated_iteration_yields_equal_handles() {
        let runtime = Runtime::new();
        let inner = runtime.object([("id", 1)]);
        let list = runtime.reactive(runtime.array([inner]));

        let first: Vec<Value> = list.values().collect();
        let second: Vec<Value> = list.values().collect();
        assert_eq!(first, second);
        assert_eq!(runtime.handle_count(), 2);
    }

    #[test]
    fn for_each_passes_value_then_key() {
        let runtime = Runtime::new();
        let state = runtime.reactive(runtime.object([("a", 1), ("b", 2)]));

        let mut seen = Vec::new();
        state.for_each(|value, key| seen.push((key, value)));
        assert_eq!(
            seen,
            vec![
                (Value::from("a"), Value::from(1)),
                (Value::from("b"), Value::from(2))
            ]
        );
    }

    #[test]
    fn sets_pair_members_with_themselves() {
        let runtime = Runtime::new();
        let set = runtime.reactive(runtime.set(["x"]));

        let pairs: Vec<_> = (&set).into_iter().collect();
        assert_eq!(pairs, vec![(Value::from("x"), Value::from("x"))]);
        assert_eq!(set.keys().len(), 1);
    }

    fn sum(values: impl Iterator<Item = Value>) -> f64 {
        values.filter_map(|value| value.as_f64()).sum()
    }

    #[test]
    fn array_values_track_each_element() {
        let runtime = unlocked();
        let list = runtime.reactive(runtime.array([1, 2]));
        let total = Rc::new(Cell::new(0.0));

        let (reader, seen) = (list.clone(), total.clone());
        runtime.effect(move || seen.set(sum(reader.values())));
        assert_eq!(total.get(), 3.0);

        list.set(0, 10).unwrap();
        assert_eq!(total.get(), 12.0);

        list.push(5).unwrap();
        assert_eq!(total.get(), 17.0);
    }

    #[test]
    fn object_entries_track_each_field() {
        let runtime = unlocked();
        let state = runtime.reactive(runtime.object([("a", 1), ("b", 2)]));

        let reader = state.clone();
        let total = runtime.computed(move || sum(reader.entries().map(|(_, value)| value)));
        assert_eq!(total.get(), 3.0);

        state.set("a", 10).unwrap();
        assert!(total.is_dirty());
        assert_eq!(total.get(), 12.0);
    }

    #[test]
    fn for_each_tracks_each_value() {
        let runtime = unlocked();
        let state = runtime.reactive(runtime.object([("a", 1)]));
        let runs = Rc::new(Cell::new(0));

        let (reader, counter) = (state.clone(), runs.clone());
        runtime.effect(move || {
            counter.set(counter.get() + 1);
            reader.for_each(|_, _| {});
        });

        state.set("a", 2).unwrap();
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn keys_ignore_value_changes() {
        let runtime = unlocked();
        let list = runtime.reactive(runtime.array([1, 2]));
        let runs = Rc::new(Cell::new(0));

        let (reader, counter) = (list.clone(), runs.clone());
        runtime.effect(move || {
            counter.set(counter.get() + 1);
            for _ in reader.keys() {}
        });

        list.set(0, 10).unwrap();
        assert_eq!(runs.get(), 1);

        list.push(3).unwrap();
        assert_eq!(runs.get(), 2);
    }
}
