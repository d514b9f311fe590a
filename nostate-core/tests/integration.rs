//! Integration Tests for the Reactivity Engine
//!
//! These tests verify that facades, effects, computed values and observers
//! work together correctly through the public API.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use nostate_core::{
    EffectKind, EffectOptions, Error, MutationOp, Reactive, Runtime, RuntimeConfig, Value,
};

/// Shared call counter for effect and observer callbacks.
fn counter() -> (Rc<Cell<usize>>, impl Fn() + Clone + 'static) {
    let calls = Rc::new(Cell::new(0));
    let handle = calls.clone();
    (calls, move || handle.set(handle.get() + 1))
}

fn number(state: &Reactive, key: &str) -> f64 {
    state.get(key).as_f64().unwrap_or(f64::NAN)
}

/// Test that wrapping the same target twice yields the same facade.
#[test]
fn reactive_is_memoized_per_target() {
    let runtime = Runtime::new();
    let target = runtime.object([("foo", 1)]);

    let first = runtime.reactive(target);
    let second = runtime.reactive(target);
    assert_eq!(first, second);
    assert!(runtime.is_reactive(&Value::from(&first)));
    assert_eq!(runtime.unwrap(Value::from(first)), Value::Target(target));

    // a tracked context gets its own facade, memoized per effect
    let (_, cb) = counter();
    let view = runtime.observe(target, cb);
    assert_ne!(view.value(), &second);
    assert_eq!(runtime.handle_count(), 2);
}

/// Test that a write runs exactly the effects subscribed to the key, computed
/// first, plain second, observers last.
#[test]
fn trigger_runs_subscribers_in_priority_order() {
    let runtime = Runtime::with_config(RuntimeConfig::named("ordering"));
    let state = runtime.reactive(runtime.object([("foo", 1), ("bar", 1)]));
    let order = Rc::new(RefCell::new(Vec::new()));

    // observer subscribes first
    let log = order.clone();
    let view = runtime.observe(&state, move || log.borrow_mut().push("trace"));
    view.value().get("foo");

    let (reader, log) = (state.clone(), order.clone());
    let _plain = runtime.effect_with(
        move || {
            reader.get("foo");
        },
        EffectOptions::default().scheduler(move |_| log.borrow_mut().push("plain")),
    );

    let (reader, log) = (state.clone(), order.clone());
    let _derived = runtime.effect_with(
        move || {
            reader.get("foo");
        },
        EffectOptions::default()
            .kind(EffectKind::Computed)
            .scheduler(move |_| log.borrow_mut().push("computed")),
    );

    let reader = state.clone();
    let computed = runtime.computed(move || number(&reader, "foo"));
    computed.get();

    // an effect on another key must stay quiet
    let (bar_calls, bump) = counter();
    let reader = state.clone();
    runtime.effect_with(
        move || {
            reader.get("bar");
        },
        EffectOptions::lazy().scheduler(move |_| bump()),
    )
    .run();

    runtime
        .with_mutation_allowed(|| state.set("foo", 2))
        .unwrap();

    assert_eq!(*order.borrow(), vec!["computed", "plain", "trace"]);
    assert!(computed.is_dirty());
    assert_eq!(bar_calls.get(), 0);
}

/// Test that stopping an effect twice is harmless.
#[test]
fn stop_is_idempotent() {
    let runtime = Runtime::new();
    let state = runtime.reactive(runtime.object([("foo", 1)]));
    let (calls, bump) = counter();

    let reader = state.clone();
    let effect = runtime.effect(move || {
        bump();
        reader.get("foo");
    });

    runtime.stop(&effect);
    runtime.stop(&effect);
    effect.stop();

    runtime
        .with_mutation_allowed(|| state.set("foo", 2))
        .unwrap();
    assert_eq!(calls.get(), 1);
    assert!(!effect.is_active());
}

/// Test that writing a key nobody read schedules nothing.
#[test]
fn unread_key_triggers_nothing() {
    let runtime = Runtime::new();
    let state = runtime.reactive(runtime.object([("read", 1), ("unread", 1)]));
    let (calls, bump) = counter();

    let reader = state.clone();
    runtime.effect_with(
        move || {
            reader.get("read");
        },
        EffectOptions::default().scheduler(move |_| bump()),
    );

    runtime
        .with_mutation_allowed(|| state.set("unread", 2))
        .unwrap();
    assert_eq!(calls.get(), 0);
}

/// Test that two writes in one reducer lead to exactly one recomputation.
#[test]
fn computed_recomputes_once_per_batch_of_writes() {
    let runtime = Runtime::new();
    let x = runtime.reactive(runtime.object([("foo", 1)]));
    let recomputes = Rc::new(Cell::new(0));

    let (reader, count) = (x.clone(), recomputes.clone());
    let c = runtime.computed(move || {
        count.set(count.get() + 1);
        number(&reader, "foo") + 1.0
    });
    assert_eq!(c.get(), 2.0);

    runtime
        .with_mutation_allowed(|| -> nostate_core::Result<()> {
            x.set("foo", number(&x, "foo") + 1.0)?;
            x.set("foo", number(&x, "foo") + 1.0)?;
            Ok(())
        })
        .unwrap();

    assert_eq!(c.get(), 4.0);
    assert_eq!(recomputes.get(), 2);
}

/// Test the observer lifecycle: read-only outside a reducer, notified once
/// by a shared write inside one.
#[test]
fn observer_sees_shared_writes() {
    let runtime = Runtime::new();
    let obj = runtime.object([("foo", 1)]);
    let (calls, cb) = counter();
    let view = runtime.observe(obj, cb);

    assert_eq!(view.value().get("foo"), Value::from(1));
    assert_eq!(
        view.value().set("foo", 2),
        Err(Error::MutationOutsideReducer {
            op: MutationOp::Set,
            key: "foo".into()
        })
    );

    runtime
        .with_mutation_allowed(|| runtime.reactive(obj).set("foo", 2))
        .unwrap();
    assert_eq!(calls.get(), 1);
    assert_eq!(view.value().get("foo"), Value::from(2));
}

/// Test that stopping one observer leaves another one working.
#[test]
fn observers_have_independent_lifecycles() {
    let runtime = Runtime::new();
    let obj = runtime.object([("foo", 1)]);
    let (calls_a, cb_a) = counter();
    let (calls_b, cb_b) = counter();

    let a = runtime.observe(obj, cb_a);
    let b = runtime.observe(obj, cb_b);
    a.value().get("foo");
    b.value().get("foo");

    runtime.stop(a.effect());
    runtime
        .with_mutation_allowed(|| runtime.reactive(obj).set("foo", 2))
        .unwrap();
    assert_eq!(calls_a.get(), 0);
    assert_eq!(calls_b.get(), 1);

    runtime
        .with_mutation_allowed(|| runtime.reactive(obj).set("foo", 3))
        .unwrap();
    assert_eq!(calls_b.get(), 2);
}

/// Test that a new map entry notifies key readers and size readers once
/// each, and that rewriting the same value notifies nobody.
#[test]
fn map_set_notifies_key_and_structure_once() {
    let runtime = Runtime::new();
    let map = runtime.reactive(runtime.map::<Value, Value>([]));
    let (key_calls, key_cb) = counter();
    let (size_calls, size_cb) = counter();

    let reader = map.clone();
    runtime.effect_with(
        move || {
            reader.get("k");
        },
        EffectOptions::default().scheduler(move |_| key_cb()),
    );
    let reader = map.clone();
    runtime.effect_with(
        move || {
            reader.len();
        },
        EffectOptions::default().scheduler(move |_| size_cb()),
    );

    runtime.with_mutation_allowed(|| map.set("k", "v")).unwrap();
    assert_eq!(key_calls.get(), 1);
    assert_eq!(size_calls.get(), 1);

    runtime.with_mutation_allowed(|| map.set("k", "v")).unwrap();
    assert_eq!(key_calls.get(), 1);
    assert_eq!(size_calls.get(), 1);
}

/// Test that arrays and collections use different structural sentinels.
#[test]
fn arrays_and_collections_track_structure_separately() {
    let runtime = Runtime::new();
    let list = runtime.reactive(runtime.array([1, 2]));
    let set = runtime.reactive(runtime.set([1, 2]));
    let (list_calls, list_cb) = counter();
    let (set_calls, set_cb) = counter();

    let reader = list.clone();
    runtime.effect(move || {
        list_cb();
        reader.len();
    });
    let reader = set.clone();
    runtime.effect(move || {
        set_cb();
        for _ in reader.values() {}
    });

    runtime.with_mutation_allowed(|| list.push(3)).unwrap();
    assert_eq!(list_calls.get(), 2);
    assert_eq!(set_calls.get(), 1);

    runtime.with_mutation_allowed(|| set.add(3)).unwrap();
    assert_eq!(list_calls.get(), 2);
    assert_eq!(set_calls.get(), 2);
}

/// Test every write path against a closed lock.
#[test]
fn every_write_needs_a_reducer() {
    let runtime = Runtime::new();
    let object = runtime.reactive(runtime.object([("foo", 1)]));
    let list = runtime.reactive(runtime.array([1]));
    let map = runtime.reactive(runtime.map([("k", 1)]));
    let set = runtime.reactive(runtime.set([1]));

    let outside = |result: Result<(), Error>| {
        matches!(result, Err(Error::MutationOutsideReducer { .. }))
    };
    assert!(outside(object.set("foo", 2)));
    assert!(outside(object.delete("foo").map(drop)));
    assert!(outside(list.push(2).map(drop)));
    assert!(outside(list.pop().map(drop)));
    assert!(outside(map.set("k", 2)));
    assert!(outside(map.clear()));
    assert!(outside(set.add(2).map(drop)));

    // nothing was written
    assert_eq!(object.get("foo"), Value::from(1));
    assert_eq!(list.len(), 1);
    assert_eq!(map.len(), 1);
    assert_eq!(set.len(), 1);
}

/// Test that a reducer closes the lock again even when it fails.
#[test]
fn reducer_errors_close_the_lock() {
    let runtime = Runtime::new();
    let set = runtime.reactive(runtime.set::<i32>([]));

    let add = runtime.reducer(|value: i32| set.add(value));
    assert_eq!(add(1), Ok(true));
    assert_eq!(add(1), Ok(false));
    assert!(!runtime.is_mutation_allowed());

    let weak = runtime.reactive(runtime.weak_set());
    let result = runtime.with_mutation_allowed(|| weak.add("not a target"));
    assert!(matches!(result, Err(Error::InvalidWeakKey { .. })));
    assert!(!runtime.is_mutation_allowed());
}

/// Test that an effect switching branches only keeps the branch it read last.
#[test]
fn dependencies_follow_the_latest_branch() {
    let runtime = Runtime::new();
    let state = runtime.reactive(runtime.object([
        ("show", Value::from(true)),
        ("name", Value::from("a")),
    ]));
    let seen = Rc::new(RefCell::new(Vec::new()));

    let (reader, log) = (state.clone(), seen.clone());
    runtime.effect(move || {
        let text = if reader.get("show").as_bool() == Some(true) {
            reader.get("name").to_string()
        } else {
            "hidden".to_string()
        };
        log.borrow_mut().push(text);
    });

    runtime
        .with_mutation_allowed(|| state.set("show", false))
        .unwrap();
    runtime
        .with_mutation_allowed(|| state.set("name", "b"))
        .unwrap();

    assert_eq!(*seen.borrow(), vec!["a", "hidden"]);
}

/// Test that an outer effect depending only on a computed value re-runs
/// when the computed's sources change.
#[test]
fn computed_dependencies_reach_outer_effects() {
    let runtime = Runtime::new();
    let todos = runtime.reactive(runtime.array::<Value>([]));

    let reader = todos.clone();
    let remaining = runtime.computed(move || {
        reader
            .values()
            .filter(|todo| {
                todo.as_reactive()
                    .map_or(false, |todo| todo.get("done").as_bool() != Some(true))
            })
            .count()
    });

    let seen = Rc::new(RefCell::new(Vec::new()));
    let (reader, log) = (remaining.clone(), seen.clone());
    runtime.effect(move || log.borrow_mut().push(reader.get()));

    let first = runtime.object([("done", false)]);
    runtime.with_mutation_allowed(|| todos.push(first)).unwrap();
    runtime
        .with_mutation_allowed(|| runtime.reactive(first).set("done", true))
        .unwrap();

    assert_eq!(*seen.borrow(), vec![0, 1, 0]);
}

/// Test that readers iterating values hear about in-place element and
/// field replacement, not only about added or removed keys.
#[test]
fn value_iteration_sees_replaced_elements() {
    let runtime = Runtime::new();
    let list = runtime.reactive(runtime.array([1, 2]));
    let prices = runtime.reactive(runtime.object([("tea", 3), ("cake", 4)]));

    let reader = list.clone();
    let list_sum = runtime.computed(move || {
        reader.values().filter_map(|value| value.as_f64()).sum::<f64>()
    });

    let seen = Rc::new(RefCell::new(Vec::new()));
    let (reader, log) = (prices.clone(), seen.clone());
    runtime.effect(move || {
        let mut total = 0.0;
        reader.for_each(|value, _| total += value.as_f64().unwrap_or(0.0));
        log.borrow_mut().push(total);
    });

    assert_eq!(list_sum.get(), 3.0);
    runtime.with_mutation_allowed(|| list.set(1, 20)).unwrap();
    assert_eq!(list_sum.get(), 21.0);

    runtime
        .with_mutation_allowed(|| prices.set("cake", 5))
        .unwrap();
    assert_eq!(*seen.borrow(), vec![7.0, 8.0]);
}

/// Test the computed-aware observer against a shared computed.
#[test]
fn computed_observer_is_notified() {
    let runtime = Runtime::new();
    let state = runtime.reactive(runtime.object([("count", 1)]));
    let reader = state.clone();
    let doubled = runtime.computed(move || number(&reader, "count") * 2.0);

    let (calls, cb) = counter();
    let view = runtime.observe_computed(&doubled, cb);
    assert_eq!(view.value(), 2.0);

    runtime
        .with_mutation_allowed(|| state.set("count", 4))
        .unwrap();
    assert_eq!(calls.get(), 1);
    assert_eq!(view.value(), 8.0);

    view.stop();
    runtime
        .with_mutation_allowed(|| state.set("count", 5))
        .unwrap();
    assert_eq!(calls.get(), 1);
    assert_eq!(doubled.get(), 10.0);
}

/// Test that independent runtimes never see each other's effects.
#[test]
fn runtimes_are_isolated() {
    let first = Runtime::with_config(RuntimeConfig::named("first"));
    let second = Runtime::with_config(RuntimeConfig {
        name: "second".into(),
        start_unlocked: true,
    });
    let state = first.reactive(first.object([("foo", 1)]));

    let (calls, bump) = counter();
    let reader = state.clone();
    second.effect(move || {
        bump();
        reader.get("foo");
    });
    assert!(second.is_mutation_allowed());
    assert!(!first.is_mutation_allowed());

    first
        .with_mutation_allowed(|| state.set("foo", 2))
        .unwrap();
    assert_eq!(calls.get(), 1);
    assert_eq!(second.active_effect(), None);
}

/// Test that raw mutation bypasses the engine entirely.
#[test]
fn raw_mutation_is_invisible() {
    let runtime = Runtime::new();
    let target = runtime.object([("foo", 1)]);
    let state = runtime.reactive(target);
    let (calls, bump) = counter();

    let reader = state.clone();
    runtime.effect(move || {
        bump();
        reader.get("foo");
    });

    runtime.with_raw_mut(target, |raw| {
        if let nostate_core::RawTarget::Object(fields) = raw {
            fields.insert("foo".into(), Value::from(2));
        }
    });
    assert_eq!(calls.get(), 1);
    assert_eq!(state.get("foo"), Value::from(2));
}
