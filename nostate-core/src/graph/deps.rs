//! Dependency Graph
//!
//! Two-level mapping from raw target to dependency key to the set of
//! subscribed effects, plus the reverse edge list of every effect.
//!
//! Invariant: if effect `E` is in the dependency set of `(T, K)`, then
//! `(T, K)` is in `E`'s edge list. Both sides are always updated together,
//! which is what lets [`DependencyGraph::cleanup`] unsubscribe an effect in
//! O(|deps|) without scanning every target.

use std::collections::HashMap;

use indexmap::IndexSet;
use smallvec::SmallVec;

use super::key::{DepKey, TriggerOp};
use super::node::EffectId;
use crate::value::TargetId;

/// Effects subscribed to one `(target, key)` pair, in subscription order.
pub type Dep = IndexSet<EffectId>;

type Edge = (TargetId, DepKey);

/// The process-wide (per runtime) dependency graph.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    /// Forward edges: target -> key -> subscribers.
    targets: HashMap<TargetId, HashMap<DepKey, Dep>>,

    /// Reverse edges: effect -> the dependency sets it is listed in.
    edges: HashMap<EffectId, SmallVec<[Edge; 4]>>,
}

impl DependencyGraph {
    /// Create a new empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `effect` depends on `key` of `target`.
    ///
    /// Returns `false` when the edge already existed.
    pub fn track(&mut self, target: TargetId, key: DepKey, effect: EffectId) -> bool {
        let dep = self
            .targets
            .entry(target)
            .or_default()
            .entry(key.clone())
            .or_default();

        if !dep.insert(effect) {
            return false;
        }
        self.edges.entry(effect).or_default().push((target, key));
        true
    }

    /// Remove `effect` from every dependency set it is listed in.
    ///
    /// Sets left empty are dropped, and so is a target with no keys left.
    /// Returns the number of edges removed.
    pub fn cleanup(&mut self, effect: EffectId) -> usize {
        let Some(edges) = self.edges.remove(&effect) else {
            return 0;
        };

        for (target, key) in &edges {
            let Some(keys) = self.targets.get_mut(target) else {
                continue;
            };
            if let Some(dep) = keys.get_mut(key) {
                // shift, not swap: keep subscription order of the others
                dep.shift_remove(&effect);
                if dep.is_empty() {
                    keys.remove(key);
                }
            }
            if keys.is_empty() {
                self.targets.remove(target);
            }
        }
        edges.len()
    }

    /// Subscribe `into` to every dependency set `from` is listed in.
    ///
    /// Returns the number of new edges.
    pub fn promote(&mut self, from: EffectId, into: EffectId) -> usize {
        if from == into {
            return 0;
        }
        let edges: Vec<Edge> = match self.edges.get(&from) {
            Some(edges) => edges.to_vec(),
            None => return 0,
        };

        edges
            .into_iter()
            .filter(|(target, key)| self.track(*target, key.clone(), into))
            .count()
    }

    /// Resolve the effects a change to `target` must notify.
    ///
    /// - `Set`/`Add`/`Delete` notify the subscribers of `key`.
    /// - `Add`/`Delete` additionally notify the subscribers of `structural`.
    /// - `Clear` notifies every subscriber of every key.
    ///
    /// Each effect appears once, in first-subscription order. A target that
    /// was never tracked resolves to nothing.
    pub fn subscribers(
        &self,
        target: TargetId,
        op: TriggerOp,
        key: Option<&DepKey>,
        structural: &DepKey,
    ) -> Dep {
        let mut resolved = Dep::new();
        let Some(keys) = self.targets.get(&target) else {
            return resolved;
        };

        if op == TriggerOp::Clear {
            for dep in keys.values() {
                resolved.extend(dep.iter().copied());
            }
            return resolved;
        }

        if let Some(dep) = key.and_then(|key| keys.get(key)) {
            resolved.extend(dep.iter().copied());
        }
        if op.is_structural() {
            if let Some(dep) = keys.get(structural) {
                resolved.extend(dep.iter().copied());
            }
        }
        resolved
    }

    /// Whether any effect currently depends on `target`.
    pub fn is_tracked(&self, target: TargetId) -> bool {
        self.targets.contains_key(&target)
    }

    /// Number of dependency sets `effect` is listed in.
    pub fn dependency_count(&self, effect: EffectId) -> usize {
        self.edges.get(&effect).map_or(0, |edges| edges.len())
    }

    /// Number of effects subscribed to `key` of `target`.
    pub fn subscriber_count(&self, target: TargetId, key: &DepKey) -> usize {
        self.targets
            .get(&target)
            .and_then(|keys| keys.get(key))
            .map_or(0, |dep| dep.len())
    }

    /// Forget `target` entirely, including the edges that point at it.
    pub fn remove_target(&mut self, target: TargetId) {
        let Some(keys) = self.targets.remove(&target) else {
            return;
        };

        for effect in keys.values().flat_map(|dep| dep.iter()) {
            if let Some(edges) = self.edges.get_mut(effect) {
                edges.retain(|(t, _)| *t != target);
            }
        }
        self.edges.retain(|_, edges| !edges.is_empty());
    }

    /// Drop every edge.
    pub fn clear(&mut self) {
        self.targets.clear();
        self.edges.clear();
    }
}
