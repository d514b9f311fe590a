//! Collection Interception
//!
//! Maps, sets and their weak variants expose their behavior through
//! methods rather than arbitrary properties, so each method is
//! instrumented on its own:
//!
//! - `get` and `has` track the entry for the lookup key.
//! - `len` and iteration track the shared iteration sentinel.
//! - `set`, `add`, `delete` and `clear` follow the same lock and
//!   change-detection rules as property writes.
//!
//! Lookup keys are unwrapped first, so a facade and its raw target address
//! the same entry. Weak variants only hold targets.

use super::handle::Reactive;
use crate::error::{Error, MutationOp, Result};
use crate::graph::{DepKey, TriggerOp};
use crate::value::{RawTarget, TargetKind, Value};

impl Reactive {
    /// Insert `value` into a set. Returns whether it was new.
    pub fn add(&self, value: impl Into<Value>) -> Result<bool> {
        let value = value.into().into_raw();
        self.check_writable(MutationOp::Add, &value)?;

        let kind = self.require_kind()?;
        if !matches!(kind, TargetKind::Set | TargetKind::WeakSet) {
            return Err(Error::UnsupportedOperation {
                op: MutationOp::Add,
                kind,
            });
        }
        check_weak_key(kind, &value)?;

        let added = {
            let mut targets = self.runtime.inner.targets.borrow_mut();
            match targets.get_mut(self.target) {
                Some(RawTarget::Set(members) | RawTarget::WeakSet(members)) => {
                    members.insert(value.clone())
                }
                _ => return Err(Error::UnknownTarget(self.target)),
            }
        };
        if added {
            self.runtime
                .trigger(self.target, TriggerOp::Add, Some(DepKey::Entry(value)));
        }
        Ok(added)
    }

    /// Remove every entry of a collection. Notifies everything that read
    /// any key of it.
    pub fn clear(&self) -> Result<()> {
        self.check_writable(MutationOp::Clear, &"*")?;

        let kind = self.require_kind()?;
        if !kind.is_collection() {
            return Err(Error::UnsupportedOperation {
                op: MutationOp::Clear,
                kind,
            });
        }

        let had_entries = {
            let mut targets = self.runtime.inner.targets.borrow_mut();
            match targets.get_mut(self.target) {
                Some(RawTarget::Map(entries) | RawTarget::WeakMap(entries)) => {
                    let had = !entries.is_empty();
                    entries.clear();
                    had
                }
                Some(RawTarget::Set(members) | RawTarget::WeakSet(members)) => {
                    let had = !members.is_empty();
                    members.clear();
                    had
                }
                _ => return Err(Error::UnknownTarget(self.target)),
            }
        };
        if had_entries {
            self.runtime.trigger(self.target, TriggerOp::Clear, None);
        }
        Ok(())
    }

    pub(crate) fn collection_get(&self, key: &Value) -> Value {
        let value = self
            .runtime
            .with_raw(self.target, |raw| match raw {
                RawTarget::Map(entries) | RawTarget::WeakMap(entries) => {
                    Some(entries.get(key).cloned())
                }
                _ => None,
            })
            .flatten();

        // sets have no values to read
        let Some(value) = value else {
            return Value::Undefined;
        };
        self.track(DepKey::Entry(key.clone()));
        self.wrap(value.unwrap_or_default())
    }

    pub(crate) fn collection_has(&self, key: &Value) -> bool {
        self.track(DepKey::Entry(key.clone()));
        self.runtime
            .with_raw(self.target, |raw| match raw {
                RawTarget::Map(entries) | RawTarget::WeakMap(entries) => entries.contains_key(key),
                RawTarget::Set(members) | RawTarget::WeakSet(members) => members.contains(key),
                _ => false,
            })
            .unwrap_or(false)
    }

    pub(crate) fn collection_set(&self, kind: TargetKind, key: Value, value: Value) -> Result<()> {
        check_weak_key(kind, &key)?;

        let op = {
            let mut targets = self.runtime.inner.targets.borrow_mut();
            let Some(RawTarget::Map(entries) | RawTarget::WeakMap(entries)) =
                targets.get_mut(self.target)
            else {
                return Err(Error::UnknownTarget(self.target));
            };
            match entries.insert(key.clone(), value.clone()) {
                None => Some(TriggerOp::Add),
                Some(old) if old != value => Some(TriggerOp::Set),
                Some(_) => None,
            }
        };
        if let Some(op) = op {
            self.runtime
                .trigger(self.target, op, Some(DepKey::Entry(key)));
        }
        Ok(())
    }

    pub(crate) fn collection_delete(&self, kind: TargetKind, key: &Value) -> Result<bool> {
        // a weak collection can never hold a primitive
        if kind.is_weak() && !key.is_target() {
            return Ok(false);
        }

        let removed = {
            let mut targets = self.runtime.inner.targets.borrow_mut();
            match targets.get_mut(self.target) {
                Some(RawTarget::Map(entries) | RawTarget::WeakMap(entries)) => {
                    entries.shift_remove(key).is_some()
                }
                Some(RawTarget::Set(members) | RawTarget::WeakSet(members)) => {
                    members.shift_remove(key)
                }
                _ => return Err(Error::UnknownTarget(self.target)),
            }
        };
        if removed {
            self.runtime.trigger(
                self.target,
                TriggerOp::Delete,
                Some(DepKey::Entry(key.clone())),
            );
        }
        Ok(removed)
    }
}

fn check_weak_key(kind: TargetKind, key: &Value) -> Result<()> {
    if kind.is_weak() && !key.is_target() {
        return Err(Error::InvalidWeakKey {
            key: key.to_string(),
        });
    }
    Ok(())
}
