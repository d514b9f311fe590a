//! Active Effect Stack
//!
//! The stack tracks which effect is currently running. This is what makes
//! dependency tracking automatic: when a facade reads a key without a bound
//! tracker, the read is recorded against the effect on top of the stack.
//!
//! # Implementation
//!
//! Each runtime owns one stack. Running an effect pushes a [`Frame`]; the
//! frame pops itself when dropped, so the stack stays correct even if the
//! effect panics. Nested effects (a computed read inside an effect) simply
//! stack up, and the top is always the innermost running effect.
//!
//! The stack doubles as the re-entrancy guard: an effect already on it is
//! not started again by a trigger it causes itself.

use std::cell::RefCell;

use smallvec::SmallVec;

use crate::graph::EffectId;

#[derive(Debug, Default)]
pub(crate) struct EffectStack {
    frames: RefCell<SmallVec<[EffectId; 8]>>,
}

/// Guard that pops the stack when dropped.
pub(crate) struct Frame<'a> {
    stack: &'a EffectStack,
    effect: EffectId,
}

impl EffectStack {
    /// Push `effect`; it stays active until the returned frame drops.
    pub(crate) fn enter(&self, effect: EffectId) -> Frame<'_> {
        self.frames.borrow_mut().push(effect);
        Frame {
            stack: self,
            effect,
        }
    }

    /// The innermost running effect, if any.
    pub(crate) fn current(&self) -> Option<EffectId> {
        self.frames.borrow().last().copied()
    }

    /// Whether `effect` is anywhere on the stack.
    pub(crate) fn contains(&self, effect: EffectId) -> bool {
        self.frames.borrow().contains(&effect)
    }

    pub(crate) fn depth(&self) -> usize {
        self.frames.borrow().len()
    }
}

impl Drop for Frame<'_> {
    fn drop(&mut self) {
        let popped = self.stack.frames.borrow_mut().pop();

        // Frames are strictly nested; a mismatch means a frame escaped.
        debug_assert_eq!(
            popped,
            Some(self.effect),
            "effect stack mismatch: expected {:?}, got {:?}",
            self.effect,
            popped
        );
    }
}
