//! Abstract frames: one operand stack plus local slots, both word-indexed.
//!
//! Category-2 values (`long`/`double`) occupy two `NonConstant` words, which
//! makes the untyped `dup2`/`pop2` family plain word operations and keeps
//! join-point shapes structural. String constants are always one word, so
//! the word model costs no precision.

use std::fmt;

use super::value::AbstractValue;
use crate::bytecode::StackOp;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    StackUnderflow,
    LocalOutOfRange { slot: usize },
    ShapeMismatch { left: usize, right: usize },
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameError::StackUnderflow => write!(f, "operand stack underflow"),
            FrameError::LocalOutOfRange { slot } => {
                write!(f, "local slot {} outside max_locals", slot)
            }
            FrameError::ShapeMismatch { left, right } => write!(
                f,
                "operand stack depth mismatch at join ({} vs {})",
                left, right
            ),
        }
    }
}

impl std::error::Error for FrameError {}

/// Abstract state at one program point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbstractFrame {
    locals: Vec<AbstractValue>,
    stack: Vec<AbstractValue>,
}

impl AbstractFrame {
    /// Entry frame: every local starts unknown, stack empty. Parameters are
    /// caller-supplied and therefore never constant here.
    pub fn entry(max_locals: usize) -> Self {
        Self {
            locals: vec![AbstractValue::NonConstant; max_locals],
            stack: Vec::new(),
        }
    }

    pub fn stack_len(&self) -> usize {
        self.stack.len()
    }

    /// Word at `depth` below the stack top (0 is the top).
    pub fn peek(&self, depth: usize) -> Result<&AbstractValue, FrameError> {
        self.stack
            .len()
            .checked_sub(depth + 1)
            .map(|i| &self.stack[i])
            .ok_or(FrameError::StackUnderflow)
    }

    pub fn push(&mut self, value: AbstractValue) {
        self.stack.push(value);
    }

    /// Push `words` unknown words (results of unmodelled operations).
    pub fn push_unknown(&mut self, words: usize) {
        for _ in 0..words {
            self.stack.push(AbstractValue::NonConstant);
        }
    }

    pub fn pop(&mut self) -> Result<AbstractValue, FrameError> {
        self.stack.pop().ok_or(FrameError::StackUnderflow)
    }

    pub fn pop_words(&mut self, words: usize) -> Result<(), FrameError> {
        if self.stack.len() < words {
            return Err(FrameError::StackUnderflow);
        }
        self.stack.truncate(self.stack.len() - words);
        Ok(())
    }

    pub fn local(&self, slot: usize) -> Result<&AbstractValue, FrameError> {
        self.locals
            .get(slot)
            .ok_or(FrameError::LocalOutOfRange { slot })
    }

    pub fn set_local(&mut self, slot: usize, value: AbstractValue) -> Result<(), FrameError> {
        *self
            .locals
            .get_mut(slot)
            .ok_or(FrameError::LocalOutOfRange { slot })? = value;
        Ok(())
    }

    /// Simulate a load: copy `words` local words onto the stack.
    pub fn load(&mut self, slot: usize, words: usize) -> Result<(), FrameError> {
        for w in 0..words {
            let value = self.local(slot + w)?.clone();
            self.stack.push(value);
        }
        Ok(())
    }

    /// Simulate a store: move `words` stack words into locals.
    pub fn store(&mut self, slot: usize, words: usize) -> Result<(), FrameError> {
        if self.stack.len() < words {
            return Err(FrameError::StackUnderflow);
        }
        let split = self.stack.len() - words;
        for w in (0..words).rev() {
            let value = self.stack.pop().unwrap_or(AbstractValue::NonConstant);
            self.set_local(slot + w, value)?;
        }
        debug_assert_eq!(self.stack.len(), split);
        Ok(())
    }

    /// Replay an untyped stack shuffle, preserving abstract values exactly.
    pub fn apply_stack_op(&mut self, op: StackOp) -> Result<(), FrameError> {
        match op {
            StackOp::Pop => self.pop_words(1),
            StackOp::Pop2 => self.pop_words(2),
            StackOp::Dup => {
                let top = self.peek(0)?.clone();
                self.push(top);
                Ok(())
            }
            StackOp::DupX1 => self.dup_under(1, 1),
            StackOp::DupX2 => self.dup_under(1, 2),
            StackOp::Dup2 => {
                let v1 = self.peek(1)?.clone();
                let v2 = self.peek(0)?.clone();
                self.push(v1);
                self.push(v2);
                Ok(())
            }
            StackOp::Dup2X1 => self.dup_under(2, 1),
            StackOp::Dup2X2 => self.dup_under(2, 2),
            StackOp::Swap => {
                let v1 = self.pop()?;
                let v2 = self.pop()?;
                self.push(v1);
                self.push(v2);
                Ok(())
            }
        }
    }

    /// Duplicate the top `count` words beneath the `skip` words below them.
    fn dup_under(&mut self, count: usize, skip: usize) -> Result<(), FrameError> {
        if self.stack.len() < count + skip {
            return Err(FrameError::StackUnderflow);
        }
        let top = self.stack.len();
        let copied: Vec<AbstractValue> = self.stack[top - count..].to_vec();
        let at = top - count - skip;
        for (i, value) in copied.into_iter().enumerate() {
            self.stack.insert(at + i, value);
        }
        Ok(())
    }

    /// Frame for an exception handler entry: same locals, one unknown word
    /// (the thrown reference) as the whole stack.
    pub fn handler_entry(&self) -> Self {
        Self {
            locals: self.locals.clone(),
            stack: vec![AbstractValue::NonConstant],
        }
    }

    /// Position-wise merge of `other` into `self`. Returns whether anything
    /// changed. Stack shapes must match structurally.
    pub fn merge_from(&mut self, other: &AbstractFrame) -> Result<bool, FrameError> {
        if self.stack.len() != other.stack.len() || self.locals.len() != other.locals.len() {
            return Err(FrameError::ShapeMismatch {
                left: self.stack.len(),
                right: other.stack.len(),
            });
        }
        let mut changed = false;
        for (mine, theirs) in self
            .locals
            .iter_mut()
            .chain(self.stack.iter_mut())
            .zip(other.locals.iter().chain(other.stack.iter()))
        {
            let merged = mine.merge(theirs);
            if merged != *mine {
                *mine = merged;
                changed = true;
            }
        }
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::value::AbstractValue::NonConstant;

    fn c(s: &str) -> AbstractValue {
        AbstractValue::constant(s)
    }

    #[test]
    fn test_store_then_load_round_trips_constant() {
        let mut frame = AbstractFrame::entry(4);
        frame.push(c("error.denied"));
        frame.store(2, 1).unwrap();
        assert_eq!(frame.stack_len(), 0);
        frame.load(2, 1).unwrap();
        assert_eq!(frame.peek(0).unwrap(), &c("error.denied"));
    }

    #[test]
    fn test_dup_replicates_without_widening() {
        let mut frame = AbstractFrame::entry(0);
        frame.push(c("x"));
        frame.apply_stack_op(StackOp::Dup).unwrap();
        assert_eq!(frame.peek(0).unwrap(), &c("x"));
        assert_eq!(frame.peek(1).unwrap(), &c("x"));
    }

    #[test]
    fn test_swap_and_dup_x1() {
        let mut frame = AbstractFrame::entry(0);
        frame.push(c("below"));
        frame.push(c("top"));
        frame.apply_stack_op(StackOp::Swap).unwrap();
        assert_eq!(frame.peek(0).unwrap(), &c("below"));
        assert_eq!(frame.peek(1).unwrap(), &c("top"));

        // dup_x1: [top, below] -> [below, top, below]
        frame.apply_stack_op(StackOp::DupX1).unwrap();
        assert_eq!(frame.stack_len(), 3);
        assert_eq!(frame.peek(0).unwrap(), &c("below"));
        assert_eq!(frame.peek(1).unwrap(), &c("top"));
        assert_eq!(frame.peek(2).unwrap(), &c("below"));
    }

    #[test]
    fn test_dup2_x1_word_semantics() {
        let mut frame = AbstractFrame::entry(0);
        frame.push(c("a"));
        frame.push(c("b"));
        frame.push(c("c"));
        // [a, b, c] -> [b, c, a, b, c]
        frame.apply_stack_op(StackOp::Dup2X1).unwrap();
        assert_eq!(frame.stack_len(), 5);
        assert_eq!(frame.peek(0).unwrap(), &c("c"));
        assert_eq!(frame.peek(1).unwrap(), &c("b"));
        assert_eq!(frame.peek(2).unwrap(), &c("a"));
        assert_eq!(frame.peek(3).unwrap(), &c("c"));
        assert_eq!(frame.peek(4).unwrap(), &c("b"));
    }

    #[test]
    fn test_underflow_is_detected() {
        let mut frame = AbstractFrame::entry(0);
        assert_eq!(frame.pop().unwrap_err(), FrameError::StackUnderflow);
        assert_eq!(
            frame.apply_stack_op(StackOp::Dup2).unwrap_err(),
            FrameError::StackUnderflow
        );
    }

    #[test]
    fn test_merge_same_constant_preserves() {
        let mut a = AbstractFrame::entry(1);
        a.push(c("x"));
        let mut b = AbstractFrame::entry(1);
        b.push(c("x"));
        assert!(!a.merge_from(&b).unwrap());
        assert_eq!(a.peek(0).unwrap(), &c("x"));
    }

    #[test]
    fn test_merge_different_constants_widens() {
        let mut a = AbstractFrame::entry(1);
        a.push(c("a"));
        let mut b = AbstractFrame::entry(1);
        b.push(c("b"));
        assert!(a.merge_from(&b).unwrap());
        assert_eq!(a.peek(0).unwrap(), &NonConstant);
    }

    #[test]
    fn test_merge_shape_mismatch_is_error() {
        let mut a = AbstractFrame::entry(1);
        a.push(c("a"));
        let b = AbstractFrame::entry(1);
        assert!(matches!(
            a.merge_from(&b).unwrap_err(),
            FrameError::ShapeMismatch { .. }
        ));
    }

    #[test]
    fn test_handler_entry_keeps_locals_resets_stack() {
        let mut frame = AbstractFrame::entry(2);
        frame.set_local(1, c("key")).unwrap();
        frame.push(c("operand"));
        let handler = frame.handler_entry();
        assert_eq!(handler.stack_len(), 1);
        assert_eq!(handler.peek(0).unwrap(), &NonConstant);
        assert_eq!(handler.local(1).unwrap(), &c("key"));
    }
}
