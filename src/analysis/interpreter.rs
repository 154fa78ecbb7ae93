//! Worklist fixed-point interpreter.
//!
//! Propagates abstract frames along the decoded successor relation until
//! nothing changes. Frames live in a plain `Vec` keyed by instruction index;
//! an instruction is re-enqueued whenever its merged incoming frame moves.
//! Termination: each word can only go from `Constant` to `NonConstant`,
//! never back.

use std::collections::VecDeque;
use std::fmt;

use super::frame::{AbstractFrame, FrameError};
use super::value::AbstractValue;
use crate::bytecode::{InsnKind, MethodCode};

/// Analysis failure for one method. The method is skipped, never fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisError {
    /// Bytecode offset of the instruction being simulated or joined.
    pub offset: usize,
    pub source: FrameError,
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at offset {}", self.source, self.offset)
    }
}

impl std::error::Error for AnalysisError {}

/// Stable incoming frames, one per reachable instruction.
#[derive(Debug)]
pub struct MethodFrames {
    frames: Vec<Option<AbstractFrame>>,
}

impl MethodFrames {
    /// The merged frame on entry to instruction `index`, i.e. the state of
    /// the stack and locals just before it executes. `None` when the
    /// instruction is unreachable.
    pub fn incoming(&self, index: usize) -> Option<&AbstractFrame> {
        self.frames.get(index).and_then(|f| f.as_ref())
    }
}

/// Run the fixed point over one decoded method.
pub fn analyze(code: &MethodCode) -> Result<MethodFrames, AnalysisError> {
    let count = code.insns.len();
    let mut frames: Vec<Option<AbstractFrame>> = vec![None; count];
    if count == 0 {
        return Ok(MethodFrames { frames });
    }

    frames[0] = Some(AbstractFrame::entry(code.max_locals));
    let mut queued = vec![false; count];
    let mut worklist = VecDeque::new();
    worklist.push_back(0);
    queued[0] = true;

    while let Some(index) = worklist.pop_front() {
        queued[index] = false;
        let insn = &code.insns[index];
        // Present by construction: an index is only enqueued after its
        // frame is seeded.
        let incoming = match frames[index].clone() {
            Some(frame) => frame,
            None => continue,
        };

        if !insn.successors.is_empty() {
            let mut outgoing = incoming.clone();
            step(&insn.kind, &mut outgoing).map_err(|source| AnalysisError {
                offset: insn.offset,
                source,
            })?;
            for &succ in &insn.successors {
                propagate(
                    &mut frames,
                    &mut worklist,
                    &mut queued,
                    succ,
                    &outgoing,
                    code.insns[succ].offset,
                )?;
            }
        }

        // A throw anywhere in a protected range can reach the handler with
        // the pre-instruction locals and an emptied stack.
        for edge in &code.handlers {
            if edge.start <= index && index < edge.end {
                let handler_frame = incoming.handler_entry();
                propagate(
                    &mut frames,
                    &mut worklist,
                    &mut queued,
                    edge.handler,
                    &handler_frame,
                    code.insns[edge.handler].offset,
                )?;
            }
        }
    }

    Ok(MethodFrames { frames })
}

fn propagate(
    frames: &mut [Option<AbstractFrame>],
    worklist: &mut VecDeque<usize>,
    queued: &mut [bool],
    target: usize,
    frame: &AbstractFrame,
    target_offset: usize,
) -> Result<(), AnalysisError> {
    let changed = match &mut frames[target] {
        Some(existing) => existing.merge_from(frame).map_err(|source| AnalysisError {
            offset: target_offset,
            source,
        })?,
        slot @ None => {
            *slot = Some(frame.clone());
            true
        }
    };
    if changed && !queued[target] {
        worklist.push_back(target);
        queued[target] = true;
    }
    Ok(())
}

/// Transfer function: simulate one instruction's stack and local effect.
fn step(kind: &InsnKind, frame: &mut AbstractFrame) -> Result<(), FrameError> {
    match kind {
        InsnKind::PushString(s) => {
            frame.push(AbstractValue::constant(s.clone()));
            Ok(())
        }
        InsnKind::Push { words } => {
            frame.push_unknown(*words);
            Ok(())
        }
        InsnKind::Load { slot, words } => frame.load(*slot, *words),
        InsnKind::Store { slot, words } => frame.store(*slot, *words),
        InsnKind::Iinc { slot } => frame.set_local(*slot, AbstractValue::NonConstant),
        InsnKind::Stack(op) => frame.apply_stack_op(*op),
        InsnKind::Invoke(invoke) => {
            let receiver = usize::from(invoke.has_receiver);
            frame.pop_words(invoke.arg_words + receiver)?;
            frame.push_unknown(invoke.ret_words);
            Ok(())
        }
        InsnKind::Simple { pop, push } => {
            frame.pop_words(*pop)?;
            frame.push_unknown(*push);
            Ok(())
        }
    }
}
