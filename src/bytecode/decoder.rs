//! Instruction stream decoder.
//!
//! Turns a method's raw code bytes into typed instructions plus the
//! successor relation the dataflow analyzer walks. Successors are plain
//! instruction indices; exception handler ranges become index ranges with a
//! handler entry index. A method the decoder cannot make sense of is
//! reported as a [`DecodeError`] and skipped by the caller, never fatal.

use std::collections::BTreeSet;
use std::fmt;

use super::class_file::MethodBody;
use super::descriptor::{self, DescriptorError};
use super::opcodes as op;
use super::pool::{ConstantPool, LoadedConstant, MethodRef, PoolError};

/// Untyped stack shuffling operations, replayed exactly on abstract values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackOp {
    Pop,
    Pop2,
    Dup,
    DupX1,
    DupX2,
    Dup2,
    Dup2X1,
    Dup2X2,
    Swap,
}

/// A decoded invocation with precomputed stack arithmetic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvokeInsn {
    pub target: MethodRef,
    /// False for `invokestatic`/`invokedynamic`.
    pub has_receiver: bool,
    /// Total word count of the declared arguments.
    pub arg_words: usize,
    /// Word count of the return value (0 for void).
    pub ret_words: usize,
}

/// One decoded operation. Anything that cannot produce or move a string
/// constant collapses to `Simple { pop, push }` word counts.
#[derive(Debug, Clone, PartialEq)]
pub enum InsnKind {
    /// `ldc` of a string constant.
    PushString(String),
    /// Any other constant push.
    Push { words: usize },
    Load { slot: usize, words: usize },
    Store { slot: usize, words: usize },
    /// `iinc`: no stack effect, clobbers one local slot.
    Iinc { slot: usize },
    Stack(StackOp),
    Invoke(InvokeInsn),
    Simple { pop: usize, push: usize },
}

/// A decoded instruction with its normal-flow successors.
#[derive(Debug, Clone, PartialEq)]
pub struct Insn {
    /// Bytecode offset, kept for diagnostics.
    pub offset: usize,
    pub kind: InsnKind,
    /// Instruction indices reached on normal (non-exceptional) flow.
    /// Empty for returns and `athrow`.
    pub successors: Vec<usize>,
}

/// Exception edge source range (instruction indices, end exclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandlerEdge {
    pub start: usize,
    pub end: usize,
    pub handler: usize,
}

/// Fully decoded method ready for analysis.
#[derive(Debug, Clone)]
pub struct MethodCode {
    pub insns: Vec<Insn>,
    pub handlers: Vec<HandlerEdge>,
    pub max_locals: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DecodeError {
    Truncated { offset: usize },
    UnknownOpcode { opcode: u8, offset: usize },
    BadTarget { offset: usize, target: i64 },
    FallsOffEnd { offset: usize },
    Unsupported { offset: usize, mnemonic: &'static str },
    Pool(PoolError),
    Descriptor(DescriptorError),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Truncated { offset } => {
                write!(f, "code truncated inside instruction at offset {}", offset)
            }
            DecodeError::UnknownOpcode { opcode, offset } => {
                write!(f, "unknown opcode 0x{:02x} at offset {}", opcode, offset)
            }
            DecodeError::BadTarget { offset, target } => write!(
                f,
                "branch at offset {} targets {} which is not an instruction boundary",
                offset, target
            ),
            DecodeError::FallsOffEnd { offset } => {
                write!(f, "instruction at offset {} falls off the end of code", offset)
            }
            DecodeError::Unsupported { offset, mnemonic } => {
                write!(f, "unsupported instruction {} at offset {}", mnemonic, offset)
            }
            DecodeError::Pool(e) => e.fmt(f),
            DecodeError::Descriptor(e) => e.fmt(f),
        }
    }
}

impl std::error::Error for DecodeError {}

impl From<PoolError> for DecodeError {
    fn from(e: PoolError) -> Self {
        DecodeError::Pool(e)
    }
}

impl From<DescriptorError> for DecodeError {
    fn from(e: DescriptorError) -> Self {
        DecodeError::Descriptor(e)
    }
}

/// How one instruction transfers control, in raw bytecode offsets.
#[derive(Debug, Clone, PartialEq)]
enum Flow {
    Next,
    Jump(i64),
    CondJump(i64),
    Switch(Vec<i64>),
    End,
}

struct CodeReader<'a> {
    code: &'a [u8],
    pos: usize,
}

impl<'a> CodeReader<'a> {
    fn truncated(&self, start: usize) -> DecodeError {
        DecodeError::Truncated { offset: start }
    }

    fn u8(&mut self, start: usize) -> Result<u8, DecodeError> {
        let b = *self.code.get(self.pos).ok_or_else(|| self.truncated(start))?;
        self.pos += 1;
        Ok(b)
    }

    fn u16(&mut self, start: usize) -> Result<u16, DecodeError> {
        Ok(u16::from_be_bytes([self.u8(start)?, self.u8(start)?]))
    }

    fn i16(&mut self, start: usize) -> Result<i16, DecodeError> {
        Ok(self.u16(start)? as i16)
    }

    fn i32(&mut self, start: usize) -> Result<i32, DecodeError> {
        Ok(i32::from_be_bytes([
            self.u8(start)?,
            self.u8(start)?,
            self.u8(start)?,
            self.u8(start)?,
        ]))
    }

    fn skip(&mut self, n: usize, start: usize) -> Result<(), DecodeError> {
        if self.pos + n > self.code.len() {
            return Err(self.truncated(start));
        }
        self.pos += n;
        Ok(())
    }

    /// Switch payloads are aligned to 4 bytes from the start of the code.
    fn align4(&mut self, start: usize) -> Result<(), DecodeError> {
        let pad = (4 - self.pos % 4) % 4;
        self.skip(pad, start)
    }
}

/// Decode a method body against its class's constant pool.
pub fn decode(body: &MethodBody, pool: &ConstantPool) -> Result<MethodCode, DecodeError> {
    let mut reader = CodeReader {
        code: &body.code,
        pos: 0,
    };

    // First pass: one (kind, flow) per instruction, offsets recorded.
    let mut kinds: Vec<(usize, InsnKind, Flow)> = Vec::new();
    // Map from bytecode offset to instruction index.
    let mut index_at = vec![usize::MAX; body.code.len() + 1];

    while reader.pos < body.code.len() {
        let offset = reader.pos;
        index_at[offset] = kinds.len();
        let (kind, flow) = decode_one(&mut reader, offset, pool)?;
        kinds.push((offset, kind, flow));
    }

    let resolve = |from: usize, target: i64| -> Result<usize, DecodeError> {
        let bad = DecodeError::BadTarget {
            offset: from,
            target,
        };
        let target = usize::try_from(target).map_err(|_| bad.clone())?;
        match index_at.get(target) {
            Some(&idx) if idx != usize::MAX => Ok(idx),
            _ => Err(bad),
        }
    };

    // Second pass: offsets to indices.
    let count = kinds.len();
    let mut insns = Vec::with_capacity(count);
    for (i, (offset, kind, flow)) in kinds.into_iter().enumerate() {
        let next = || -> Result<usize, DecodeError> {
            if i + 1 < count {
                Ok(i + 1)
            } else {
                Err(DecodeError::FallsOffEnd { offset })
            }
        };
        let successors = match flow {
            Flow::Next => vec![next()?],
            Flow::Jump(t) => vec![resolve(offset, t)?],
            Flow::CondJump(t) => vec![resolve(offset, t)?, next()?],
            Flow::Switch(targets) => {
                let mut set = BTreeSet::new();
                for t in targets {
                    set.insert(resolve(offset, t)?);
                }
                set.into_iter().collect()
            }
            Flow::End => Vec::new(),
        };
        insns.push(Insn {
            offset,
            kind,
            successors,
        });
    }

    let mut handlers = Vec::with_capacity(body.exception_table.len());
    for range in &body.exception_table {
        let start = resolve(range.start_pc as usize, range.start_pc as i64)?;
        // end_pc is exclusive and may equal the code length.
        let end = if range.end_pc as usize == body.code.len() {
            insns.len()
        } else {
            resolve(range.end_pc as usize, range.end_pc as i64)?
        };
        let handler = resolve(range.handler_pc as usize, range.handler_pc as i64)?;
        handlers.push(HandlerEdge {
            start,
            end,
            handler,
        });
    }

    Ok(MethodCode {
        insns,
        handlers,
        max_locals: body.max_locals as usize,
    })
}

fn decode_one(
    r: &mut CodeReader<'_>,
    at: usize,
    pool: &ConstantPool,
) -> Result<(InsnKind, Flow), DecodeError> {
    let opcode = r.u8(at)?;
    let simple = |pop: usize, push: usize| (InsnKind::Simple { pop, push }, Flow::Next);

    let insn = match opcode {
        op::NOP => simple(0, 0),
        op::ACONST_NULL | op::ICONST_M1..=op::ICONST_5 | op::FCONST_0..=op::FCONST_2 => {
            (InsnKind::Push { words: 1 }, Flow::Next)
        }
        op::LCONST_0 | op::LCONST_1 | op::DCONST_0 | op::DCONST_1 => {
            (InsnKind::Push { words: 2 }, Flow::Next)
        }
        op::BIPUSH => {
            r.skip(1, at)?;
            (InsnKind::Push { words: 1 }, Flow::Next)
        }
        op::SIPUSH => {
            r.skip(2, at)?;
            (InsnKind::Push { words: 1 }, Flow::Next)
        }
        op::LDC | op::LDC_W | op::LDC2_W => {
            let index = if opcode == op::LDC {
                r.u8(at)? as u16
            } else {
                r.u16(at)?
            };
            match pool.loadable_constant(index)? {
                LoadedConstant::Str(s) => (InsnKind::PushString(s), Flow::Next),
                LoadedConstant::OneWord => (InsnKind::Push { words: 1 }, Flow::Next),
                LoadedConstant::TwoWord => (InsnKind::Push { words: 2 }, Flow::Next),
            }
        }
        op::ILOAD | op::FLOAD | op::ALOAD => {
            let slot = r.u8(at)? as usize;
            (InsnKind::Load { slot, words: 1 }, Flow::Next)
        }
        op::LLOAD | op::DLOAD => {
            let slot = r.u8(at)? as usize;
            (InsnKind::Load { slot, words: 2 }, Flow::Next)
        }
        op::ILOAD_0..=op::ALOAD_3 => {
            let rel = (opcode - op::ILOAD_0) as usize;
            let words = if rel / 4 == 1 || rel / 4 == 3 { 2 } else { 1 };
            (
                InsnKind::Load {
                    slot: rel % 4,
                    words,
                },
                Flow::Next,
            )
        }
        op::IALOAD..=op::SALOAD => {
            // laload/daload produce a two-word value.
            let push = if opcode == 0x2f || opcode == 0x31 { 2 } else { 1 };
            simple(2, push)
        }
        op::ISTORE | op::FSTORE | op::ASTORE => {
            let slot = r.u8(at)? as usize;
            (InsnKind::Store { slot, words: 1 }, Flow::Next)
        }
        op::LSTORE | op::DSTORE => {
            let slot = r.u8(at)? as usize;
            (InsnKind::Store { slot, words: 2 }, Flow::Next)
        }
        op::ISTORE_0..=op::ASTORE_3 => {
            let rel = (opcode - op::ISTORE_0) as usize;
            let words = if rel / 4 == 1 || rel / 4 == 3 { 2 } else { 1 };
            (
                InsnKind::Store {
                    slot: rel % 4,
                    words,
                },
                Flow::Next,
            )
        }
        op::IASTORE..=op::SASTORE => {
            // lastore/dastore consume a two-word value.
            let pop = if opcode == 0x50 || opcode == 0x52 { 4 } else { 3 };
            simple(pop, 0)
        }
        op::POP => (InsnKind::Stack(StackOp::Pop), Flow::Next),
        op::POP2 => (InsnKind::Stack(StackOp::Pop2), Flow::Next),
        op::DUP => (InsnKind::Stack(StackOp::Dup), Flow::Next),
        op::DUP_X1 => (InsnKind::Stack(StackOp::DupX1), Flow::Next),
        op::DUP_X2 => (InsnKind::Stack(StackOp::DupX2), Flow::Next),
        op::DUP2 => (InsnKind::Stack(StackOp::Dup2), Flow::Next),
        op::DUP2_X1 => (InsnKind::Stack(StackOp::Dup2X1), Flow::Next),
        op::DUP2_X2 => (InsnKind::Stack(StackOp::Dup2X2), Flow::Next),
        op::SWAP => (InsnKind::Stack(StackOp::Swap), Flow::Next),
        op::IADD..=op::LXOR => {
            let (pop, push) = arithmetic_effect(opcode);
            simple(pop, push)
        }
        op::IINC => {
            let slot = r.u8(at)? as usize;
            r.skip(1, at)?;
            (InsnKind::Iinc { slot }, Flow::Next)
        }
        op::I2L..=op::I2S => {
            let (pop, push) = conversion_effect(opcode);
            simple(pop, push)
        }
        op::LCMP => simple(4, 1),
        0x95 | 0x96 => simple(2, 1), // fcmpl/fcmpg
        0x97 | op::DCMPG => simple(4, 1),
        op::IFEQ..=op::IFLE | op::IFNULL | op::IFNONNULL => {
            let target = at as i64 + r.i16(at)? as i64;
            (InsnKind::Simple { pop: 1, push: 0 }, Flow::CondJump(target))
        }
        op::IF_ICMPEQ..=op::IF_ACMPNE => {
            let target = at as i64 + r.i16(at)? as i64;
            (InsnKind::Simple { pop: 2, push: 0 }, Flow::CondJump(target))
        }
        op::GOTO => {
            let target = at as i64 + r.i16(at)? as i64;
            (InsnKind::Simple { pop: 0, push: 0 }, Flow::Jump(target))
        }
        op::GOTO_W => {
            let target = at as i64 + r.i32(at)? as i64;
            (InsnKind::Simple { pop: 0, push: 0 }, Flow::Jump(target))
        }
        op::JSR | op::JSR_W => {
            return Err(DecodeError::Unsupported {
                offset: at,
                mnemonic: "jsr",
            });
        }
        op::RET => {
            return Err(DecodeError::Unsupported {
                offset: at,
                mnemonic: "ret",
            });
        }
        op::TABLESWITCH => {
            r.align4(at)?;
            let mut targets = vec![at as i64 + r.i32(at)? as i64];
            let low = r.i32(at)? as i64;
            let high = r.i32(at)? as i64;
            if high < low {
                return Err(DecodeError::Truncated { offset: at });
            }
            for _ in low..=high {
                targets.push(at as i64 + r.i32(at)? as i64);
            }
            (InsnKind::Simple { pop: 1, push: 0 }, Flow::Switch(targets))
        }
        op::LOOKUPSWITCH => {
            r.align4(at)?;
            let mut targets = vec![at as i64 + r.i32(at)? as i64];
            let npairs = r.i32(at)?;
            if npairs < 0 {
                return Err(DecodeError::Truncated { offset: at });
            }
            for _ in 0..npairs {
                r.skip(4, at)?; // match value
                targets.push(at as i64 + r.i32(at)? as i64);
            }
            (InsnKind::Simple { pop: 1, push: 0 }, Flow::Switch(targets))
        }
        op::IRETURN..=op::RETURN => (InsnKind::Simple { pop: 0, push: 0 }, Flow::End),
        op::ATHROW => (InsnKind::Simple { pop: 0, push: 0 }, Flow::End),
        op::GETSTATIC | op::PUTSTATIC | op::GETFIELD | op::PUTFIELD => {
            let index = r.u16(at)?;
            let width = descriptor::field_width(pool.field_descriptor(index)?);
            match opcode {
                op::GETSTATIC => simple(0, width),
                op::PUTSTATIC => simple(width, 0),
                op::GETFIELD => simple(1, width),
                _ => simple(1 + width, 0),
            }
        }
        op::INVOKEVIRTUAL | op::INVOKESPECIAL | op::INVOKESTATIC | op::INVOKEINTERFACE => {
            let index = r.u16(at)?;
            if opcode == op::INVOKEINTERFACE {
                r.skip(2, at)?; // count + reserved zero
            }
            let target = pool.method_ref(index)?;
            invoke_insn(target, opcode != op::INVOKESTATIC)?
        }
        op::INVOKEDYNAMIC => {
            let index = r.u16(at)?;
            r.skip(2, at)?; // reserved zeros
            let (name, descriptor) = pool.invoke_dynamic(index)?;
            invoke_insn(
                MethodRef {
                    owner: String::new(),
                    name,
                    descriptor,
                },
                false,
            )?
        }
        op::NEW => {
            r.skip(2, at)?;
            simple(0, 1)
        }
        op::NEWARRAY => {
            r.skip(1, at)?;
            simple(1, 1)
        }
        op::ANEWARRAY | op::CHECKCAST | op::INSTANCEOF => {
            r.skip(2, at)?;
            simple(1, 1)
        }
        op::ARRAYLENGTH => simple(1, 1),
        op::MONITORENTER | op::MONITOREXIT => simple(1, 0),
        op::WIDE => decode_wide(r, at)?,
        op::MULTIANEWARRAY => {
            r.skip(2, at)?;
            let dims = r.u8(at)? as usize;
            simple(dims, 1)
        }
        other => {
            return Err(DecodeError::UnknownOpcode {
                opcode: other,
                offset: at,
            });
        }
    };

    // athrow's operand is handed to the handler edge, not a successor;
    // its pop count is irrelevant because End instructions propagate nothing.
    Ok(insn)
}

fn invoke_insn(target: MethodRef, has_receiver: bool) -> Result<(InsnKind, Flow), DecodeError> {
    let args = descriptor::argument_types(&target.descriptor)?;
    let arg_words = descriptor::argument_words(&args);
    let ret_words = descriptor::return_width(&target.descriptor)?;
    Ok((
        InsnKind::Invoke(InvokeInsn {
            target,
            has_receiver,
            arg_words,
            ret_words,
        }),
        Flow::Next,
    ))
}

fn decode_wide(r: &mut CodeReader<'_>, at: usize) -> Result<(InsnKind, Flow), DecodeError> {
    let inner = r.u8(at)?;
    let slot = r.u16(at)? as usize;
    let insn = match inner {
        op::ILOAD | op::FLOAD | op::ALOAD => InsnKind::Load { slot, words: 1 },
        op::LLOAD | op::DLOAD => InsnKind::Load { slot, words: 2 },
        op::ISTORE | op::FSTORE | op::ASTORE => InsnKind::Store { slot, words: 1 },
        op::LSTORE | op::DSTORE => InsnKind::Store { slot, words: 2 },
        op::IINC => {
            r.skip(2, at)?;
            InsnKind::Iinc { slot }
        }
        op::RET => {
            return Err(DecodeError::Unsupported {
                offset: at,
                mnemonic: "ret",
            });
        }
        other => {
            return Err(DecodeError::UnknownOpcode {
                opcode: other,
                offset: at,
            });
        }
    };
    Ok((insn, Flow::Next))
}

/// Stack effect in words for the 0x60..=0x83 arithmetic block.
fn arithmetic_effect(opcode: u8) -> (usize, usize) {
    match opcode {
        // ineg/fneg
        0x74 | 0x76 => (1, 1),
        // lneg/dneg
        0x75 | 0x77 => (2, 2),
        // ishl/ishr/iushr
        0x78 | 0x7a | 0x7c => (2, 1),
        // lshl/lshr/lushr take a long and an int shift count
        0x79 | 0x7b | 0x7d => (3, 2),
        _ => {
            // Remaining ops are homogeneous binaries in (i, l, f, d) groups
            // of four starting at iadd.
            let rel = (opcode - op::IADD) as usize % 4;
            if rel == 1 || rel == 3 {
                (4, 2)
            } else {
                (2, 1)
            }
        }
    }
}

/// Stack effect in words for the i2l..=i2s conversion block.
fn conversion_effect(opcode: u8) -> (usize, usize) {
    match opcode {
        0x85 | 0x87 => (1, 2),        // i2l, i2d
        0x86 => (1, 1),               // i2f
        0x88 | 0x89 => (2, 1),        // l2i, l2f
        0x8a => (2, 2),               // l2d
        0x8b => (1, 1),               // f2i
        0x8c | 0x8d => (1, 2),        // f2l, f2d
        0x8e | 0x90 => (2, 1),        // d2i, d2f
        0x8f => (2, 2),               // d2l
        _ => (1, 1),                  // i2b, i2c, i2s
    }
}
