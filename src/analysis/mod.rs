//! Abstract interpretation over decoded bytecode.
//!
//! The domain (`value`), the per-program-point state (`frame`), and the
//! fixed-point engine (`interpreter`). The engine is a pure function of a
//! decoded method: no I/O, no logging, errors returned as data.

pub mod frame;
pub mod interpreter;
pub mod value;

pub use frame::{AbstractFrame, FrameError};
pub use interpreter::{AnalysisError, MethodFrames, analyze};
pub use value::AbstractValue;
