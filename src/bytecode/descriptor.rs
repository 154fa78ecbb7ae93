//! Method and field descriptor parsing.
//!
//! The analyzer only needs type identity for the String check and the JVM
//! word width of each slot, so descriptors are kept as raw strings.

use std::fmt;

pub const STRING_DESC: &str = "Ljava/lang/String;";

/// One parsed argument of a method descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgType {
    /// Raw field descriptor, e.g. `I`, `[B`, `Ljava/lang/String;`.
    pub descriptor: String,
    /// Operand stack width in words (2 for `J`/`D`, otherwise 1).
    pub words: usize,
}

impl ArgType {
    pub fn is_string(&self) -> bool {
        self.descriptor == STRING_DESC
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorError {
    pub descriptor: String,
}

impl fmt::Display for DescriptorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "malformed method descriptor: {}", self.descriptor)
    }
}

impl std::error::Error for DescriptorError {}

/// Width in words of a field descriptor (`J`/`D` are two, `V` is zero).
pub fn field_width(descriptor: &str) -> usize {
    match descriptor.as_bytes().first() {
        Some(b'J') | Some(b'D') => 2,
        Some(b'V') => 0,
        Some(_) => 1,
        None => 0,
    }
}

/// Parse the argument list of a method descriptor like `(Ljava/lang/String;IJ)V`.
pub fn argument_types(descriptor: &str) -> Result<Vec<ArgType>, DescriptorError> {
    let malformed = || DescriptorError {
        descriptor: descriptor.to_string(),
    };

    let inner = descriptor
        .strip_prefix('(')
        .and_then(|rest| rest.split_once(')'))
        .map(|(args, _)| args)
        .ok_or_else(malformed)?;

    let bytes = inner.as_bytes();
    let mut args = Vec::new();
    let mut pos = 0;
    while pos < bytes.len() {
        let start = pos;
        while pos < bytes.len() && bytes[pos] == b'[' {
            pos += 1;
        }
        match bytes.get(pos) {
            Some(b'L') => {
                let end = inner[pos..].find(';').ok_or_else(malformed)? + pos;
                pos = end + 1;
            }
            Some(b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z') => pos += 1,
            _ => return Err(malformed()),
        }
        let raw = &inner[start..pos];
        // Arrays are reference values, one word regardless of element type.
        let words = if start + 1 == pos {
            field_width(raw)
        } else {
            1
        };
        args.push(ArgType {
            descriptor: raw.to_string(),
            words,
        });
    }
    Ok(args)
}

/// Width in words of the return value of a method descriptor.
pub fn return_width(descriptor: &str) -> Result<usize, DescriptorError> {
    let ret = descriptor
        .split_once(')')
        .map(|(_, ret)| ret)
        .ok_or_else(|| DescriptorError {
            descriptor: descriptor.to_string(),
        })?;
    Ok(field_width(ret))
}

/// Total word count of all arguments.
pub fn argument_words(args: &[ArgType]) -> usize {
    args.iter().map(|a| a.words).sum()
}
