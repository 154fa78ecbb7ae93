//! Minimal class file reader.
//!
//! Parses just enough of the class file format to reach every method's
//! `Code` attribute: the constant pool, the class name, and per-method
//! name/descriptor/code/exception table. Everything else (fields, class
//! attributes, stack map tables) is skipped.

use anyhow::{Context, Result, bail};

use super::pool::{ConstantPool, PoolEntry};

const MAGIC: u32 = 0xCAFE_BABE;

/// One protected range from a method's exception table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExceptionRange {
    pub start_pc: u16,
    pub end_pc: u16,
    pub handler_pc: u16,
}

/// A method body ready for decoding. Methods without code (abstract,
/// native) are not materialized at all.
#[derive(Debug, Clone)]
pub struct MethodBody {
    pub name: String,
    pub descriptor: String,
    pub max_locals: u16,
    pub code: Vec<u8>,
    pub exception_table: Vec<ExceptionRange>,
}

/// Parsed class: owner identity, shared constant pool, method bodies.
#[derive(Debug, Clone)]
pub struct ClassFile {
    /// Internal name, e.g. `app/commands/TeleportCommand`.
    pub name: String,
    pub pool: ConstantPool,
    pub methods: Vec<MethodBody>,
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.bytes.len())
            .context("unexpected end of class file")?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn skip(&mut self, n: usize) -> Result<()> {
        self.take(n).map(|_| ())
    }
}

/// Parse a class file into its pool and method bodies.
pub fn parse(bytes: &[u8]) -> Result<ClassFile> {
    let mut r = Reader::new(bytes);

    if r.u32()? != MAGIC {
        bail!("not a class file (bad magic)");
    }
    r.skip(4)?; // minor/major version

    let pool = parse_pool(&mut r)?;

    r.skip(2)?; // access_flags
    let this_class = r.u16()?;
    let name = pool.class_name(this_class)?.to_string();
    r.skip(2)?; // super_class

    let interface_count = r.u16()? as usize;
    r.skip(interface_count * 2)?;

    skip_members(&mut r)?; // fields

    let method_count = r.u16()?;
    let mut methods = Vec::new();
    for _ in 0..method_count {
        if let Some(method) = parse_method(&mut r, &pool)? {
            methods.push(method);
        }
    }

    // Trailing class attributes are irrelevant.
    Ok(ClassFile {
        name,
        pool,
        methods,
    })
}

fn parse_pool(r: &mut Reader<'_>) -> Result<ConstantPool> {
    let count = r.u16()?;
    let mut pool = ConstantPool::new();
    let mut index = 1;
    while index < count {
        let tag = r.u8()?;
        let entry = match tag {
            1 => {
                let len = r.u16()? as usize;
                let raw = r.take(len)?;
                // Modified UTF-8; lossy decoding is fine for identifiers
                // and message keys.
                PoolEntry::Utf8(String::from_utf8_lossy(raw).into_owned())
            }
            3 => PoolEntry::Integer(r.u32()? as i32),
            4 => PoolEntry::Float(f32::from_bits(r.u32()?)),
            5 => {
                let hi = r.u32()? as u64;
                let lo = r.u32()? as u64;
                PoolEntry::Long(((hi << 32) | lo) as i64)
            }
            6 => {
                let hi = r.u32()? as u64;
                let lo = r.u32()? as u64;
                PoolEntry::Double(f64::from_bits((hi << 32) | lo))
            }
            7 => PoolEntry::Class { name: r.u16()? },
            8 => PoolEntry::Str { utf8: r.u16()? },
            9 => PoolEntry::FieldRef {
                class: r.u16()?,
                name_and_type: r.u16()?,
            },
            10 => PoolEntry::MethodRef {
                class: r.u16()?,
                name_and_type: r.u16()?,
            },
            11 => PoolEntry::InterfaceMethodRef {
                class: r.u16()?,
                name_and_type: r.u16()?,
            },
            12 => PoolEntry::NameAndType {
                name: r.u16()?,
                descriptor: r.u16()?,
            },
            15 => PoolEntry::MethodHandle {
                kind: r.u8()?,
                reference: r.u16()?,
            },
            16 => PoolEntry::MethodType {
                descriptor: r.u16()?,
            },
            17 => PoolEntry::Dynamic {
                bootstrap: r.u16()?,
                name_and_type: r.u16()?,
            },
            18 => PoolEntry::InvokeDynamic {
                bootstrap: r.u16()?,
                name_and_type: r.u16()?,
            },
            19 => PoolEntry::Module { name: r.u16()? },
            20 => PoolEntry::Package { name: r.u16()? },
            other => bail!("unknown constant pool tag {} at index {}", other, index),
        };
        let two_slots = matches!(entry, PoolEntry::Long(_) | PoolEntry::Double(_));
        pool.push(entry);
        index += 1;
        if two_slots {
            pool.push(PoolEntry::Unusable);
            index += 1;
        }
    }
    Ok(pool)
}

fn skip_members(r: &mut Reader<'_>) -> Result<()> {
    let count = r.u16()?;
    for _ in 0..count {
        r.skip(6)?; // access, name, descriptor
        skip_attributes(r)?;
    }
    Ok(())
}

fn skip_attributes(r: &mut Reader<'_>) -> Result<()> {
    let count = r.u16()?;
    for _ in 0..count {
        r.skip(2)?;
        let len = r.u32()? as usize;
        r.skip(len)?;
    }
    Ok(())
}

fn parse_method(r: &mut Reader<'_>, pool: &ConstantPool) -> Result<Option<MethodBody>> {
    r.skip(2)?; // access_flags
    let name = pool.utf8(r.u16()?)?.to_string();
    let descriptor = pool.utf8(r.u16()?)?.to_string();

    let attr_count = r.u16()?;
    let mut body = None;
    for _ in 0..attr_count {
        let attr_name = pool.utf8(r.u16()?)?;
        let attr_len = r.u32()? as usize;
        if attr_name != "Code" {
            r.skip(attr_len)?;
            continue;
        }

        r.skip(2)?; // max_stack
        let max_locals = r.u16()?;
        let code_len = r.u32()? as usize;
        let code = r.take(code_len)?.to_vec();

        let handler_count = r.u16()?;
        let mut exception_table = Vec::with_capacity(handler_count as usize);
        for _ in 0..handler_count {
            let start_pc = r.u16()?;
            let end_pc = r.u16()?;
            let handler_pc = r.u16()?;
            r.skip(2)?; // catch_type
            exception_table.push(ExceptionRange {
                start_pc,
                end_pc,
                handler_pc,
            });
        }
        skip_attributes(r)?; // LineNumberTable, StackMapTable, ...

        body = Some(MethodBody {
            name: name.clone(),
            descriptor: descriptor.clone(),
            max_locals,
            code,
            exception_table,
        });
    }
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_bad_magic() {
        let err = parse(&[0xde, 0xad, 0xbe, 0xef, 0, 0, 0, 0]).unwrap_err();
        assert!(err.to_string().contains("bad magic"));
    }

    #[test]
    fn test_rejects_truncated_input() {
        let err = parse(&[0xca, 0xfe]).unwrap_err();
        assert!(err.to_string().contains("end of class file"));
    }
}
