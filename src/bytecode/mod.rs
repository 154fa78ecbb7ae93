//! Class file reading and method decoding.
//!
//! Layered bottom-up: `pool` and `descriptor` are pure lookups,
//! `class_file` parses the container format, `decoder` turns one method's
//! code bytes into typed instructions with an explicit successor relation.

pub mod class_file;
pub mod decoder;
pub mod descriptor;
pub mod opcodes;
pub mod pool;

pub use class_file::{ClassFile, ExceptionRange, MethodBody};
pub use decoder::{DecodeError, HandlerEdge, Insn, InsnKind, InvokeInsn, MethodCode, StackOp};
pub use pool::{ConstantPool, MethodRef, PoolEntry};

#[cfg(test)]
pub(crate) mod testutil {
    use super::class_file::MethodBody;
    use super::pool::{ConstantPool, PoolEntry};

    /// Builds constant pools for decoder and analysis tests.
    pub struct PoolBuilder {
        pub pool: ConstantPool,
    }

    impl PoolBuilder {
        pub fn new() -> Self {
            Self {
                pool: ConstantPool::new(),
            }
        }

        pub fn utf8(&mut self, text: &str) -> u16 {
            self.pool.push(PoolEntry::Utf8(text.to_string()))
        }

        /// A `String` constant usable from `ldc`.
        pub fn string(&mut self, text: &str) -> u16 {
            let utf8 = self.utf8(text);
            self.pool.push(PoolEntry::Str { utf8 })
        }

        pub fn class(&mut self, name: &str) -> u16 {
            let name = self.utf8(name);
            self.pool.push(PoolEntry::Class { name })
        }

        pub fn method_ref(&mut self, owner: &str, name: &str, descriptor: &str) -> u16 {
            let class = self.class(owner);
            let name = self.utf8(name);
            let descriptor = self.utf8(descriptor);
            let name_and_type = self.pool.push(PoolEntry::NameAndType {
                name,
                descriptor,
            });
            self.pool.push(PoolEntry::MethodRef {
                class,
                name_and_type,
            })
        }
    }

    /// A method body around raw code bytes, with room for a few locals.
    pub fn method(code: &[u8]) -> MethodBody {
        MethodBody {
            name: "run".to_string(),
            descriptor: "()V".to_string(),
            max_locals: 8,
            code: code.to_vec(),
            exception_table: Vec::new(),
        }
    }
}
