//! Class file constant pool.
//!
//! The pool is indexed from 1 as in the class file format; `Long` and
//! `Double` entries occupy two indices, with the second marked `Unusable`.

use std::fmt;

/// One constant pool entry.
#[derive(Debug, Clone, PartialEq)]
pub enum PoolEntry {
    Utf8(String),
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    Class { name: u16 },
    Str { utf8: u16 },
    FieldRef { class: u16, name_and_type: u16 },
    MethodRef { class: u16, name_and_type: u16 },
    InterfaceMethodRef { class: u16, name_and_type: u16 },
    NameAndType { name: u16, descriptor: u16 },
    MethodHandle { kind: u8, reference: u16 },
    MethodType { descriptor: u16 },
    Dynamic { bootstrap: u16, name_and_type: u16 },
    InvokeDynamic { bootstrap: u16, name_and_type: u16 },
    Module { name: u16 },
    Package { name: u16 },
    /// Second slot of a Long/Double entry.
    Unusable,
}

/// Error for out-of-range or wrongly-typed pool lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolError {
    pub index: u16,
    pub expected: &'static str,
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "constant pool index {} is not a {} entry",
            self.index, self.expected
        )
    }
}

impl std::error::Error for PoolError {}

/// The value an `ldc`-family instruction pushes.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadedConstant {
    Str(String),
    OneWord,
    TwoWord,
}

/// Symbolic reference to an invoked method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodRef {
    /// Internal name of the declaring type, e.g. `java/lang/String`.
    pub owner: String,
    pub name: String,
    pub descriptor: String,
}

#[derive(Debug, Clone, Default)]
pub struct ConstantPool {
    entries: Vec<PoolEntry>,
}

impl ConstantPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry and return its 1-based index. The caller is
    /// responsible for pushing the `Unusable` filler after Long/Double.
    pub fn push(&mut self, entry: PoolEntry) -> u16 {
        self.entries.push(entry);
        self.entries.len() as u16
    }

    /// Number of occupied indices (the class file `constant_pool_count - 1`).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: u16) -> Option<&PoolEntry> {
        if index == 0 {
            return None;
        }
        self.entries.get(index as usize - 1)
    }

    fn err(&self, index: u16, expected: &'static str) -> PoolError {
        PoolError { index, expected }
    }

    pub fn utf8(&self, index: u16) -> Result<&str, PoolError> {
        match self.get(index) {
            Some(PoolEntry::Utf8(s)) => Ok(s),
            _ => Err(self.err(index, "Utf8")),
        }
    }

    pub fn class_name(&self, index: u16) -> Result<&str, PoolError> {
        match self.get(index) {
            Some(PoolEntry::Class { name }) => self.utf8(*name),
            _ => Err(self.err(index, "Class")),
        }
    }

    pub fn name_and_type(&self, index: u16) -> Result<(&str, &str), PoolError> {
        match self.get(index) {
            Some(PoolEntry::NameAndType { name, descriptor }) => {
                Ok((self.utf8(*name)?, self.utf8(*descriptor)?))
            }
            _ => Err(self.err(index, "NameAndType")),
        }
    }

    /// Resolve a Methodref/InterfaceMethodref entry.
    pub fn method_ref(&self, index: u16) -> Result<MethodRef, PoolError> {
        let (class, name_and_type) = match self.get(index) {
            Some(
                PoolEntry::MethodRef {
                    class,
                    name_and_type,
                }
                | PoolEntry::InterfaceMethodRef {
                    class,
                    name_and_type,
                },
            ) => (*class, *name_and_type),
            _ => return Err(self.err(index, "Methodref")),
        };
        let owner = self.class_name(class)?.to_string();
        let (name, descriptor) = self.name_and_type(name_and_type)?;
        Ok(MethodRef {
            owner,
            name: name.to_string(),
            descriptor: descriptor.to_string(),
        })
    }

    /// Resolve the name/descriptor of an InvokeDynamic call site.
    pub fn invoke_dynamic(&self, index: u16) -> Result<(String, String), PoolError> {
        match self.get(index) {
            Some(PoolEntry::InvokeDynamic { name_and_type, .. }) => {
                let (name, descriptor) = self.name_and_type(*name_and_type)?;
                Ok((name.to_string(), descriptor.to_string()))
            }
            _ => Err(self.err(index, "InvokeDynamic")),
        }
    }

    /// Field descriptor of a Fieldref entry, for stack width computation.
    pub fn field_descriptor(&self, index: u16) -> Result<&str, PoolError> {
        match self.get(index) {
            Some(PoolEntry::FieldRef { name_and_type, .. }) => {
                Ok(self.name_and_type(*name_and_type)?.1)
            }
            _ => Err(self.err(index, "Fieldref")),
        }
    }

    /// What an `ldc`/`ldc_w`/`ldc2_w` of this index pushes.
    pub fn loadable_constant(&self, index: u16) -> Result<LoadedConstant, PoolError> {
        match self.get(index) {
            Some(PoolEntry::Str { utf8 }) => Ok(LoadedConstant::Str(self.utf8(*utf8)?.to_string())),
            Some(
                PoolEntry::Integer(_)
                | PoolEntry::Float(_)
                | PoolEntry::Class { .. }
                | PoolEntry::MethodHandle { .. }
                | PoolEntry::MethodType { .. },
            ) => Ok(LoadedConstant::OneWord),
            Some(PoolEntry::Long(_) | PoolEntry::Double(_)) => Ok(LoadedConstant::TwoWord),
            Some(PoolEntry::Dynamic { name_and_type, .. }) => {
                let (_, descriptor) = self.name_and_type(*name_and_type)?;
                if descriptor.starts_with('J') || descriptor.starts_with('D') {
                    Ok(LoadedConstant::TwoWord)
                } else {
                    Ok(LoadedConstant::OneWord)
                }
            }
            _ => Err(self.err(index, "loadable constant")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_pool() -> ConstantPool {
        let mut pool = ConstantPool::new();
        let owner_utf8 = pool.push(PoolEntry::Utf8("app/Messages".to_string()));
        let owner = pool.push(PoolEntry::Class { name: owner_utf8 });
        let name = pool.push(PoolEntry::Utf8("raw".to_string()));
        let desc = pool.push(PoolEntry::Utf8("(Ljava/lang/String;)V".to_string()));
        let nat = pool.push(PoolEntry::NameAndType {
            name,
            descriptor: desc,
        });
        pool.push(PoolEntry::MethodRef {
            class: owner,
            name_and_type: nat,
        });
        let text = pool.push(PoolEntry::Utf8("error.denied".to_string()));
        pool.push(PoolEntry::Str { utf8: text });
        pool
    }

    #[test]
    fn test_method_ref_resolution() {
        let pool = sample_pool();
        let mref = pool.method_ref(6).unwrap();
        assert_eq!(mref.owner, "app/Messages");
        assert_eq!(mref.name, "raw");
        assert_eq!(mref.descriptor, "(Ljava/lang/String;)V");
    }

    #[test]
    fn test_string_constant() {
        let pool = sample_pool();
        assert_eq!(
            pool.loadable_constant(8).unwrap(),
            LoadedConstant::Str("error.denied".to_string())
        );
    }

    #[test]
    fn test_long_constant_is_two_words() {
        let mut pool = ConstantPool::new();
        let idx = pool.push(PoolEntry::Long(42));
        pool.push(PoolEntry::Unusable);
        assert_eq!(pool.loadable_constant(idx).unwrap(), LoadedConstant::TwoWord);
    }

    #[test]
    fn test_index_zero_is_invalid() {
        let pool = sample_pool();
        assert!(pool.get(0).is_none());
        assert!(pool.utf8(0).is_err());
    }

    #[test]
    fn test_wrong_entry_kind() {
        let pool = sample_pool();
        let err = pool.method_ref(1).unwrap_err();
        assert_eq!(err.index, 1);
        assert_eq!(err.expected, "Methodref");
    }
}
