//! Abstract value domain.
//!
//! Two points: a known string constant or everything else. `NonConstant`
//! is absorbing, and merging two different constants loses both, so a slot
//! can only move downward. That finite height is what guarantees the
//! fixed-point loop terminates.

/// The analyzer's belief about one stack or local word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbstractValue {
    /// Provably this exact string constant on every path reaching here.
    Constant(String),
    /// Anything else: numbers, references, unknown call results.
    NonConstant,
}

impl AbstractValue {
    pub fn constant(s: impl Into<String>) -> Self {
        AbstractValue::Constant(s.into())
    }

    pub fn as_constant(&self) -> Option<&str> {
        match self {
            AbstractValue::Constant(s) => Some(s),
            AbstractValue::NonConstant => None,
        }
    }

    /// Lattice join: equal values merge to themselves, anything else to
    /// `NonConstant`. Commutative, associative, idempotent.
    pub fn merge(&self, other: &AbstractValue) -> AbstractValue {
        if self == other {
            self.clone()
        } else {
            AbstractValue::NonConstant
        }
    }
}

#[cfg(test)]
mod tests {
    use super::AbstractValue::{self, NonConstant};

    fn c(s: &str) -> AbstractValue {
        AbstractValue::constant(s)
    }

    #[test]
    fn test_merge_is_idempotent() {
        assert_eq!(c("x").merge(&c("x")), c("x"));
        assert_eq!(NonConstant.merge(&NonConstant), NonConstant);
    }

    #[test]
    fn test_merge_of_different_constants_widens() {
        assert_eq!(c("a").merge(&c("b")), NonConstant);
        assert_eq!(c("b").merge(&c("a")), NonConstant);
    }

    #[test]
    fn test_non_constant_is_absorbing() {
        assert_eq!(c("a").merge(&NonConstant), NonConstant);
        assert_eq!(NonConstant.merge(&c("a")), NonConstant);
    }

    #[test]
    fn test_merge_is_commutative_and_associative() {
        let values = [c("a"), c("b"), NonConstant];
        for x in &values {
            for y in &values {
                assert_eq!(x.merge(y), y.merge(x));
                for z in &values {
                    assert_eq!(x.merge(y).merge(z), x.merge(&y.merge(z)));
                }
            }
        }
    }
}
