//! Key accounting: declared vs extracted.
//!
//! A key referenced in code but never declared is always a hard failure.
//! A declared key never referenced is only a failure in strict mode; the
//! asymmetry reflects that an orphaned declaration is lower severity than
//! a dangling reference.

use std::collections::BTreeSet;

use crate::messages::KeyDocument;

/// The two directions of disagreement, each sorted for diffable output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationResult {
    /// Extracted from code but not declared.
    pub missing: Vec<String>,
    /// Declared but neither extracted nor allow-listed.
    pub unused: Vec<String>,
}

impl ValidationResult {
    pub fn has_missing(&self) -> bool {
        !self.missing.is_empty()
    }

    pub fn has_unused(&self) -> bool {
        !self.unused.is_empty()
    }

    /// Whether this run passes under the given strictness.
    pub fn passes(&self, fail_on_unused: bool) -> bool {
        !self.has_missing() && !(fail_on_unused && self.has_unused())
    }
}

/// Compute both set differences.
pub fn validate(
    declared: &KeyDocument,
    extracted: &BTreeSet<String>,
    always_used: &BTreeSet<String>,
) -> ValidationResult {
    let missing = extracted
        .iter()
        .filter(|key| !declared.contains(key))
        .cloned()
        .collect();

    let unused = declared
        .keys()
        .filter(|key| !extracted.contains(*key) && !always_used.contains(*key))
        .map(str::to_string)
        .collect();

    // BTree iteration order keeps both lists sorted.
    ValidationResult { missing, unused }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn declared(yaml: &str) -> KeyDocument {
        let mut doc = KeyDocument::default();
        doc.merge_value(&serde_yaml::from_str(yaml).unwrap(), "messages.yml");
        doc
    }

    fn set(keys: &[&str]) -> BTreeSet<String> {
        keys.iter().map(|k| k.to_string()).collect()
    }

    #[test]
    fn test_round_trip_accounting() {
        let doc = declared(
            "prefix: \"[p] \"\nerror:\n  notfound: \"nf\"\n  denied: \"no\"\n",
        );
        let result = validate(&doc, &set(&["prefix", "error.notfound"]), &set(&[]));
        assert_eq!(result.missing, Vec::<String>::new());
        assert_eq!(result.unused, vec!["error.denied".to_string()]);
    }

    #[test]
    fn test_missing_key_fails_in_both_modes() {
        let doc = declared("prefix: \"[p] \"\n");
        let result = validate(&doc, &set(&["error.unknown"]), &set(&[]));
        assert_eq!(result.missing, vec!["error.unknown".to_string()]);
        assert!(!result.passes(true));
        assert!(!result.passes(false));
    }

    #[test]
    fn test_unused_only_fails_in_strict_mode() {
        let doc = declared("error:\n  stale: \"old\"\n");
        let result = validate(&doc, &set(&[]), &set(&[]));
        assert_eq!(result.unused, vec!["error.stale".to_string()]);
        assert!(!result.passes(true));
        assert!(result.passes(false));
    }

    #[test]
    fn test_allow_list_suppresses_unused() {
        let doc = declared("prefix: \"[p] \"\nerror:\n  kept: \"k\"\n");
        let result = validate(&doc, &set(&[]), &set(&["prefix", "error.kept"]));
        assert!(result.unused.is_empty());
        assert!(result.passes(true));
    }

    #[test]
    fn test_allow_list_does_not_hide_missing() {
        let doc = declared("prefix: \"[p] \"\n");
        let result = validate(&doc, &set(&["error.gone"]), &set(&["error.gone"]));
        assert_eq!(result.missing, vec!["error.gone".to_string()]);
    }

    #[test]
    fn test_empty_extracted_set_is_valid_input() {
        let doc = declared("prefix: \"[p] \"\n");
        let result = validate(&doc, &set(&[]), &set(&["prefix"]));
        assert_eq!(result, ValidationResult::default());
        assert!(result.passes(true));
    }

    #[test]
    fn test_output_is_sorted_and_deterministic() {
        let doc = declared("b: \"2\"\na: \"1\"\nc: \"3\"\n");
        let extracted = set(&["z.key", "m.key"]);
        let first = validate(&doc, &extracted, &set(&[]));
        let second = validate(&doc, &extracted, &set(&[]));
        assert_eq!(first, second);
        assert_eq!(first.missing, vec!["m.key".to_string(), "z.key".to_string()]);
        assert_eq!(
            first.unused,
            vec!["a".to_string(), "b".to_string(), "c".to_string()]
        );
    }
}
