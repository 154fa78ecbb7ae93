//! Declared-key documents.
//!
//! Loads one or more hierarchical YAML documents and flattens them into a
//! dotted key → value map. Only string-valued leaves count as declared
//! keys. Sources are merged by union in order: later documents can add
//! keys, never remove or override them.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde_yaml::Value;

/// One declared key with where it came from, for reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredKey {
    pub value: String,
    pub source: String,
}

/// The flattened union of all declared-key documents.
#[derive(Debug, Clone, Default)]
pub struct KeyDocument {
    entries: BTreeMap<String, DeclaredKey>,
    sources: Vec<String>,
}

impl KeyDocument {
    /// Load and merge the given sources. Paths that do not exist are
    /// skipped; ending up with zero readable documents is a configuration
    /// error, as is a document that fails to parse.
    pub fn load(paths: &[PathBuf]) -> Result<Self> {
        let existing: Vec<&PathBuf> = paths.iter().filter(|p| p.exists()).collect();
        if existing.is_empty() {
            bail!(
                "no message files found; configure `messages` in .keylintrc.json \
                 (looked for {} path(s))",
                paths.len()
            );
        }

        let mut doc = KeyDocument::default();
        for path in existing {
            doc.merge_file(path)?;
        }
        Ok(doc)
    }

    fn merge_file(&mut self, path: &Path) -> Result<()> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read message file: {}", path.display()))?;
        let root: Value = serde_yaml::from_str(&content)
            .with_context(|| format!("failed to parse YAML file: {}", path.display()))?;
        self.merge_value(&root, &path.display().to_string());
        Ok(())
    }

    /// Merge one parsed document. Public for tests and embedders.
    pub fn merge_value(&mut self, root: &Value, source: &str) {
        self.sources.push(source.to_string());
        flatten(root, String::new(), source, &mut self.entries);
    }

    /// Number of documents merged in.
    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Declared keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn get(&self, key: &str) -> Option<&DeclaredKey> {
        self.entries.get(key)
    }
}

fn flatten(value: &Value, prefix: String, source: &str, out: &mut BTreeMap<String, DeclaredKey>) {
    let Value::Mapping(map) = value else {
        return;
    };
    for (raw_key, child) in map {
        let Some(key) = scalar_key(raw_key) else {
            continue;
        };
        let path = if prefix.is_empty() {
            key
        } else {
            format!("{}.{}", prefix, key)
        };
        if let Value::String(s) = child {
            // First declaration wins; later sources only add.
            out.entry(path.clone()).or_insert_with(|| DeclaredKey {
                value: s.clone(),
                source: source.to_string(),
            });
        }
        flatten(child, path, source, out);
    }
}

fn scalar_key(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn doc_from(yaml: &str) -> KeyDocument {
        let mut doc = KeyDocument::default();
        let root: Value = serde_yaml::from_str(yaml).unwrap();
        doc.merge_value(&root, "messages.yml");
        doc
    }

    #[test]
    fn test_flatten_nested_mappings() {
        let doc = doc_from(
            "error:\n  notfound: \"Not found\"\n  denied: \"No permission\"\nprefix: \"[app] \"\n",
        );
        let keys: Vec<&str> = doc.keys().collect();
        assert_eq!(keys, vec!["error.denied", "error.notfound", "prefix"]);
        assert_eq!(doc.get("error.denied").unwrap().value, "No permission");
    }

    #[test]
    fn test_only_string_leaves_count() {
        let doc = doc_from("limits:\n  max: 5\n  enabled: true\nerror:\n  gone: \"Gone\"\n");
        let keys: Vec<&str> = doc.keys().collect();
        assert_eq!(keys, vec!["error.gone"]);
    }

    #[test]
    fn test_interior_nodes_are_not_keys() {
        let doc = doc_from("a:\n  b:\n    c: \"leaf\"\n");
        assert!(doc.contains("a.b.c"));
        assert!(!doc.contains("a"));
        assert!(!doc.contains("a.b"));
    }

    #[test]
    fn test_union_merge_only_adds() {
        let mut doc = doc_from("error:\n  one: \"1\"\n");
        let second: Value = serde_yaml::from_str("error:\n  one: \"overridden\"\n  two: \"2\"\n")
            .unwrap();
        doc.merge_value(&second, "extra.yml");
        assert_eq!(doc.len(), 2);
        // The first declaration is kept.
        assert_eq!(doc.get("error.one").unwrap().value, "1");
        assert_eq!(doc.get("error.one").unwrap().source, "messages.yml");
        assert_eq!(doc.get("error.two").unwrap().source, "extra.yml");
    }

    #[test]
    fn test_numeric_mapping_keys_are_stringified() {
        let doc = doc_from("levels:\n  1: \"first\"\n  2: \"second\"\n");
        assert!(doc.contains("levels.1"));
        assert!(doc.contains("levels.2"));
    }

    #[test]
    fn test_load_requires_at_least_one_file() {
        let err = KeyDocument::load(&[PathBuf::from("/nonexistent/messages.yml")]).unwrap_err();
        assert!(err.to_string().contains("no message files found"));
    }

    #[test]
    fn test_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("messages.yml");
        std::fs::write(&path, "error:\n  io: \"IO error\"\n").unwrap();
        let doc = KeyDocument::load(&[path, PathBuf::from("/missing.yml")]).unwrap();
        assert!(doc.contains("error.io"));
        assert_eq!(doc.len(), 1);
        assert_eq!(doc.source_count(), 1);
    }

    #[test]
    fn test_malformed_yaml_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("messages.yml");
        std::fs::write(&path, "error: [unclosed\n").unwrap();
        let err = KeyDocument::load(&[path]).unwrap_err();
        assert!(err.to_string().contains("failed to parse YAML file"));
    }
}
