//! Class file scanning.
//!
//! Enumerates `.class` files under the configured directories and runs the
//! decode → analyze → extract pipeline per class. Classes are independent,
//! so the per-class work runs on the rayon pool and results are merged
//! sequentially; the only cross-class state is the final key set union.
//! A class or method that cannot be processed becomes a diagnostic and is
//! skipped, never fatal.

use std::path::{Path, PathBuf};

use glob::Pattern;
use rayon::prelude::*;
use walkdir::WalkDir;

use crate::analysis;
use crate::bytecode::{class_file, decoder};
use crate::extract::{ExtractedKey, ExtractorConfig, extract_keys};

/// One skipped unit, reported alongside the result instead of logged.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Diagnostic {
    /// Class file path, or a synthetic label for in-memory input.
    pub path: String,
    /// `Class.method` when the failure is method-scoped, empty otherwise.
    pub unit: String,
    pub message: String,
}

/// Aggregated scan output across all classes.
#[derive(Debug, Default)]
pub struct ScanOutcome {
    pub keys: Vec<ExtractedKey>,
    pub diagnostics: Vec<Diagnostic>,
    pub classes_scanned: usize,
}

/// Scan all class files under `roots` (directories are walked recursively,
/// plain `.class` paths are taken as-is).
pub fn scan_classes(
    roots: &[PathBuf],
    ignores: &[Pattern],
    config: &ExtractorConfig,
) -> ScanOutcome {
    let mut files = collect_class_files(roots, ignores);
    // Deterministic work order and output attribution.
    files.sort();

    let per_class: Vec<(Vec<ExtractedKey>, Vec<Diagnostic>)> = files
        .par_iter()
        .map(|path| {
            let label = path.display().to_string();
            match std::fs::read(path) {
                Ok(bytes) => scan_class_bytes(&bytes, &label, config),
                Err(e) => (
                    Vec::new(),
                    vec![Diagnostic {
                        path: label,
                        unit: String::new(),
                        message: format!("failed to read class file: {}", e),
                    }],
                ),
            }
        })
        .collect();

    let mut outcome = ScanOutcome {
        classes_scanned: files.len(),
        ..ScanOutcome::default()
    };
    for (keys, diagnostics) in per_class {
        outcome.keys.extend(keys);
        outcome.diagnostics.extend(diagnostics);
    }
    outcome.keys.sort();
    outcome.keys.dedup();
    outcome.diagnostics.sort();
    outcome
}

/// Run the full pipeline over one class's bytes.
pub fn scan_class_bytes(
    bytes: &[u8],
    label: &str,
    config: &ExtractorConfig,
) -> (Vec<ExtractedKey>, Vec<Diagnostic>) {
    let mut keys = Vec::new();
    let mut diagnostics = Vec::new();

    let class = match class_file::parse(bytes) {
        Ok(class) => class,
        Err(e) => {
            diagnostics.push(Diagnostic {
                path: label.to_string(),
                unit: String::new(),
                message: format!("failed to parse class file: {}", e),
            });
            return (keys, diagnostics);
        }
    };

    for method in &class.methods {
        let unit = format!("{}.{}", class.name, method.name);
        let code = match decoder::decode(method, &class.pool) {
            Ok(code) => code,
            Err(e) => {
                diagnostics.push(Diagnostic {
                    path: label.to_string(),
                    unit,
                    message: format!("failed to decode method: {}", e),
                });
                continue;
            }
        };
        let frames = match analysis::analyze(&code) {
            Ok(frames) => frames,
            Err(e) => {
                diagnostics.push(Diagnostic {
                    path: label.to_string(),
                    unit,
                    message: format!("analysis did not converge: {}", e),
                });
                continue;
            }
        };
        keys.extend(extract_keys(
            &class.name,
            &method.name,
            &code,
            &frames,
            config,
        ));
    }

    (keys, diagnostics)
}

fn collect_class_files(roots: &[PathBuf], ignores: &[Pattern]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for root in roots {
        if root.is_file() {
            if has_class_extension(root) && !is_ignored(root, ignores) {
                files.push(root.clone());
            }
            continue;
        }
        for entry in WalkDir::new(root).into_iter().filter_map(Result::ok) {
            let path = entry.path();
            if entry.file_type().is_file()
                && has_class_extension(path)
                && !is_ignored(path, ignores)
            {
                files.push(path.to_path_buf());
            }
        }
    }
    files
}

fn has_class_extension(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "class")
}

fn is_ignored(path: &Path, ignores: &[Pattern]) -> bool {
    let text = path.to_string_lossy();
    ignores.iter().any(|pattern| pattern.matches(&text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::ExtractorConfig;
    use std::fs;

    fn config() -> ExtractorConfig {
        ExtractorConfig::new("", &[], &[])
    }

    #[test]
    fn test_unparseable_class_becomes_diagnostic() {
        let (keys, diagnostics) = scan_class_bytes(b"not a class file", "junk.class", &config());
        assert!(keys.is_empty());
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].path, "junk.class");
        assert!(diagnostics[0].message.contains("parse"));
    }

    #[test]
    fn test_empty_tree_scans_zero_classes() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = scan_classes(&[dir.path().to_path_buf()], &[], &config());
        assert_eq!(outcome.classes_scanned, 0);
        assert!(outcome.keys.is_empty());
        assert!(outcome.diagnostics.is_empty());
    }

    #[test]
    fn test_only_class_files_are_picked_up() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("notes.txt"), "hello").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub/Broken.class"), "junk").unwrap();
        let outcome = scan_classes(&[dir.path().to_path_buf()], &[], &config());
        assert_eq!(outcome.classes_scanned, 1);
        assert_eq!(outcome.diagnostics.len(), 1);
    }

    #[test]
    fn test_ignore_patterns_filter_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("generated")).unwrap();
        fs::write(dir.path().join("generated/Gen.class"), "junk").unwrap();
        let ignores = vec![Pattern::new("**/generated/**").unwrap()];
        let outcome = scan_classes(&[dir.path().to_path_buf()], &ignores, &config());
        assert_eq!(outcome.classes_scanned, 0);
    }
}
