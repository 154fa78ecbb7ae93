use std::collections::BTreeSet;
use std::path::PathBuf;

use anyhow::Result;

use super::super::args::CheckCommand;
use super::{
    CommandResult, CommandSummary,
    helper::{resolved_config, scan},
};
use crate::issues::{Issue, KeyUsage, MissingKeyIssue, SkippedUnitIssue, UnusedKeyIssue};
use crate::messages::KeyDocument;
use crate::validate::validate;

pub fn check(cmd: CheckCommand) -> Result<CommandResult> {
    let config = resolved_config(&cmd.common)?;

    let message_paths: Vec<PathBuf> = config.messages.iter().map(PathBuf::from).collect();
    let declared = KeyDocument::load(&message_paths)?;

    let outcome = scan(&config)?;
    let extracted: BTreeSet<String> = outcome.keys.iter().map(|k| k.key.clone()).collect();
    let always_used: BTreeSet<String> = config.always_used_keys.iter().cloned().collect();

    let result = validate(&declared, &extracted, &always_used);
    let strict = config.fail_on_unused_keys;

    let mut issues: Vec<Issue> = Vec::new();
    for key in &result.missing {
        let usages: Vec<KeyUsage> = outcome
            .keys
            .iter()
            .filter(|k| &k.key == key)
            .map(|k| KeyUsage {
                class: k.class.clone(),
                method: k.method.clone(),
            })
            .collect();
        issues.push(Issue::MissingKey(MissingKeyIssue {
            key: key.clone(),
            usages,
        }));
    }
    for key in &result.unused {
        let (value, source) = declared
            .get(key)
            .map(|d| (d.value.clone(), d.source.clone()))
            .unwrap_or_default();
        issues.push(Issue::UnusedKey(UnusedKeyIssue {
            key: key.clone(),
            value,
            source,
            strict,
        }));
    }
    for diag in &outcome.diagnostics {
        issues.push(Issue::SkippedUnit(SkippedUnitIssue {
            path: diag.path.clone(),
            unit: diag.unit.clone(),
            error: diag.message.clone(),
        }));
    }
    issues.sort();

    let failed = !result.passes(strict);

    Ok(CommandResult {
        summary: CommandSummary::Check,
        issues,
        classes_scanned: outcome.classes_scanned,
        message_files_loaded: declared.source_count(),
        failed,
    })
}
