use anyhow::Result;

use super::super::args::KeysCommand;
use super::{
    CommandResult, CommandSummary, KeysSummary,
    helper::{resolved_config, scan},
};
use crate::issues::{Issue, SkippedUnitIssue};

pub fn keys(cmd: KeysCommand) -> Result<CommandResult> {
    let config = resolved_config(&cmd.common)?;
    let outcome = scan(&config)?;

    let issues: Vec<Issue> = outcome
        .diagnostics
        .iter()
        .map(|diag| {
            Issue::SkippedUnit(SkippedUnitIssue {
                path: diag.path.clone(),
                unit: diag.unit.clone(),
                error: diag.message.clone(),
            })
        })
        .collect();

    Ok(CommandResult {
        summary: CommandSummary::Keys(KeysSummary { keys: outcome.keys }),
        issues,
        classes_scanned: outcome.classes_scanned,
        message_files_loaded: 0,
        failed: false,
    })
}
