use crate::extract::ExtractedKey;
use crate::issues::Issue;

#[derive(Debug)]
pub enum CommandSummary {
    Check,
    Keys(KeysSummary),
    Init(InitSummary),
}

#[derive(Debug)]
pub struct KeysSummary {
    pub keys: Vec<ExtractedKey>,
}

#[derive(Debug)]
pub struct InitSummary {
    pub created: bool,
}

/// Result of running a keylint command.
#[derive(Debug)]
pub struct CommandResult {
    pub summary: CommandSummary,
    /// All issues found during the check. Empty for non-check commands.
    pub issues: Vec<Issue>,
    /// Number of `.class` files scanned.
    pub classes_scanned: usize,
    /// Number of message files loaded. 0 if messages were not loaded.
    pub message_files_loaded: usize,
    /// True when the run should exit with a failure status.
    pub failed: bool,
}
