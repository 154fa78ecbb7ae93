//! Report formatting and printing utilities.
//!
//! Displays issues in cargo-style format. Separate from the core logic so
//! keylint can be used as a library.

use std::io::{self, Write};

use colored::Colorize;

use super::commands::{CommandResult, CommandSummary, InitSummary, KeysSummary};
use crate::config::CONFIG_FILE_NAME;
use crate::issues::{Issue, KeyUsage, Report, Severity};

/// Success mark for consistent output formatting.
pub const SUCCESS_MARK: &str = "\u{2713}"; // ✓

/// Failure mark for consistent output formatting.
pub const FAILURE_MARK: &str = "\u{2718}"; // ✘

/// Maximum number of usages to display per issue.
const MAX_USAGES_DISPLAY: usize = 3;

/// Print issues in cargo-style format to stdout.
pub fn report(issues: &[Issue]) {
    report_to(issues, &mut io::stdout().lock());
}

/// Print issues to a custom writer.
///
/// Useful for testing or redirecting output.
pub fn report_to<W: Write>(issues: &[Issue], writer: &mut W) {
    if issues.is_empty() {
        return;
    }

    let mut sorted = issues.to_vec();
    sorted.sort();

    for issue in &sorted {
        print_issue(issue, writer);
    }

    print_summary(&sorted, writer);
}

/// Print a success message when no issues are found.
pub fn print_success(classes: usize, message_files: usize) {
    print_success_to(classes, message_files, &mut io::stdout().lock());
}

/// Print a success message to a custom writer.
pub fn print_success_to<W: Write>(classes: usize, message_files: usize, writer: &mut W) {
    let msg = format!(
        "Checked {} class {}, {} message {} - no issues found",
        classes,
        if classes == 1 { "file" } else { "files" },
        message_files,
        if message_files == 1 { "file" } else { "files" }
    );
    let _ = writeln!(writer, "{} {}", SUCCESS_MARK.green(), msg.green());
}

// ============================================================
// Internal Functions
// ============================================================

fn print_issue<W: Write>(issue: &Issue, writer: &mut W) {
    let severity_str = match issue.report_severity() {
        Severity::Error => "error".bold().red(),
        Severity::Warning => "warning".bold().yellow(),
    };

    let _ = writeln!(
        writer,
        "{}: \"{}\"  {}",
        severity_str,
        issue.message(),
        issue.report_rule().to_string().dimmed().cyan()
    );

    if let Some(location) = issue.location() {
        let _ = writeln!(writer, "  {} {}", "-->".blue(), location);
    }

    if let Some(details) = issue.details() {
        let _ = writeln!(writer, "  {} {} {}", "=".blue(), "note:".bold(), details);
    }

    let usages = issue.usages();
    if !usages.is_empty() {
        print_usages(usages, writer);
    }

    let _ = writeln!(writer); // Empty line between issues
}

fn print_usages<W: Write>(usages: &[KeyUsage], writer: &mut W) {
    let total = usages.len();
    let display_count = total.min(MAX_USAGES_DISPLAY);

    for (i, usage) in usages.iter().take(display_count).enumerate() {
        let is_last = i == display_count - 1;
        let remaining = total.saturating_sub(display_count);
        let suffix = if is_last && remaining > 0 {
            format!(" (and {} more)", remaining)
        } else {
            String::new()
        };

        let _ = writeln!(
            writer,
            "  {} {} {}{}",
            "=".blue(),
            "used:".bold(),
            usage,
            suffix
        );
    }
}

fn print_summary<W: Write>(issues: &[Issue], writer: &mut W) {
    let total_errors = issues
        .iter()
        .filter(|i| i.report_severity() == Severity::Error)
        .count();
    let total_warnings = issues
        .iter()
        .filter(|i| i.report_severity() == Severity::Warning)
        .count();
    let total_problems = total_errors + total_warnings;

    if total_problems > 0 {
        let _ = writeln!(
            writer,
            "\n{} {} problems ({} {}, {} {})",
            FAILURE_MARK.red(),
            total_problems,
            total_errors,
            if total_errors == 1 { "error" } else { "errors" }.red(),
            total_warnings,
            if total_warnings == 1 {
                "warning"
            } else {
                "warnings"
            }
            .yellow()
        );
    }
}

pub fn print(result: &CommandResult, verbose: bool) {
    match &result.summary {
        CommandSummary::Check => {
            report(&result.issues);
            if result.issues.is_empty() {
                print_success(result.classes_scanned, result.message_files_loaded);
            }
        }
        CommandSummary::Keys(summary) => {
            print_keys(summary, result.classes_scanned, verbose);
            report(&result.issues);
        }
        CommandSummary::Init(summary) => {
            print_init(summary);
        }
    }
}

fn print_keys(summary: &KeysSummary, classes: usize, verbose: bool) {
    print_keys_to(summary, classes, verbose, &mut io::stdout().lock());
}

fn print_keys_to<W: Write>(summary: &KeysSummary, classes: usize, verbose: bool, writer: &mut W) {
    let mut last: Option<&str> = None;
    let mut distinct = 0usize;
    for extracted in &summary.keys {
        if last != Some(extracted.key.as_str()) {
            let _ = writeln!(writer, "{}", extracted.key);
            last = Some(extracted.key.as_str());
            distinct += 1;
        }
        if verbose {
            let _ = writeln!(
                writer,
                "  {} {}.{}",
                "-->".blue(),
                extracted.class,
                extracted.method
            );
        }
    }
    let _ = writeln!(
        writer,
        "\n{} key(s) extracted from {} class file(s)",
        distinct, classes
    );
}

fn print_init(summary: &InitSummary) {
    if summary.created {
        println!(
            "{} {}",
            SUCCESS_MARK.green(),
            format!("Created {}", CONFIG_FILE_NAME).green()
        );
    }
}

// ============================================================
// Tests
// ============================================================
