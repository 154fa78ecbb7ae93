//! Issue types for message-key validation results.
//!
//! Each issue is self-contained with everything the reporter needs to
//! display it. Detection produces issues as plain data; rendering and
//! exit-code policy live in the CLI layer.

use enum_dispatch::enum_dispatch;

// ============================================================
// Severity and Rule
// ============================================================

/// Severity level of an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// Rule identifier for each issue type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Rule {
    MissingKey,
    UnusedKey,
    SkippedUnit,
}

impl std::fmt::Display for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rule::MissingKey => write!(f, "missing-key"),
            Rule::UnusedKey => write!(f, "unused-key"),
            Rule::SkippedUnit => write!(f, "skipped-unit"),
        }
    }
}

// ============================================================
// Issue Types
// ============================================================

/// One code location a key was extracted from.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct KeyUsage {
    /// Internal class name, e.g. `app/OrderService`.
    pub class: String,
    pub method: String,
}

impl std::fmt::Display for KeyUsage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.class, self.method)
    }
}

/// Key used in bytecode but not declared in any message file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingKeyIssue {
    pub key: String,
    /// Call sites the key was extracted from.
    pub usages: Vec<KeyUsage>,
}

impl MissingKeyIssue {
    pub fn rule() -> Rule {
        Rule::MissingKey
    }
}

/// Key declared in a message file but never used in code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnusedKeyIssue {
    pub key: String,
    pub value: String,
    /// Message file the key was declared in.
    pub source: String,
    /// Whether unused keys fail the run. Controls reported severity.
    pub strict: bool,
}

impl UnusedKeyIssue {
    pub fn rule() -> Rule {
        Rule::UnusedKey
    }
}

/// Class or method that could not be analyzed and was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedUnitIssue {
    pub path: String,
    /// `Class.method` when method-scoped, empty for whole-class failures.
    pub unit: String,
    pub error: String,
}

impl SkippedUnitIssue {
    pub fn rule() -> Rule {
        Rule::SkippedUnit
    }
}

// ============================================================
// Issue Enum
// ============================================================

/// A validation issue found during a check run.
#[enum_dispatch(Report)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Issue {
    MissingKey(MissingKeyIssue),
    UnusedKey(UnusedKeyIssue),
    SkippedUnit(SkippedUnitIssue),
}

impl Issue {
    pub fn severity(&self) -> Severity {
        self.report_severity()
    }

    pub fn rule(&self) -> Rule {
        self.report_rule()
    }
}

// ============================================================
// Report Trait (for CLI output)
// ============================================================

/// Trait implemented by all issue types to give the report functions a
/// consistent interface. Uses `enum_dispatch` for zero-cost dispatch on
/// the `Issue` enum.
#[enum_dispatch]
pub trait Report {
    /// Primary message to display (usually the key).
    fn message(&self) -> String;

    /// Severity level.
    fn report_severity(&self) -> Severity;

    /// Rule identifier.
    fn report_rule(&self) -> Rule;

    /// Rendered location, when the issue has one.
    fn location(&self) -> Option<String> {
        None
    }

    /// Optional details for the "= note:" line.
    fn details(&self) -> Option<String> {
        None
    }

    /// Usage locations (for missing-key).
    fn usages(&self) -> &[KeyUsage] {
        &[]
    }
}

impl Report for MissingKeyIssue {
    fn message(&self) -> String {
        self.key.clone()
    }

    fn report_severity(&self) -> Severity {
        Severity::Error
    }

    fn report_rule(&self) -> Rule {
        Self::rule()
    }

    fn location(&self) -> Option<String> {
        self.usages.first().map(ToString::to_string)
    }

    fn usages(&self) -> &[KeyUsage] {
        &self.usages
    }
}

impl Report for UnusedKeyIssue {
    fn message(&self) -> String {
        self.key.clone()
    }

    fn report_severity(&self) -> Severity {
        if self.strict {
            Severity::Error
        } else {
            Severity::Warning
        }
    }

    fn report_rule(&self) -> Rule {
        Self::rule()
    }

    fn location(&self) -> Option<String> {
        Some(self.source.clone())
    }

    fn details(&self) -> Option<String> {
        Some(format!("(\"{}\")", self.value))
    }
}

impl Report for SkippedUnitIssue {
    fn message(&self) -> String {
        self.error.clone()
    }

    fn report_severity(&self) -> Severity {
        Severity::Warning
    }

    fn report_rule(&self) -> Rule {
        Self::rule()
    }

    fn location(&self) -> Option<String> {
        if self.unit.is_empty() {
            Some(self.path.clone())
        } else {
            Some(format!("{} ({})", self.path, self.unit))
        }
    }
}

// ============================================================
// Ordering for Issue (for sorting in reports)
// ============================================================

impl Ord for Issue {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.rule()
            .cmp(&other.rule())
            .then_with(|| self.message().cmp(&other.message()))
            .then_with(|| self.location().cmp(&other.location()))
    }
}

impl PartialOrd for Issue {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

// ============================================================
// Tests
// ============================================================
