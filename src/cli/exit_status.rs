use std::process::ExitCode;

/// Process exit status for the keylint CLI.
///
/// Follows the usual linter convention so CI can tell "the key set is
/// wrong" apart from "keylint could not run": a clean check exits 0, a
/// check that found problems exits 1, and a run that stopped before
/// validation could finish (unreadable config, no message files) exits 2.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ExitStatus {
    /// The command ran and the key set checked out.
    Success,
    /// Validation found missing keys, or unused keys in strict mode.
    Failure,
    /// The run itself failed: configuration error, no loadable message
    /// documents, or an I/O failure outside the per-class pipeline.
    Error,
}

impl From<ExitStatus> for ExitCode {
    fn from(status: ExitStatus) -> Self {
        match status {
            ExitStatus::Success => ExitCode::from(0),
            ExitStatus::Failure => ExitCode::from(1),
            ExitStatus::Error => ExitCode::from(2),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_status_maps_to_linter_codes() {
        assert_eq!(ExitCode::from(ExitStatus::Success), ExitCode::from(0));
        assert_eq!(ExitCode::from(ExitStatus::Failure), ExitCode::from(1));
        assert_eq!(ExitCode::from(ExitStatus::Error), ExitCode::from(2));
    }
}
