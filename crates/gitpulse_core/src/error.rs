use std::time::Duration;

use thiserror::Error;

/// Broad classification of a failed clone, used by callers to choose a
/// client-visible response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloneErrorKind {
    /// The repository does not exist, is private, or requires credentials.
    NotFound,
    /// Network or server failure that may succeed on a later attempt.
    Transient,
    /// The `git` program could not be started at all.
    Spawn,
}

/// A repository snapshot could not be acquired.
#[derive(Debug, Error)]
#[error("git clone failed for '{url}': {message}")]
pub struct CloneError {
    /// Classification of the failure.
    pub kind: CloneErrorKind,
    /// The URL that was being cloned.
    pub url: String,
    /// Trimmed diagnostic output from `git clone`.
    pub message: String,
}

impl CloneError {
    /// Returns `true` if the repository is missing or inaccessible.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.kind == CloneErrorKind::NotFound
    }
}

/// An external `git` command could not produce its output.
///
/// Only the command itself failing yields this error. Output that merely
/// fails to parse is skipped and counted instead.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The process could not be spawned.
    #[error("failed to run '{command}': {source}")]
    Spawn {
        /// Short description of the command (e.g. `"git log"`).
        command: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The process exited unsuccessfully.
    #[error("'{command}' exited with {}: {stderr}", code.map_or_else(|| "a signal".to_string(), |c| format!("status {c}")))]
    Failed {
        /// Short description of the command.
        command: String,
        /// Exit code, if the process was not killed by a signal.
        code: Option<i32>,
        /// Trimmed standard error output.
        stderr: String,
    },

    /// The process exceeded its time budget and was killed.
    #[error("'{command}' timed out after {}s", timeout.as_secs())]
    TimedOut {
        /// Short description of the command.
        command: String,
        /// The budget that was exceeded.
        timeout: Duration,
    },

    /// A blocking worker task panicked or was cancelled.
    #[error("worker task failed: {0}")]
    Worker(String),
}

/// Failure of a single analysis section.
///
/// Stage errors never abort an analysis; the orchestrator records them as a
/// skipped section with the error text as the reason.
#[derive(Debug, Error)]
pub enum StageError {
    /// An external command failed.
    #[error(transparent)]
    Command(#[from] CommandError),

    /// The object database could not be read.
    #[error("object database error: {0}")]
    Objects(String),
}

/// Fatal errors returned by [`Analyzer::analyze`](crate::Analyzer::analyze).
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The repository could not be cloned.
    #[error(transparent)]
    Clone(#[from] CloneError),

    /// Cloning did not finish within its budget.
    #[error("git clone timed out after {}s", budget.as_secs())]
    CloneTimeout {
        /// The budget that was exceeded.
        budget: Duration,
    },
}

impl AnalysisError {
    /// Returns `true` if the repository is missing or inaccessible.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Clone(e) if e.is_not_found())
    }

    /// Returns `true` if the clone exceeded its time budget.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::CloneTimeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clone_error_display_starts_with_git_clone_failed() {
        let err = CloneError {
            kind: CloneErrorKind::NotFound,
            url: "https://example.com/a/b.git".into(),
            message: "repository not found".into(),
        };
        assert!(err.to_string().starts_with("git clone failed"));
        assert!(err.is_not_found());
    }

    #[test]
    fn analysis_error_classifies_not_found_and_timeout() {
        let not_found = AnalysisError::from(CloneError {
            kind: CloneErrorKind::NotFound,
            url: "u".into(),
            message: "m".into(),
        });
        let transient = AnalysisError::from(CloneError {
            kind: CloneErrorKind::Transient,
            url: "u".into(),
            message: "m".into(),
        });
        let timeout = AnalysisError::CloneTimeout {
            budget: Duration::from_secs(60),
        };

        assert!(not_found.is_not_found());
        assert!(!transient.is_not_found());
        assert!(timeout.is_timeout());
        assert_eq!(timeout.to_string(), "git clone timed out after 60s");
    }

    #[test]
    fn command_failed_reports_signal_when_code_missing() {
        let err = CommandError::Failed {
            command: "git log".into(),
            code: None,
            stderr: "killed".into(),
        };
        assert_eq!(err.to_string(), "'git log' exited with a signal: killed");
    }
}
