use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::InvocationId;

/// Raw result of a finished (or abandoned) process.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessResult {
    /// Exit status; signal-terminated processes report `-1`.
    pub exit_code: i32,
    /// Captured standard output, lossily decoded.
    pub stdout: String,
    /// Captured standard error, lossily decoded.
    pub stderr: String,
}

impl ProcessResult {
    /// Result handed to the classifier after a timeout: exit code 0 and no
    /// output.
    #[must_use]
    pub fn abandoned() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// How an invocation ended.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum ExecutionOutcome {
    /// Process exited with status 0.
    Success {
        /// Always 0.
        exit_code: i32,
    },
    /// Process exited non-zero without printing anything to stdout.
    NonZeroExit {
        /// Exit status.
        exit_code: i32,
        /// Captured stdout (empty when the outcome is non-fatal).
        stdout: String,
    },
    /// Process exceeded its timeout and was abandoned.
    Timeout {
        /// Seconds waited before giving up, excluding the grace period.
        elapsed_seconds: u64,
    },
    /// Process could not be started.
    LaunchFailure {
        /// Error text reported by the OS.
        cause: String,
    },
}

impl ExecutionOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    #[must_use]
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::Success { exit_code } | Self::NonZeroExit { exit_code, .. } => Some(*exit_code),
            Self::Timeout { .. } | Self::LaunchFailure { .. } => None,
        }
    }
}

/// Lifecycle of a single invocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvocationState {
    /// Built but not launched.
    NotStarted,
    /// Spawned and being awaited.
    Running,
    /// Timed out; sleeping through the grace period.
    GraceWait,
    Succeeded,
    FailedNonZero,
    TimedOut,
    LaunchFailed,
}

impl InvocationState {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Succeeded | Self::FailedNonZero | Self::TimedOut | Self::LaunchFailed
        )
    }

    /// Whether `self -> next` is a legal step.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::NotStarted, Self::Running | Self::LaunchFailed)
                | (
                    Self::Running,
                    Self::Succeeded | Self::FailedNonZero | Self::GraceWait | Self::LaunchFailed
                )
                | (Self::GraceWait, Self::TimedOut)
        )
    }

    /// Terminal state matching an outcome.
    #[must_use]
    pub fn for_outcome(outcome: &ExecutionOutcome) -> Self {
        match outcome {
            ExecutionOutcome::Success { .. } => Self::Succeeded,
            ExecutionOutcome::NonZeroExit { .. } => Self::FailedNonZero,
            ExecutionOutcome::Timeout { .. } => Self::TimedOut,
            ExecutionOutcome::LaunchFailure { .. } => Self::LaunchFailed,
        }
    }
}

/// What the runner hands back for a completed invocation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub invocation_id: InvocationId,
    pub outcome: ExecutionOutcome,
    /// Redacted command line that was executed.
    pub command_line: String,
    /// Script file, when one was used and retained.
    pub script_file: Option<PathBuf>,
    pub state: InvocationState,
}
