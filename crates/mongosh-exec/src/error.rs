//! Error types for mongosh execution.
//!
//! Every failure carries a stable [`ErrorCode`], a human readable message and
//! optional JSON context. The code maps to an `E_*` string for `--json`
//! output and to a process exit code for the CLI.

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Result alias used throughout the crate.
pub type ExecResult<T> = Result<T, ExecError>;

/// Stable error classification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    /// A setting could not be parsed.
    Config,
    /// The configured mongosh path does not exist.
    BinaryNotFound,
    /// The configured mongosh path exists but cannot be executed.
    BinaryNotExecutable,
    /// Spawning mongosh failed because the binary could not be run.
    BinaryNotRunnable,
    /// The temporary script file could not be created or written.
    FileCreation,
    /// mongosh did not finish within the configured timeout.
    Timeout,
    /// Spawning or waiting on the process failed for another I/O reason.
    Launch,
    /// mongosh exited non-zero and printed output.
    NonZeroExit,
    /// The command could not be built from the given inputs.
    Precondition,
    /// Message bundle could not be loaded.
    Messages,
    /// Generic I/O failure outside of process launch.
    Io,
}

impl ErrorCode {
    /// Stable string form used in JSON output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Config => "E_CONFIG",
            Self::BinaryNotFound => "E_BINARY_NOT_FOUND",
            Self::BinaryNotExecutable => "E_BINARY_NOT_EXECUTABLE",
            Self::BinaryNotRunnable => "E_BINARY_NOT_RUNNABLE",
            Self::FileCreation => "E_FILE_CREATION",
            Self::Timeout => "E_TIMEOUT",
            Self::Launch => "E_LAUNCH",
            Self::NonZeroExit => "E_NONZERO_EXIT",
            Self::Precondition => "E_PRECONDITION",
            Self::Messages => "E_MESSAGES",
            Self::Io => "E_IO",
        }
    }

    /// Parse the `E_*` string form back into a code.
    #[must_use]
    pub fn parse(code: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.as_str() == code)
    }

    /// Process exit code the CLI uses for this kind of failure.
    #[must_use]
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::Config | Self::Precondition => 2,
            Self::BinaryNotFound | Self::BinaryNotExecutable | Self::BinaryNotRunnable => 3,
            Self::FileCreation | Self::Io => 4,
            Self::Timeout => 5,
            Self::NonZeroExit => 6,
            Self::Launch => 7,
            Self::Messages => 8,
        }
    }

    const ALL: [Self; 11] = [
        Self::Config,
        Self::BinaryNotFound,
        Self::BinaryNotExecutable,
        Self::BinaryNotRunnable,
        Self::FileCreation,
        Self::Timeout,
        Self::Launch,
        Self::NonZeroExit,
        Self::Precondition,
        Self::Messages,
        Self::Io,
    ];
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Serializable error payload for JSON consumers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: String,
    pub message: String,
    pub context: Option<Value>,
}

/// Error raised by configuration, temp-file, command and launch handling.
#[derive(Debug, thiserror::Error)]
#[error("{code}: {message}")]
pub struct ExecError {
    pub code: ErrorCode,
    pub message: String,
    pub context: Option<Value>,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl ExecError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: None,
            source: None,
        }
    }

    #[must_use]
    pub fn with_context(mut self, context: Value) -> Self {
        self.context = Some(context);
        self
    }

    #[must_use]
    pub fn with_source(
        mut self,
        source: impl Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    ) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Invalid or unparseable configuration value.
    pub fn config(message: impl Into<String>, context: impl Into<Option<Value>>) -> Self {
        Self {
            context: context.into(),
            ..Self::new(ErrorCode::Config, message)
        }
    }

    pub fn precondition(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Precondition, message)
    }

    /// Wrap an I/O error under the given code.
    pub fn io(code: ErrorCode, message: impl Into<String>, err: std::io::Error) -> Self {
        let context = serde_json::json!({ "source": err.to_string() });
        Self::new(code, message)
            .with_context(context)
            .with_source(err)
    }

    pub fn file_creation(message: impl Into<String>, err: std::io::Error) -> Self {
        Self::io(ErrorCode::FileCreation, message, err)
    }

    #[must_use]
    pub fn to_error_info(&self) -> ErrorInfo {
        ErrorInfo {
            code: self.code.as_str().to_string(),
            message: self.message.clone(),
            context: self.context.clone(),
        }
    }

    /// Remediation hint carried in the `fix` field of the context, if any.
    #[must_use]
    pub fn fix(&self) -> Option<&str> {
        self.context
            .as_ref()
            .and_then(|ctx| ctx.get("fix"))
            .and_then(Value::as_str)
    }
}

impl Diagnostic for ExecError {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(self.code))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.fix()
            .map(|fix| Box::new(fix) as Box<dyn fmt::Display + 'a>)
    }
}

/// Caller-facing failure for a changeset run through mongosh.
#[derive(Debug, thiserror::Error)]
#[error("Changeset '{id}' by '{author}' failed to deploy with mongosh.")]
pub struct DeployError {
    pub id: String,
    pub author: String,
    #[source]
    pub source: ExecError,
}

impl DeployError {
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        self.source.code
    }

    #[must_use]
    pub fn to_error_info(&self) -> ErrorInfo {
        let mut info = self.source.to_error_info();
        info.message = format!("{self} {}", self.source.message);
        info
    }
}

impl Diagnostic for DeployError {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(self.source.code))
    }

    fn diagnostic_source(&self) -> Option<&dyn Diagnostic> {
        Some(&self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_round_trip_through_string_form() {
        for code in ErrorCode::ALL {
            assert_eq!(ErrorCode::parse(code.as_str()), Some(code));
        }
        assert_eq!(ErrorCode::parse("E_UNKNOWN"), None);
    }

    #[test]
    fn io_error_keeps_source_text_in_context() {
        let err = ExecError::io(
            ErrorCode::Launch,
            "failed to spawn",
            std::io::Error::new(std::io::ErrorKind::Other, "boom"),
        );
        let info = err.to_error_info();
        assert_eq!(info.code, "E_LAUNCH");
        assert_eq!(info.context, Some(serde_json::json!({ "source": "boom" })));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn deploy_error_names_changeset() {
        let err = DeployError {
            id: "1".to_string(),
            author: "alice".to_string(),
            source: ExecError::new(ErrorCode::Timeout, "timed out"),
        };
        assert_eq!(
            err.to_string(),
            "Changeset '1' by 'alice' failed to deploy with mongosh."
        );
        assert_eq!(err.code(), ErrorCode::Timeout);
        assert!(err.to_error_info().message.ends_with("timed out"));
    }
}
