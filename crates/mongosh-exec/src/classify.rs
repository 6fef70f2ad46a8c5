//! Command construction and result classification strategies.
//!
//! [`ProcessRunner`] is the generic shape of an external command run: build
//! the argv, launch it, and turn the raw result into an outcome. The default
//! classification treats any non-zero exit as a non-fatal outcome.
//! [`MongoshStrategy`] overrides building and classification.

use std::io;
use std::path::Path;
use std::sync::Arc;

use serde_json::json;

use crate::command::CommandBuilder;
use crate::error::{ErrorCode, ExecError, ExecResult};
use crate::launcher::{self, LaunchedProcess};
use crate::messages::{self, MessageBundle};
use crate::model::{CommandInvocation, EffectiveConfig, ExecutionOutcome, ProcessResult, ScriptPayload};
use crate::output;

/// Generic external command run.
pub trait ProcessRunner: Send + Sync {
    /// Build the command line for a payload or an already written script.
    fn build_command(
        &self,
        config: &EffectiveConfig,
        target: Option<&str>,
        payload: Option<&ScriptPayload>,
        script_file: Option<&Path>,
    ) -> ExecResult<CommandInvocation>;

    /// Start the process.
    fn launch(&self, invocation: &CommandInvocation) -> io::Result<LaunchedProcess> {
        launcher::spawn(invocation)
    }

    /// Turn a finished process into an outcome.
    fn classify_result(
        &self,
        _invocation: &CommandInvocation,
        result: &ProcessResult,
        _config: &EffectiveConfig,
    ) -> ExecResult<ExecutionOutcome> {
        Ok(default_classification(result))
    }
}

/// Exit code 0 is success; anything else is a non-fatal [`ExecutionOutcome::NonZeroExit`].
#[must_use]
pub fn default_classification(result: &ProcessResult) -> ExecutionOutcome {
    if result.success() {
        ExecutionOutcome::Success { exit_code: 0 }
    } else {
        ExecutionOutcome::NonZeroExit {
            exit_code: result.exit_code,
            stdout: result.stdout.clone(),
        }
    }
}

/// Map a spawn failure to an error.
///
/// Failures caused by the binary itself (missing, not permitted, or an OS
/// message naming it) become [`ErrorCode::BinaryNotRunnable`] with the
/// bundled remediation text.
pub fn classify_launch_error(
    err: io::Error,
    invocation: &CommandInvocation,
    messages: &dyn MessageBundle,
) -> ExecError {
    let executable = invocation.program().unwrap_or_default();
    let names_binary = !executable.is_empty() && err.to_string().contains(executable);
    let binary_problem = matches!(
        err.kind(),
        io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied
    ) || names_binary;

    if binary_problem {
        let message = messages.message(messages::UNABLE_TO_RUN, &[executable]);
        ExecError::io(ErrorCode::BinaryNotRunnable, message.clone(), err).with_context(json!({
            "executable": executable,
            "fix": message,
        }))
    } else {
        let detail = err.to_string();
        let message = messages.message(messages::LAUNCH_FAILED, &[executable, detail.as_str()]);
        ExecError::io(ErrorCode::Launch, message, err)
    }
}

/// Strategy used for mongosh runs.
#[derive(Clone)]
pub struct MongoshStrategy {
    messages: Arc<dyn MessageBundle>,
}

impl std::fmt::Debug for MongoshStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MongoshStrategy").finish_non_exhaustive()
    }
}

impl MongoshStrategy {
    pub fn new(messages: Arc<dyn MessageBundle>) -> Self {
        Self { messages }
    }
}

impl ProcessRunner for MongoshStrategy {
    fn build_command(
        &self,
        config: &EffectiveConfig,
        target: Option<&str>,
        payload: Option<&ScriptPayload>,
        script_file: Option<&Path>,
    ) -> ExecResult<CommandInvocation> {
        let mut builder = CommandBuilder::new(config);
        if let Some(target) = target {
            builder = builder.target(target);
        }
        if let Some(payload) = payload {
            builder = builder.payload(payload);
        }
        if let Some(path) = script_file {
            builder = builder.script_file(path);
        }
        builder.build()
    }

    /// Routes output first, then fails hard on a non-zero exit that printed
    /// to stdout.
    fn classify_result(
        &self,
        invocation: &CommandInvocation,
        result: &ProcessResult,
        config: &EffectiveConfig,
    ) -> ExecResult<ExecutionOutcome> {
        output::route(&result.stdout, &result.stderr, config, invocation.script_file())?;

        if !result.success() && !result.stdout.is_empty() {
            let code = result.exit_code.to_string();
            let message = self.messages.message(
                messages::NONZERO_EXIT,
                &[invocation.display.as_str(), code.as_str(), result.stdout.as_str()],
            );
            return Err(ExecError::new(ErrorCode::NonZeroExit, message).with_context(json!({
                "exit_code": result.exit_code,
                "stdout": result.stdout,
                "command": invocation.display,
            })));
        }
        Ok(default_classification(result))
    }
}
