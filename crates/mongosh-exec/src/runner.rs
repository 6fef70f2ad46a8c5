//! Runs one mongosh invocation end to end.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tracing::{debug, info, warn};

use crate::classify::{classify_launch_error, MongoshStrategy, ProcessRunner};
use crate::error::{ErrorCode, ExecError, ExecResult};
use crate::interrupt::{InterruptSignal, SleepOutcome};
use crate::launcher::{WaitResult, DEFAULT_GRACE_PERIOD};
use crate::messages::{self, BundledMessages, MessageBundle};
use crate::model::{
    CommandInvocation, EffectiveConfig, ExecutionOutcome, ExecutionReport, InvocationId,
    InvocationState, ProcessResult, ScriptPayload,
};
use crate::progress::{NoopProgress, ProgressCallback, ProgressEvent};
use crate::script_file::{create_script_file, ScriptFileRequest};

/// Knobs for a [`ScriptRunner`].
#[derive(Clone)]
pub struct ExecOptions {
    pub progress: Arc<dyn ProgressCallback>,
    /// Cancels the grace wait when raised.
    pub interrupt: InterruptSignal,
    /// Wait applied after a timeout before the process is abandoned.
    pub grace_period: Duration,
}

impl Default for ExecOptions {
    fn default() -> Self {
        Self {
            progress: Arc::new(NoopProgress),
            interrupt: InterruptSignal::new(),
            grace_period: DEFAULT_GRACE_PERIOD,
        }
    }
}

impl std::fmt::Debug for ExecOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecOptions")
            .field("interrupt", &self.interrupt)
            .field("grace_period", &self.grace_period)
            .finish_non_exhaustive()
    }
}

/// Tracks the lifecycle of one invocation.
#[derive(Debug)]
struct StateTracker {
    id: InvocationId,
    state: InvocationState,
}

impl StateTracker {
    fn new(id: InvocationId) -> Self {
        Self {
            id,
            state: InvocationState::NotStarted,
        }
    }

    fn advance(&mut self, next: InvocationState) {
        if self.state.can_transition_to(next) {
            debug!(invocation_id = %self.id, from = ?self.state, to = ?next, "invocation state");
            self.state = next;
        } else {
            warn!(invocation_id = %self.id, from = ?self.state, to = ?next, "ignored invalid state change");
        }
    }
}

/// Writes the script file, builds the command and executes it.
pub struct ScriptRunner<P = MongoshStrategy> {
    strategy: P,
    messages: Arc<dyn MessageBundle>,
    options: ExecOptions,
}

impl ScriptRunner<MongoshStrategy> {
    /// Runner with the bundled messages and default options.
    pub fn new() -> ExecResult<Self> {
        let messages: Arc<dyn MessageBundle> = Arc::new(BundledMessages::load()?);
        Ok(Self::with_strategy(
            MongoshStrategy::new(Arc::clone(&messages)),
            messages,
        ))
    }
}

impl<P: ProcessRunner> ScriptRunner<P> {
    pub fn with_strategy(strategy: P, messages: Arc<dyn MessageBundle>) -> Self {
        Self {
            strategy,
            messages,
            options: ExecOptions::default(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: ExecOptions) -> Self {
        self.options = options;
        self
    }

    pub fn strategy(&self) -> &P {
        &self.strategy
    }

    /// Write the script file (for a non-empty payload) and build the command.
    pub fn prepare(
        &self,
        config: &EffectiveConfig,
        target: Option<&str>,
        payload: &ScriptPayload,
    ) -> ExecResult<CommandInvocation> {
        let script = if payload.is_empty() {
            None
        } else {
            info!("Creating the mongosh run script");
            Some(create_script_file(payload, &ScriptFileRequest::from_config(config))?)
        };
        let invocation = self.strategy.build_command(
            config,
            target,
            Some(payload),
            script.as_ref().map(|s| s.path()),
        )?;
        if let Some(script) = &script {
            self.options.progress.on_progress(&ProgressEvent::ScriptCreated {
                invocation_id: invocation.id,
                path: script.path().display().to_string(),
            });
        }
        Ok(invocation)
    }

    /// [`prepare`](Self::prepare) then [`execute`](Self::execute).
    pub fn run(
        &self,
        config: &EffectiveConfig,
        target: Option<&str>,
        payload: &ScriptPayload,
    ) -> ExecResult<ExecutionReport> {
        let invocation = self.prepare(config, target, payload)?;
        self.execute(invocation, config)
    }

    /// Launch `invocation` and wait up to `config.timeout_seconds`.
    ///
    /// The invocation is consumed, so it runs at most once.
    pub fn execute(
        &self,
        invocation: CommandInvocation,
        config: &EffectiveConfig,
    ) -> ExecResult<ExecutionReport> {
        let mut tracker = StateTracker::new(invocation.id);
        let result = self.execute_tracked(&invocation, config, &mut tracker);
        self.log_retained_script(&invocation, config);
        let outcome = result?;
        Ok(ExecutionReport {
            invocation_id: invocation.id,
            outcome,
            command_line: invocation.display.clone(),
            script_file: invocation
                .script_file
                .clone()
                .filter(|_| config.keep_temp_file),
            state: tracker.state,
        })
    }

    fn execute_tracked(
        &self,
        invocation: &CommandInvocation,
        config: &EffectiveConfig,
        tracker: &mut StateTracker,
    ) -> ExecResult<ExecutionOutcome> {
        let process = match self.strategy.launch(invocation) {
            Ok(process) => process,
            Err(err) => {
                tracker.advance(InvocationState::LaunchFailed);
                let cause = err.to_string();
                let err = classify_launch_error(err, invocation, self.messages.as_ref());
                warn!(invocation_id = %invocation.id, %cause, "failed to launch mongosh");
                return Err(attach_outcome(err, &ExecutionOutcome::LaunchFailure { cause }));
            }
        };
        tracker.advance(InvocationState::Running);
        self.options.progress.on_progress(&ProgressEvent::Started {
            invocation_id: invocation.id,
            command_line: invocation.display.clone(),
            pid: process.pid(),
        });

        let timeout = Duration::from_secs(config.timeout_seconds);
        let waited = process.wait(timeout).map_err(|err| {
            tracker.advance(InvocationState::LaunchFailed);
            ExecError::io(ErrorCode::Launch, "failed while waiting for mongosh", err)
        })?;

        match waited {
            WaitResult::Exited { result, elapsed } => {
                self.options.progress.on_progress(&ProgressEvent::Exited {
                    invocation_id: invocation.id,
                    exit_code: result.exit_code,
                    duration_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                });
                match self.strategy.classify_result(invocation, &result, config) {
                    Ok(outcome) => {
                        tracker.advance(InvocationState::for_outcome(&outcome));
                        Ok(outcome)
                    }
                    Err(err) => {
                        tracker.advance(if result.success() {
                            InvocationState::Succeeded
                        } else {
                            InvocationState::FailedNonZero
                        });
                        Err(err)
                    }
                }
            }
            WaitResult::TimedOut(process) => {
                tracker.advance(InvocationState::GraceWait);
                self.grace_wait(invocation);
                process.terminate();
                self.strategy
                    .classify_result(invocation, &ProcessResult::abandoned(), config)?;
                tracker.advance(InvocationState::TimedOut);
                Err(self.timeout_error(invocation, config.timeout_seconds))
            }
        }
    }

    fn grace_wait(&self, invocation: &CommandInvocation) {
        let grace = self.options.grace_period;
        self.options.progress.on_progress(&ProgressEvent::GraceWait {
            invocation_id: invocation.id,
            grace_ms: u64::try_from(grace.as_millis()).unwrap_or(u64::MAX),
        });
        debug!(invocation_id = %invocation.id, ?grace, "mongosh timed out, waiting grace period");
        if self.options.interrupt.sleep(grace) == SleepOutcome::Interrupted {
            debug!(invocation_id = %invocation.id, "grace wait interrupted");
            self.options.interrupt.raise();
        }
    }

    fn timeout_error(&self, invocation: &CommandInvocation, timeout_seconds: u64) -> ExecError {
        let seconds = timeout_seconds.to_string();
        let message = self.messages.message(messages::TIMEOUT, &[seconds.as_str()]);
        self.options.progress.on_progress(&ProgressEvent::Warning {
            invocation_id: invocation.id,
            message: format!("WARNING: {message}"),
        });
        warn!(invocation_id = %invocation.id, "{message}");
        let err = ExecError::new(ErrorCode::Timeout, message).with_context(json!({
            "timeout_seconds": timeout_seconds,
            "command": invocation.display,
            "fix": "raise liquibase.mongosh.timeout or LIQUIBASE_MONGOSH_TIMEOUT",
        }));
        attach_outcome(
            err,
            &ExecutionOutcome::Timeout {
                elapsed_seconds: timeout_seconds,
            },
        )
    }

    fn log_retained_script(&self, invocation: &CommandInvocation, config: &EffectiveConfig) {
        if !config.keep_temp_file {
            return;
        }
        if let Some(path) = invocation.script_file().filter(|p| p.exists()) {
            info!("Mongosh run script can be located at: {}", path.display());
        }
    }
}

/// Record the outcome in the error context so JSON consumers can see it.
fn attach_outcome(mut err: ExecError, outcome: &ExecutionOutcome) -> ExecError {
    let outcome = serde_json::to_value(outcome).unwrap_or_default();
    match err.context.as_mut().and_then(serde_json::Value::as_object_mut) {
        Some(ctx) => {
            ctx.insert("outcome".to_string(), outcome);
        }
        None => err.context = Some(json!({ "outcome": outcome })),
    }
    err
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_wait_the_full_grace_period() {
        let options = ExecOptions::default();
        assert_eq!(options.grace_period, Duration::from_secs(10));
        assert!(!options.interrupt.is_raised());
    }
}
