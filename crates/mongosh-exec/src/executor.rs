//! Changeset-level entry point.

use tracing::{info, warn};

use crate::classify::{MongoshStrategy, ProcessRunner};
use crate::config::{ConfigResolver, SettingsRegistry};
use crate::error::{DeployError, ExecError, ExecResult};
use crate::model::{ExecutionReport, ScriptPayload};
use crate::runner::ScriptRunner;

/// Resolves configuration per call and runs payloads through a
/// [`ScriptRunner`], wrapping failures in [`DeployError`].
pub struct ScriptExecutor<R, P = MongoshStrategy> {
    resolver: ConfigResolver<R>,
    runner: ScriptRunner<P>,
}

impl<R: SettingsRegistry, P: ProcessRunner> ScriptExecutor<R, P> {
    pub fn new(resolver: ConfigResolver<R>, runner: ScriptRunner<P>) -> Self {
        Self { resolver, runner }
    }

    pub fn resolver(&self) -> &ConfigResolver<R> {
        &self.resolver
    }

    pub fn runner(&self) -> &ScriptRunner<P> {
        &self.runner
    }

    /// Run `payload` against `target`.
    ///
    /// Returns `Ok(None)` without launching anything when the payload has no
    /// fragments.
    pub fn execute(
        &self,
        target: &str,
        payload: &ScriptPayload,
    ) -> Result<Option<ExecutionReport>, DeployError> {
        if payload.is_empty() {
            info!("No JavaScript content generated - skipping execution");
            return Ok(None);
        }

        let wrap = |source: ExecError| DeployError {
            id: payload.changeset.id.clone(),
            author: payload.changeset.author.clone(),
            source,
        };
        let config = self.resolver.resolve().map_err(&wrap)?;
        let report = self
            .runner
            .run(&config, Some(target), payload)
            .map_err(|err| {
                warn!(
                    changeset = %payload.changeset.id,
                    code = %err.code,
                    "mongosh run failed"
                );
                wrap(err)
            })?;

        info!(
            "Successfully executed changeset {} by {} via mongosh",
            payload.changeset.id, payload.changeset.author
        );
        Ok(Some(report))
    }

    /// Run `mongosh --version` with the resolved configuration.
    pub fn probe(&self) -> ExecResult<ExecutionReport> {
        let config = self.resolver.resolve()?;
        self.runner.run(&config, None, &ScriptPayload::default())
    }
}
