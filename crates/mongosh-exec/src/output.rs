//! Appends captured mongosh output to the configured log file.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::sync::{Mutex, PoisonError};

use serde_json::json;
use tracing::debug;

use crate::error::{ErrorCode, ExecError, ExecResult};
use crate::model::EffectiveConfig;

/// Serializes appends across concurrent invocations in this process.
static LOG_LOCK: Mutex<()> = Mutex::new(());

/// Append non-empty stdout, then non-empty stderr, to `config.log_file`.
///
/// Does nothing unless both a log file is configured and a script file was
/// used for the invocation.
pub fn route(
    stdout: &str,
    stderr: &str,
    config: &EffectiveConfig,
    script_file: Option<&Path>,
) -> ExecResult<()> {
    let (Some(log_file), Some(_)) = (config.log_file.as_deref(), script_file) else {
        return Ok(());
    };
    let _guard = LOG_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
    for chunk in [stdout, stderr] {
        if chunk.is_empty() {
            continue;
        }
        append(log_file, chunk)?;
    }
    debug!(path = %log_file.display(), "routed mongosh output to log file");
    Ok(())
}

fn append(path: &Path, chunk: &str) -> ExecResult<()> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .and_then(|mut file| file.write_all(chunk.as_bytes()))
        .map_err(|err| {
            ExecError::io(
                ErrorCode::Io,
                format!("failed to append mongosh output to {}", path.display()),
                err,
            )
            .with_context(json!({
                "path": path.display().to_string(),
                "fix": "check liquibase.mongosh.logFile points to a writable file",
            }))
        })
}
