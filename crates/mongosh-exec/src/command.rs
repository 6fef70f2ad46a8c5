//! Assembles the mongosh argv and its redacted display form.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use serde_json::json;
use tracing::info;

use crate::error::{ExecError, ExecResult};
use crate::model::{CommandInvocation, EffectiveConfig, InvocationId, ScriptPayload};

/// Replacement for `user:password` in logged connection strings.
pub const REDACTED: &str = "<redacted>";

fn credentials_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"://[^\s/@:]*:[^\s/]*@").ok())
        .as_ref()
}

/// Replace `://user:password@` with `://<redacted>@`.
///
/// If the pattern is unavailable the whole line is withheld.
#[must_use]
pub fn redact_credentials(line: &str) -> String {
    match credentials_pattern() {
        Some(pattern) => pattern
            .replace_all(line, format!("://{REDACTED}@").as_str())
            .into_owned(),
        None => format!("{REDACTED} command line"),
    }
}

/// What mongosh should run.
#[derive(Clone, Copy, Debug)]
pub enum ScriptSource<'a> {
    /// `--file <path>`.
    File(&'a Path),
    /// `--eval <fragment>`; the payload must hold exactly one fragment.
    Inline(&'a ScriptPayload),
    /// `--version`, with no connection target.
    Probe,
}

/// Builds a [`CommandInvocation`] from an effective configuration.
#[derive(Clone, Debug)]
pub struct CommandBuilder<'a> {
    config: &'a EffectiveConfig,
    target: Option<String>,
    payload: Option<&'a ScriptPayload>,
    script_file: Option<PathBuf>,
}

impl<'a> CommandBuilder<'a> {
    #[must_use]
    pub fn new(config: &'a EffectiveConfig) -> Self {
        Self {
            config,
            target: None,
            payload: None,
            script_file: None,
        }
    }

    /// Connection string passed as the first positional argument.
    #[must_use]
    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    #[must_use]
    pub fn payload(mut self, payload: &'a ScriptPayload) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Script file to run; takes precedence over inline evaluation.
    #[must_use]
    pub fn script_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.script_file = Some(path.into());
        self
    }

    pub fn build(&self) -> ExecResult<CommandInvocation> {
        let source = match (&self.script_file, self.payload) {
            (Some(path), _) => ScriptSource::File(path),
            (None, Some(payload)) if !payload.is_empty() => ScriptSource::Inline(payload),
            (None, _) => ScriptSource::Probe,
        };
        build_command(self.config, self.target.as_deref(), source)
    }
}

/// `[executable, ...extra_args, target, --file path | --eval fragment]`, or
/// `[executable, ...extra_args, --version]` for a probe.
pub fn build_command(
    config: &EffectiveConfig,
    target: Option<&str>,
    source: ScriptSource<'_>,
) -> ExecResult<CommandInvocation> {
    let mut argv = Vec::with_capacity(config.extra_args.len() + 4);
    argv.push(config.executable.clone());
    argv.extend(config.extra_args.iter().cloned());

    let mut script_file = None;
    match source {
        ScriptSource::Probe => argv.push("--version".to_string()),
        ScriptSource::File(path) => {
            argv.push(require_target(target)?);
            argv.push("--file".to_string());
            argv.push(path.display().to_string());
            script_file = Some(path.to_path_buf());
        }
        ScriptSource::Inline(payload) => {
            let fragment = match payload.fragments.as_slice() {
                [single] => single.clone(),
                fragments => {
                    return Err(ExecError::precondition(format!(
                        "--eval takes exactly one script fragment, got {}",
                        fragments.len()
                    ))
                    .with_context(json!({
                        "fragments": fragments.len(),
                        "fix": "write the payload to a script file and use --file",
                    })));
                }
            };
            argv.push(require_target(target)?);
            argv.push("--eval".to_string());
            argv.push(fragment);
        }
    }

    let display_line = redact_credentials(&argv.join(" "));
    info!("mongosh command:\n{display_line}");
    Ok(CommandInvocation {
        id: InvocationId::new(),
        argv,
        display: display_line,
        script_file,
    })
}

fn require_target(target: Option<&str>) -> ExecResult<String> {
    target
        .filter(|t| !t.trim().is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            ExecError::precondition("a connection target is required to run a script")
                .with_context(json!({ "fix": "pass a mongodb:// connection string" }))
        })
}
