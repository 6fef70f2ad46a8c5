//! mongosh-exec CLI: run migration scripts through the mongosh binary.
//!
//! Thin command-line front end over the `mongosh-exec` library.

// CLI-specific lint allowances (CLI binary, not library)
#![allow(missing_docs)]
#![allow(clippy::print_stdout)] // CLI must print to stdout
#![allow(clippy::print_stderr)] // CLI must print to stderr
#![allow(clippy::exit)] // CLI uses exit codes

use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use miette::{IntoDiagnostic, Result};
use mongosh_exec::cleanup::{self, ExitCleanupGuard};
use mongosh_exec::config::{
    ConfigResolver, DeclaredSettings, EnvSettings, LayeredSettings, MapSettings,
};
use mongosh_exec::model::{ConfigKey, ExecutionOutcome, ExecutionReport};
use mongosh_exec::{
    ChangeSetRef, ErrorCode, ErrorInfo, ExecError, ExecOptions, InterruptSignal, ScriptExecutor,
    ScriptPayload, ScriptRunner,
};
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

mod progress;

use progress::CliProgress;

/// Exit status after a second Ctrl-C.
const INTERRUPTED_EXIT_CODE: i32 = 130;

/// Color output mode
#[derive(Copy, Clone, Debug, Default, ValueEnum)]
enum ColorMode {
    /// Auto-detect based on terminal and `NO_COLOR` env
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

#[derive(Debug, Parser)]
#[command(
    name = "mongosh-exec",
    version,
    about = "Run generated MongoDB migration scripts through mongosh"
)]
struct Cli {
    /// Control color output
    #[arg(long, value_enum, default_value = "auto", global = true)]
    color: ColorMode,

    /// Debug logging and step-by-step progress on stderr
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Args)]
struct ConfigArgs {
    /// Read liquibase.mongosh.conf from this path instead of the working directory
    #[arg(long)]
    conf: Option<PathBuf>,
    /// Override a liquibase.mongodb setting, e.g. --set mongoshTimeoutSeconds=60
    #[arg(long = "set", value_name = "KEY=VALUE")]
    set: Vec<String>,
    /// Ignore LIQUIBASE_* environment variables
    #[arg(long)]
    no_env: bool,
}

#[derive(Debug, Args)]
struct PayloadArgs {
    /// Connection string passed to mongosh
    #[arg(long)]
    target: Option<String>,
    /// Script file whose content becomes one fragment (repeatable)
    #[arg(long = "script", value_name = "FILE")]
    scripts: Vec<PathBuf>,
    /// Inline script fragment (repeatable)
    #[arg(long)]
    eval: Vec<String>,
    /// Changeset id used in file names and messages
    #[arg(long, default_value = "cli")]
    id: String,
    /// Changeset author used in file names and messages
    #[arg(long, default_value = "mongosh-exec")]
    author: String,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the payload through mongosh (or probe `mongosh --version` without one)
    Run {
        #[arg(long)]
        json: bool,
        #[command(flatten)]
        payload: PayloadArgs,
        #[command(flatten)]
        config: ConfigArgs,
    },
    /// Print the effective configuration
    Resolve {
        #[arg(long)]
        json: bool,
        #[command(flatten)]
        config: ConfigArgs,
    },
    /// Print the redacted command line without launching mongosh
    Command {
        #[arg(long)]
        json: bool,
        #[command(flatten)]
        payload: PayloadArgs,
        #[command(flatten)]
        config: ConfigArgs,
    },
    /// Generate shell completions for bash, zsh, or fish
    Completions {
        #[arg(value_enum, help = "Shell to generate completions for")]
        shell: Shell,
    },
}

/// Configure color output based on CLI flag and environment
fn configure_colors(mode: ColorMode) {
    let use_color = match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => {
            if std::env::var("NO_COLOR").is_ok() {
                false
            } else {
                supports_color::on(supports_color::Stream::Stderr).is_some()
            }
        }
    };

    miette::set_hook(Box::new(move |_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .color(use_color)
                .unicode(use_color)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set
}

/// Log to stderr so `--json` output on stdout stays parseable.
fn init_tracing(verbose: bool) {
    let default = if verbose {
        "mongosh_exec=debug"
    } else {
        "mongosh_exec=info"
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_ansi(false),
        )
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    configure_colors(cli.color);
    init_tracing(cli.verbose);
    let _cleanup = ExitCleanupGuard::new();
    match cli.command {
        Commands::Run {
            json,
            payload,
            config,
        } => cmd_run(json, cli.verbose, &payload, &config),
        Commands::Resolve { json, config } => cmd_resolve(json, &config),
        Commands::Command {
            json,
            payload,
            config,
        } => cmd_command(json, &payload, &config),
        Commands::Completions { shell } => cmd_completions(shell),
    }
}

// =============================================================================
// Command Handlers
// =============================================================================

/// Handle the run command.
fn cmd_run(json: bool, verbose: bool, payload_args: &PayloadArgs, config_args: &ConfigArgs) -> Result<()> {
    let resolver = match build_resolver(config_args) {
        Ok(resolver) => resolver,
        Err(err) => return emit_error(json, err.code, &err.to_error_info()),
    };
    let payload = match load_payload(payload_args) {
        Ok(payload) => payload,
        Err(err) => return emit_error(json, err.code, &err.to_error_info()),
    };

    let interrupt = InterruptSignal::new();
    install_ctrlc(interrupt.clone());
    let options = ExecOptions {
        progress: Arc::new(CliProgress::new(verbose)),
        interrupt,
        ..ExecOptions::default()
    };
    let runner = match ScriptRunner::new() {
        Ok(runner) => runner.with_options(options),
        Err(err) => return emit_error(json, err.code, &err.to_error_info()),
    };
    let executor = ScriptExecutor::new(resolver, runner);

    if payload.is_empty() {
        match executor.probe() {
            Ok(report) => emit_report(json, &report),
            Err(err) => emit_error(json, err.code, &err.to_error_info()),
        }
    } else {
        let target = payload_args.target.as_deref().unwrap_or_default();
        match executor.execute(target, &payload) {
            Ok(Some(report)) => emit_report(json, &report),
            Ok(None) => Ok(()),
            Err(err) => emit_error(json, err.code(), &err.to_error_info()),
        }
    }
}

/// Handle the resolve command.
fn cmd_resolve(json: bool, config_args: &ConfigArgs) -> Result<()> {
    let resolved = build_resolver(config_args).and_then(|resolver| resolver.resolve());
    let config = match resolved {
        Ok(config) => config,
        Err(err) => return emit_error(json, err.code, &err.to_error_info()),
    };
    if json {
        let payload = serde_json::to_string(&config).into_diagnostic()?;
        println!("{payload}");
        return Ok(());
    }

    let source = |key: ConfigKey| serde_json::to_string(&config.source_of(key)).unwrap_or_default();
    println!("executable      = {}  {}", config.executable, source(ConfigKey::Executable));
    println!("timeout_seconds = {}  {}", config.timeout_seconds, source(ConfigKey::Timeout));
    println!("keep_temp_file  = {}  {}", config.keep_temp_file, source(ConfigKey::KeepTempFile));
    println!(
        "temp_file_name  = {}  {}",
        config.temp_file_name.as_deref().unwrap_or("-"),
        source(ConfigKey::TempFileName)
    );
    println!(
        "temp_directory  = {}  {}",
        display_opt(config.temp_directory.as_ref()),
        source(ConfigKey::TempDirectory)
    );
    println!(
        "extra_args      = {}  {}",
        config.extra_args.join(" "),
        source(ConfigKey::ExtraArgs)
    );
    println!(
        "log_file        = {}  {}",
        display_opt(config.log_file.as_ref()),
        source(ConfigKey::LogFile)
    );
    Ok(())
}

/// Handle the command (dry run) command.
fn cmd_command(json: bool, payload_args: &PayloadArgs, config_args: &ConfigArgs) -> Result<()> {
    let prepared = build_resolver(config_args)
        .and_then(|resolver| resolver.resolve())
        .and_then(|mut config| {
            config.keep_temp_file = false;
            let payload = load_payload(payload_args)?;
            let runner = ScriptRunner::new()?;
            runner.prepare(&config, payload_args.target.as_deref(), &payload)
        });
    let invocation = match prepared {
        Ok(invocation) => invocation,
        Err(err) => return emit_error(json, err.code, &err.to_error_info()),
    };
    if json {
        let payload = serde_json::json!({
            "invocation_id": invocation.id,
            "command_line": invocation.display,
            "probe": invocation.is_probe(),
        });
        println!("{payload}");
    } else {
        println!("{}", invocation.display);
    }
    if let Some(path) = invocation.script_file() {
        if let Err(err) = std::fs::remove_file(path) {
            tracing::debug!(path = %path.display(), %err, "dry-run script not removed");
        }
        cleanup::forget(path);
    }
    Ok(())
}

/// Handle the completions command.
fn cmd_completions(shell: Shell) -> Result<()> {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut io::stdout());
    Ok(())
}

// =============================================================================
// Helpers
// =============================================================================

fn build_resolver(
    args: &ConfigArgs,
) -> Result<ConfigResolver<DeclaredSettings<LayeredSettings>>, ExecError> {
    let mut layers = LayeredSettings::new().layer(MapSettings::from_assignments(&args.set)?);
    if !args.no_env {
        layers = layers.layer(EnvSettings::from_env());
    }
    let resolver = ConfigResolver::new(DeclaredSettings::new(layers));
    Ok(match &args.conf {
        Some(path) => resolver.with_conf_file(path),
        None => resolver,
    })
}

/// Script files first, then inline fragments, in flag order.
fn load_payload(args: &PayloadArgs) -> Result<ScriptPayload, ExecError> {
    let mut fragments = Vec::with_capacity(args.scripts.len() + args.eval.len());
    for path in &args.scripts {
        let text = std::fs::read_to_string(path).map_err(|err| {
            ExecError::io(
                ErrorCode::Io,
                format!("failed to read script {}", path.display()),
                err,
            )
        })?;
        fragments.push(text);
    }
    fragments.extend(args.eval.iter().cloned());
    Ok(ScriptPayload::new(
        ChangeSetRef::new(args.id.clone(), args.author.clone()),
        fragments,
    ))
}

fn install_ctrlc(interrupt: InterruptSignal) {
    let presses = AtomicUsize::new(0);
    let result = ctrlc::set_handler(move || {
        if presses.fetch_add(1, Ordering::SeqCst) == 0 {
            interrupt.raise();
        } else {
            cleanup::run_exit_cleanup();
            std::process::exit(INTERRUPTED_EXIT_CODE);
        }
    });
    if let Err(err) = result {
        tracing::debug!(%err, "Ctrl-C handler not installed");
    }
}

fn display_opt(path: Option<&PathBuf>) -> String {
    path.map_or_else(|| "-".to_string(), |p| p.display().to_string())
}

fn emit_report(json: bool, report: &ExecutionReport) -> Result<()> {
    if json {
        let payload = serde_json::to_string(report).into_diagnostic()?;
        println!("{payload}");
    } else {
        match &report.outcome {
            ExecutionOutcome::Success { .. } => eprintln!("mongosh completed successfully"),
            ExecutionOutcome::NonZeroExit { exit_code, .. } => {
                eprintln!("mongosh exited with code {exit_code} and no output");
            }
            other => eprintln!("mongosh finished: {other:?}"),
        }
        if let Some(path) = &report.script_file {
            eprintln!("script kept at {}", path.display());
        }
    }
    Ok(())
}

fn emit_error(json: bool, code: ErrorCode, info: &ErrorInfo) -> Result<()> {
    if json {
        let payload = serde_json::to_string(info).into_diagnostic()?;
        println!("{payload}");
    } else {
        eprintln!("error: {}", info.message);
        if let Some(fix) = info
            .context
            .as_ref()
            .and_then(|ctx| ctx.get("fix"))
            .and_then(serde_json::Value::as_str)
        {
            eprintln!("help: {fix}");
        }
    }
    cleanup::run_exit_cleanup();
    std::process::exit(code.exit_code());
}
