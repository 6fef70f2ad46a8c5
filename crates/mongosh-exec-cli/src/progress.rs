//! Stderr progress output using indicatif.

use indicatif::{ProgressBar, ProgressStyle};
use mongosh_exec::progress::{ProgressCallback, ProgressEvent};
use std::io::Write;
use std::sync::Mutex;
use std::time::Duration;

/// Progress callback for the CLI.
///
/// Warnings are always written to stderr; everything else only with
/// `--verbose`.
pub struct CliProgress {
    verbose: bool,
    spinner: Mutex<Option<ProgressBar>>,
}

impl CliProgress {
    pub fn new(verbose: bool) -> Self {
        Self {
            verbose,
            spinner: Mutex::new(None),
        }
    }

    fn start_spinner(&self, message: String) {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} [{elapsed_precise}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(message);
        pb.enable_steady_tick(Duration::from_millis(100));
        if let Ok(mut spinner) = self.spinner.lock() {
            if let Some(old) = spinner.replace(pb) {
                old.finish_and_clear();
            }
        }
    }

    fn set_spinner_message(&self, message: String) {
        if let Ok(spinner) = self.spinner.lock() {
            if let Some(pb) = spinner.as_ref() {
                pb.set_message(message);
            }
        }
    }

    fn clear_spinner(&self) {
        if let Ok(mut spinner) = self.spinner.lock() {
            if let Some(pb) = spinner.take() {
                pb.finish_and_clear();
            }
        }
    }
}

impl ProgressCallback for CliProgress {
    fn on_progress(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::ScriptCreated { path, .. } => {
                if self.verbose {
                    let _ = writeln!(std::io::stderr(), "script written: {path}");
                }
            }
            ProgressEvent::Started {
                invocation_id,
                command_line,
                pid,
            } => {
                if self.verbose {
                    let _ = writeln!(std::io::stderr(), "invocation {invocation_id} (pid {pid})");
                    self.start_spinner(command_line.clone());
                }
            }
            ProgressEvent::Exited {
                exit_code,
                duration_ms,
                ..
            } => {
                self.clear_spinner();
                if self.verbose {
                    let icon = if *exit_code == 0 {
                        "\x1b[32m✓\x1b[0m"
                    } else {
                        "\x1b[31m✗\x1b[0m"
                    };
                    let _ = writeln!(
                        std::io::stderr(),
                        "  {icon} mongosh exited with {exit_code} ({duration_ms}ms)"
                    );
                }
            }
            ProgressEvent::GraceWait { grace_ms, .. } => {
                if self.verbose {
                    self.set_spinner_message(format!(
                        "timed out, waiting {grace_ms}ms before giving up"
                    ));
                }
            }
            ProgressEvent::Warning { message, .. } => {
                self.clear_spinner();
                let _ = writeln!(std::io::stderr(), "{}", message.trim_end());
            }
        }
    }
}
