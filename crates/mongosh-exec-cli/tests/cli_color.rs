//! Tests for color output flag handling.
// Test module - relaxed lint rules
#![allow(clippy::expect_used)]

use std::process::Command;

fn mongosh_exec_bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_mongosh-exec"))
}

#[test]
fn color_flag_accepts_every_mode() {
    for mode in ["auto", "always", "never"] {
        let output = mongosh_exec_bin()
            .arg(format!("--color={mode}"))
            .arg("--help")
            .output()
            .expect("failed to execute");
        assert!(
            output.status.success(),
            "--color={mode} should be accepted: {}",
            String::from_utf8_lossy(&output.stderr)
        );
    }
}

#[test]
fn color_flag_rejects_invalid() {
    let output = mongosh_exec_bin()
        .arg("--color=invalid")
        .arg("--help")
        .output()
        .expect("failed to execute");
    assert!(!output.status.success());
}

#[test]
fn completions_are_generated() {
    let output = mongosh_exec_bin()
        .args(["completions", "bash"])
        .output()
        .expect("failed to execute");
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("mongosh-exec"));
}
