//! mongosh-exec: run generated migration scripts through the external
//! `mongosh` binary.
//!
//! Resolves how the binary is invoked, writes the script to a temporary file,
//! builds a command line whose logged form has credentials redacted, runs the
//! process under a timeout with a grace wait, and classifies the result.

#![forbid(unsafe_code)]
// Public API types have docs; internal helpers are documented where useful.
#![allow(missing_docs)]

pub mod classify;
pub mod cleanup;
pub mod command;
pub mod config;
pub mod error;
pub mod executor;
pub mod interrupt;
pub mod launcher;
pub mod messages;
pub mod model;
pub mod output;
pub mod progress;
pub mod runner;
pub mod script_file;

pub use crate::classify::{MongoshStrategy, ProcessRunner};
pub use crate::config::{ConfigResolver, DeclaredSettings, EnvSettings, MapSettings, SettingKey};
pub use crate::error::{DeployError, ErrorCode, ErrorInfo, ExecError, ExecResult};
pub use crate::executor::ScriptExecutor;
pub use crate::interrupt::InterruptSignal;
pub use crate::model::*;
pub use crate::runner::{ExecOptions, ScriptRunner};
