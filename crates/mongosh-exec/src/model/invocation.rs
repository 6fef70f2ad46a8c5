use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::InvocationId;

/// A fully built mongosh command line.
///
/// `argv` is what gets executed. `display` is the credential-redacted form
/// and is only ever written to logs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandInvocation {
    pub id: InvocationId,
    pub argv: Vec<String>,
    pub display: String,
    pub script_file: Option<PathBuf>,
}

impl CommandInvocation {
    /// Program to launch.
    #[must_use]
    pub fn program(&self) -> Option<&str> {
        self.argv.first().map(String::as_str)
    }

    /// Arguments after the program.
    #[must_use]
    pub fn args(&self) -> &[String] {
        self.argv.get(1..).unwrap_or_default()
    }

    #[must_use]
    pub fn script_file(&self) -> Option<&Path> {
        self.script_file.as_deref()
    }

    /// True when the invocation is the `--version` capability probe.
    #[must_use]
    pub fn is_probe(&self) -> bool {
        self.argv.last().map(String::as_str) == Some("--version")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn program_and_args_split_argv() {
        let invocation = CommandInvocation {
            id: InvocationId::new(),
            argv: vec!["mongosh".into(), "--quiet".into(), "--version".into()],
            display: "mongosh --quiet --version".into(),
            script_file: None,
        };
        assert_eq!(invocation.program(), Some("mongosh"));
        assert_eq!(invocation.args(), ["--quiet", "--version"]);
        assert!(invocation.is_probe());
    }

    #[test]
    fn empty_argv_has_no_program() {
        let invocation = CommandInvocation {
            id: InvocationId::new(),
            argv: Vec::new(),
            display: String::new(),
            script_file: None,
        };
        assert_eq!(invocation.program(), None);
        assert!(invocation.args().is_empty());
    }
}
