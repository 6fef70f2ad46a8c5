//! User-facing message lookup.

use std::collections::BTreeMap;

use serde_json::json;

use crate::config::Properties;
use crate::error::{ErrorCode, ExecError, ExecResult};

/// Bundle compiled into the crate.
const BUNDLED: &str = include_str!("../resources/liquibase-mongosh.properties");

pub const UNABLE_TO_RUN: &str = "unable.to.run.mongosh";
pub const TIMEOUT: &str = "mongosh.timeout";
pub const NONZERO_EXIT: &str = "mongosh.nonzero.exit";
pub const LAUNCH_FAILED: &str = "mongosh.launch.failed";

/// Keys a bundle must define to be usable.
pub const REQUIRED_KEYS: [&str; 4] = [UNABLE_TO_RUN, TIMEOUT, NONZERO_EXIT, LAUNCH_FAILED];

/// Key to formatted-string lookup.
pub trait MessageBundle: Send + Sync {
    /// Message for `key` with `{n}` placeholders replaced by `args[n]`.
    fn message(&self, key: &str, args: &[&str]) -> String;
}

/// Messages parsed from properties text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BundledMessages {
    templates: BTreeMap<String, String>,
}

impl BundledMessages {
    /// Load the bundle shipped with the crate.
    pub fn load() -> ExecResult<Self> {
        Self::from_text(BUNDLED)
    }

    /// Parse and validate a bundle.
    pub fn from_text(text: &str) -> ExecResult<Self> {
        let props = Properties::parse(text);
        let missing: Vec<&str> = REQUIRED_KEYS
            .iter()
            .copied()
            .filter(|key| props.get(key).map_or(true, |v| v.trim().is_empty()))
            .collect();
        if !missing.is_empty() {
            return Err(ExecError::new(
                ErrorCode::Messages,
                format!("message bundle is missing keys: {}", missing.join(", ")),
            )
            .with_context(json!({ "missing": missing })));
        }
        Ok(Self {
            templates: props
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        })
    }
}

impl MessageBundle for BundledMessages {
    fn message(&self, key: &str, args: &[&str]) -> String {
        self.templates
            .get(key)
            .map_or_else(|| key.to_string(), |template| format_message(template, args))
    }
}

/// Replace `{n}` with `args[n]` and `''` with `'`. Unknown placeholders are
/// left as written.
#[must_use]
pub fn format_message(template: &str, args: &[&str]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find(['{', '\'']) {
        let (head, tail) = rest.split_at(open);
        out.push_str(head);
        if let Some(after) = tail.strip_prefix("''") {
            out.push('\'');
            rest = after;
            continue;
        }
        if let Some(after) = tail.strip_prefix('\'') {
            out.push('\'');
            rest = after;
            continue;
        }
        let Some(close) = tail.find('}') else {
            out.push_str(tail);
            return out;
        };
        let (placeholder, after) = tail.split_at(close + 1);
        let arg = placeholder
            .trim_start_matches('{')
            .trim_end_matches('}')
            .parse::<usize>()
            .ok()
            .and_then(|idx| args.get(idx));
        match arg {
            Some(arg) => out.push_str(arg),
            None => out.push_str(placeholder),
        }
        rest = after;
    }
    out.push_str(rest);
    out
}
