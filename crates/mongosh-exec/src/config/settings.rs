//! Centrally declared settings.
//!
//! The resolver only needs a key/value lookup, expressed as
//! [`SettingsRegistry`]. [`DeclaredSettings`] adds the declared defaults on
//! top of any source, so its current value is never empty for keys that
//! declare one.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::json;

use crate::error::{ExecError, ExecResult};

/// Settings declared under the `liquibase.mongodb` namespace.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SettingKey {
    MongoshPath,
    MongoshTimeoutSeconds,
    MongoshKeepTempFiles,
    MongoshTempFilename,
    MongoshTempDirectory,
    MongoshExtraArgs,
    MongoshLogFile,
    MongoshTempKeep,
    MongoshTempName,
}

impl SettingKey {
    /// Namespace every key is declared under.
    pub const NAMESPACE: &'static str = "liquibase.mongodb";

    pub const ALL: [Self; 9] = [
        Self::MongoshPath,
        Self::MongoshTimeoutSeconds,
        Self::MongoshKeepTempFiles,
        Self::MongoshTempFilename,
        Self::MongoshTempDirectory,
        Self::MongoshExtraArgs,
        Self::MongoshLogFile,
        Self::MongoshTempKeep,
        Self::MongoshTempName,
    ];

    /// Short camel-case name, e.g. `mongoshTimeoutSeconds`.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::MongoshPath => "mongoshPath",
            Self::MongoshTimeoutSeconds => "mongoshTimeoutSeconds",
            Self::MongoshKeepTempFiles => "mongoshKeepTempFiles",
            Self::MongoshTempFilename => "mongoshTempFilename",
            Self::MongoshTempDirectory => "mongoshTempDirectory",
            Self::MongoshExtraArgs => "mongoshExtraArgs",
            Self::MongoshLogFile => "mongoshLogFile",
            Self::MongoshTempKeep => "mongoshTempKeep",
            Self::MongoshTempName => "mongoshTempName",
        }
    }

    /// Fully qualified key, e.g. `liquibase.mongodb.mongoshTimeoutSeconds`.
    #[must_use]
    pub fn full_key(self) -> String {
        format!("{}.{}", Self::NAMESPACE, self.name())
    }

    /// Environment variable, e.g. `LIQUIBASE_MONGODB_MONGOSH_TIMEOUT_SECONDS`.
    #[must_use]
    pub fn env_var(self) -> String {
        let mut var = Self::NAMESPACE.replace('.', "_").to_ascii_uppercase();
        var.push('_');
        for ch in self.name().chars() {
            if ch.is_ascii_uppercase() {
                var.push('_');
            }
            var.push(ch.to_ascii_uppercase());
        }
        var
    }

    /// Short `LIQUIBASE_MONGOSH_*` alias accepted for the same setting.
    #[must_use]
    pub const fn alias_env_var(self) -> Option<&'static str> {
        match self {
            Self::MongoshPath => Some("LIQUIBASE_MONGOSH_PATH"),
            Self::MongoshTimeoutSeconds => Some("LIQUIBASE_MONGOSH_TIMEOUT"),
            Self::MongoshExtraArgs => Some("LIQUIBASE_MONGOSH_ARGS"),
            Self::MongoshLogFile => Some("LIQUIBASE_MONGOSH_LOG_FILE"),
            Self::MongoshTempKeep => Some("LIQUIBASE_MONGOSH_KEEP_TEMP"),
            Self::MongoshTempName => Some("LIQUIBASE_MONGOSH_KEEP_TEMP_NAME"),
            Self::MongoshTempDirectory => Some("LIQUIBASE_MONGOSH_KEEP_TEMP_PATH"),
            Self::MongoshKeepTempFiles | Self::MongoshTempFilename => None,
        }
    }

    /// Default declared alongside the key, if any.
    #[must_use]
    pub fn declared_default(self) -> Option<String> {
        match self {
            Self::MongoshTimeoutSeconds => Some("300".to_string()),
            Self::MongoshKeepTempFiles | Self::MongoshTempKeep => Some("false".to_string()),
            Self::MongoshTempDirectory => Some(std::env::temp_dir().display().to_string()),
            Self::MongoshExtraArgs => Some("--quiet --norc".to_string()),
            Self::MongoshPath
            | Self::MongoshTempFilename
            | Self::MongoshLogFile
            | Self::MongoshTempName => None,
        }
    }

    /// Look a key up by short or fully qualified name, ignoring case.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim();
        let short = name
            .strip_prefix(Self::NAMESPACE)
            .and_then(|rest| rest.strip_prefix('.'))
            .unwrap_or(name);
        Self::ALL
            .iter()
            .copied()
            .find(|key| key.name().eq_ignore_ascii_case(short))
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_key())
    }
}

/// Key/value lookup the resolver reads settings from.
pub trait SettingsRegistry: Send + Sync {
    /// Current value of `key`, or `None` when it has no value.
    fn current_value(&self, key: SettingKey) -> Option<String>;
}

impl<T: SettingsRegistry + ?Sized> SettingsRegistry for &T {
    fn current_value(&self, key: SettingKey) -> Option<String> {
        (**self).current_value(key)
    }
}

impl<T: SettingsRegistry + ?Sized> SettingsRegistry for Box<T> {
    fn current_value(&self, key: SettingKey) -> Option<String> {
        (**self).current_value(key)
    }
}

impl<T: SettingsRegistry + ?Sized> SettingsRegistry for Arc<T> {
    fn current_value(&self, key: SettingKey) -> Option<String> {
        (**self).current_value(key)
    }
}

/// Explicit values, e.g. from `--set key=value`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MapSettings {
    values: BTreeMap<SettingKey, String>,
}

impl MapSettings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: SettingKey, value: impl Into<String>) {
        self.values.insert(key, value.into());
    }

    #[must_use]
    pub fn with(mut self, key: SettingKey, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    /// Parse `key=value` assignments. Keys may be short or fully qualified.
    pub fn from_assignments<I, S>(assignments: I) -> ExecResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut settings = Self::new();
        for assignment in assignments {
            let assignment = assignment.as_ref();
            let Some((name, value)) = assignment.split_once('=') else {
                return Err(ExecError::config(
                    format!("expected key=value, got '{assignment}'"),
                    json!({ "assignment": assignment }),
                ));
            };
            let key = SettingKey::parse(name).ok_or_else(|| {
                ExecError::config(
                    format!("unknown setting '{}'", name.trim()),
                    json!({
                        "key": name.trim(),
                        "fix": format!(
                            "use one of: {}",
                            SettingKey::ALL.map(SettingKey::name).join(", ")
                        ),
                    }),
                )
            })?;
            settings.set(key, value.trim());
        }
        Ok(settings)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl SettingsRegistry for MapSettings {
    fn current_value(&self, key: SettingKey) -> Option<String> {
        self.values.get(&key).cloned()
    }
}

/// Snapshot of environment variables.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EnvSettings {
    vars: BTreeMap<String, String>,
}

impl EnvSettings {
    /// Capture the current process environment, skipping non-UTF-8 entries.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_vars(
            std::env::vars_os()
                .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?))),
        )
    }

    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: vars
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl SettingsRegistry for EnvSettings {
    fn current_value(&self, key: SettingKey) -> Option<String> {
        self.vars
            .get(&key.env_var())
            .or_else(|| key.alias_env_var().and_then(|alias| self.vars.get(alias)))
            .cloned()
    }
}

/// First source with a value wins.
#[derive(Default)]
pub struct LayeredSettings {
    layers: Vec<Box<dyn SettingsRegistry>>,
}

impl LayeredSettings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a lower-priority layer.
    #[must_use]
    pub fn layer(mut self, source: impl SettingsRegistry + 'static) -> Self {
        self.layers.push(Box::new(source));
        self
    }
}

impl fmt::Debug for LayeredSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayeredSettings")
            .field("layers", &self.layers.len())
            .finish()
    }
}

impl SettingsRegistry for LayeredSettings {
    fn current_value(&self, key: SettingKey) -> Option<String> {
        self.layers.iter().find_map(|layer| layer.current_value(key))
    }
}

/// A source with the declared defaults filled in.
#[derive(Clone, Debug, Default)]
pub struct DeclaredSettings<S> {
    source: S,
}

impl<S: SettingsRegistry> DeclaredSettings<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }
}

impl DeclaredSettings<EnvSettings> {
    /// Declared defaults over the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(EnvSettings::from_env())
    }
}

impl<S: SettingsRegistry> SettingsRegistry for DeclaredSettings<S> {
    fn current_value(&self, key: SettingKey) -> Option<String> {
        self.source
            .current_value(key)
            .or_else(|| key.declared_default())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn env_var_names_follow_namespace() {
        assert_eq!(
            SettingKey::MongoshTimeoutSeconds.env_var(),
            "LIQUIBASE_MONGODB_MONGOSH_TIMEOUT_SECONDS"
        );
        assert_eq!(SettingKey::MongoshPath.env_var(), "LIQUIBASE_MONGODB_MONGOSH_PATH");
    }

    #[test]
    fn env_settings_accept_short_aliases() {
        let env = EnvSettings::from_vars([("LIQUIBASE_MONGOSH_TIMEOUT", "12")]);
        assert_eq!(
            env.current_value(SettingKey::MongoshTimeoutSeconds),
            Some("12".to_string())
        );
        let env = EnvSettings::from_vars([
            ("LIQUIBASE_MONGOSH_TIMEOUT", "12"),
            ("LIQUIBASE_MONGODB_MONGOSH_TIMEOUT_SECONDS", "34"),
        ]);
        assert_eq!(
            env.current_value(SettingKey::MongoshTimeoutSeconds),
            Some("34".to_string())
        );
    }

    #[test]
    fn declared_settings_fill_defaults() {
        let settings = DeclaredSettings::new(MapSettings::new());
        assert_eq!(
            settings.current_value(SettingKey::MongoshTimeoutSeconds),
            Some("300".to_string())
        );
        assert_eq!(
            settings.current_value(SettingKey::MongoshExtraArgs),
            Some("--quiet --norc".to_string())
        );
        assert_eq!(settings.current_value(SettingKey::MongoshPath), None);
    }

    #[test]
    fn assignments_parse_short_and_full_keys() {
        let settings = MapSettings::from_assignments([
            "mongoshTimeoutSeconds=5",
            "liquibase.mongodb.mongoshLogFile = /tmp/out.log",
        ])
        .unwrap();
        assert_eq!(
            settings.current_value(SettingKey::MongoshTimeoutSeconds),
            Some("5".to_string())
        );
        assert_eq!(
            settings.current_value(SettingKey::MongoshLogFile),
            Some("/tmp/out.log".to_string())
        );
    }

    #[test]
    fn unknown_assignment_key_is_config_error() {
        let err = MapSettings::from_assignments(["nope=1"]).unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::Config);
        assert!(err.fix().is_some());
    }

    #[test]
    fn layered_settings_prefer_earlier_layers() {
        let settings = LayeredSettings::new()
            .layer(MapSettings::new().with(SettingKey::MongoshPath, "/a"))
            .layer(MapSettings::new().with(SettingKey::MongoshPath, "/b"));
        assert_eq!(settings.current_value(SettingKey::MongoshPath), Some("/a".to_string()));
    }
}
