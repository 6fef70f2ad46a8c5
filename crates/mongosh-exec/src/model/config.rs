use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use super::DEFAULT_EXECUTABLE;

/// Timeout applied to a single invocation when neither the project file nor
/// the settings registry supply one.
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 1800;

/// A setting the resolver decides on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigKey {
    Executable,
    Timeout,
    KeepTempFile,
    TempFileName,
    TempDirectory,
    ExtraArgs,
    LogFile,
}

/// Where a resolved value came from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ConfigSource {
    /// Compiled-in default.
    Default,
    /// The project configuration file.
    ProjectFile { path: PathBuf },
    /// The settings registry (explicit value or declared default).
    Registry { key: String },
}

/// Fully resolved parameters for one mongosh invocation.
///
/// Produced by [`crate::config::ConfigResolver::resolve`] and treated as
/// immutable afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectiveConfig {
    /// Program to launch: the canonical override path, or `mongosh`.
    pub executable: String,
    /// Validated override path, when one was configured.
    pub executable_override: Option<PathBuf>,
    pub timeout_seconds: u64,
    pub keep_temp_file: bool,
    pub temp_file_name: Option<String>,
    pub temp_directory: Option<PathBuf>,
    pub extra_args: Vec<String>,
    pub log_file: Option<PathBuf>,
    /// Provenance of each key that was not left at its compiled default.
    #[serde(default)]
    pub sources: BTreeMap<ConfigKey, ConfigSource>,
}

impl Default for EffectiveConfig {
    fn default() -> Self {
        Self {
            executable: DEFAULT_EXECUTABLE.to_string(),
            executable_override: None,
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            keep_temp_file: false,
            temp_file_name: None,
            temp_directory: None,
            extra_args: Vec::new(),
            log_file: None,
            sources: BTreeMap::new(),
        }
    }
}

impl EffectiveConfig {
    /// Source of a key, falling back to [`ConfigSource::Default`].
    #[must_use]
    pub fn source_of(&self, key: ConfigKey) -> ConfigSource {
        self.sources.get(&key).cloned().unwrap_or(ConfigSource::Default)
    }
}

/// Fluent builder for [`EffectiveConfig`], mostly useful for callers that
/// bypass file/registry resolution.
///
/// ```
/// use mongosh_exec::model::EffectiveConfigBuilder;
///
/// let config = EffectiveConfigBuilder::new()
///     .timeout_seconds(60)
///     .extra_args(["--quiet", "--norc"])
///     .build();
/// assert_eq!(config.extra_args.len(), 2);
/// ```
#[derive(Clone, Debug, Default)]
pub struct EffectiveConfigBuilder {
    config: EffectiveConfig,
}

impl EffectiveConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Launch this program instead of `mongosh` from `PATH`.
    ///
    /// No existence check is made here; use the resolver for validation.
    #[must_use]
    pub fn executable(mut self, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        self.config.executable = path.display().to_string();
        self.config.executable_override = Some(path);
        self
    }

    #[must_use]
    pub fn timeout_seconds(mut self, seconds: u64) -> Self {
        self.config.timeout_seconds = seconds;
        self
    }

    #[must_use]
    pub fn keep_temp_file(mut self, keep: bool) -> Self {
        self.config.keep_temp_file = keep;
        self
    }

    #[must_use]
    pub fn temp_file_name(mut self, name: impl Into<String>) -> Self {
        self.config.temp_file_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn temp_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.temp_directory = Some(dir.into());
        self
    }

    #[must_use]
    pub fn extra_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.extra_args = args.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.log_file = Some(path.into());
        self
    }

    #[must_use]
    pub fn build(self) -> EffectiveConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_uses_path_lookup_and_long_timeout() {
        let config = EffectiveConfig::default();
        assert_eq!(config.executable, "mongosh");
        assert_eq!(config.timeout_seconds, 1800);
        assert_eq!(config.source_of(ConfigKey::Timeout), ConfigSource::Default);
    }

    #[test]
    fn builder_sets_override_and_display_executable() {
        let config = EffectiveConfigBuilder::new()
            .executable("/opt/mongosh/bin/mongosh")
            .build();
        assert_eq!(config.executable, "/opt/mongosh/bin/mongosh");
        assert_eq!(
            config.executable_override,
            Some(PathBuf::from("/opt/mongosh/bin/mongosh"))
        );
    }
}
