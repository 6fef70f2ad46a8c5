//! Effective configuration resolution.
//!
//! Each key is decided independently: a value from `liquibase.mongosh.conf`
//! is a candidate, replaced by the settings registry whenever the registry
//! has a value. Because the registry reports its declared defaults, keys
//! with a default (timeout, extra args, keep-temp, temp directory) are always
//! decided by the registry.

pub mod properties;
pub mod settings;

use std::path::{Path, PathBuf};

use serde_json::json;
use tracing::{debug, info};

use crate::error::{ErrorCode, ExecError, ExecResult};
use crate::model::{
    ConfigKey, ConfigSource, EffectiveConfig, DEFAULT_EXECUTABLE, PROJECT_CONF_FILE,
    PROJECT_CONF_NAMESPACE,
};
pub use properties::Properties;
pub use settings::{
    DeclaredSettings, EnvSettings, LayeredSettings, MapSettings, SettingKey, SettingsRegistry,
};

/// Project file suffix for each resolved key.
const FILE_KEYS: [(ConfigKey, &str); 7] = [
    (ConfigKey::KeepTempFile, "keep.temp"),
    (ConfigKey::TempFileName, "keep.temp.name"),
    (ConfigKey::TempDirectory, "keep.temp.path"),
    (ConfigKey::LogFile, "logFile"),
    (ConfigKey::Executable, "path"),
    (ConfigKey::Timeout, "timeout"),
    (ConfigKey::ExtraArgs, "args"),
];

/// Registry setting that overrides each resolved key.
const REGISTRY_KEYS: [(ConfigKey, SettingKey); 7] = [
    (ConfigKey::KeepTempFile, SettingKey::MongoshTempKeep),
    (ConfigKey::TempFileName, SettingKey::MongoshTempName),
    (ConfigKey::TempDirectory, SettingKey::MongoshTempDirectory),
    (ConfigKey::LogFile, SettingKey::MongoshLogFile),
    (ConfigKey::Executable, SettingKey::MongoshPath),
    (ConfigKey::Timeout, SettingKey::MongoshTimeoutSeconds),
    (ConfigKey::ExtraArgs, SettingKey::MongoshExtraArgs),
];

/// Fully qualified project-file key, e.g. `liquibase.mongosh.timeout`.
#[must_use]
pub fn project_key(suffix: &str) -> String {
    format!("{PROJECT_CONF_NAMESPACE}.{suffix}")
}

/// Merges the project file, a settings registry and compiled defaults.
#[derive(Clone, Debug)]
pub struct ConfigResolver<R> {
    conf_file: Option<PathBuf>,
    search_dirs: Vec<PathBuf>,
    registry: R,
}

impl ConfigResolver<DeclaredSettings<EnvSettings>> {
    /// Resolver over the process environment, searching the working
    /// directory for the project file.
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(DeclaredSettings::from_env())
    }
}

impl<R: SettingsRegistry> ConfigResolver<R> {
    pub fn new(registry: R) -> Self {
        Self {
            conf_file: None,
            search_dirs: vec![PathBuf::from(".")],
            registry,
        }
    }

    /// Read the project file from this exact path instead of searching.
    #[must_use]
    pub fn with_conf_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.conf_file = Some(path.into());
        self
    }

    /// Replace the directories searched for `liquibase.mongosh.conf`.
    #[must_use]
    pub fn with_search_dirs<I, P>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.search_dirs = dirs.into_iter().map(Into::into).collect();
        self
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    /// Location of the project file, if one exists.
    #[must_use]
    pub fn locate_conf_file(&self) -> Option<PathBuf> {
        if let Some(path) = &self.conf_file {
            return path.is_file().then(|| path.clone());
        }
        self.search_dirs
            .iter()
            .map(|dir| dir.join(PROJECT_CONF_FILE))
            .find(|candidate| candidate.is_file())
    }

    /// Produce the effective configuration for one invocation.
    pub fn resolve(&self) -> ExecResult<EffectiveConfig> {
        let mut config = EffectiveConfig::default();

        match self.locate_conf_file() {
            Some(path) => {
                info!(path = %path.display(), "Loading {PROJECT_CONF_FILE}");
                let props = Properties::load(&path).map_err(|err| {
                    ExecError::io(
                        ErrorCode::Config,
                        format!("failed to read {}", path.display()),
                        err,
                    )
                })?;
                apply_file(&mut config, &props, &path)?;
            }
            None => info!("No configuration file named '{PROJECT_CONF_FILE}' found."),
        }

        apply_registry(&mut config, &self.registry)?;
        validate_executable(&mut config)?;
        log_config(&config);
        Ok(config)
    }
}

fn apply_file(config: &mut EffectiveConfig, props: &Properties, path: &Path) -> ExecResult<()> {
    for (key, suffix) in FILE_KEYS {
        let full_key = project_key(suffix);
        let Some(raw) = props.get(&full_key) else {
            continue;
        };
        assign(config, key, raw, &full_key)?;
        config.sources.insert(
            key,
            ConfigSource::ProjectFile {
                path: path.to_path_buf(),
            },
        );
    }
    Ok(())
}

fn apply_registry<R: SettingsRegistry>(config: &mut EffectiveConfig, registry: &R) -> ExecResult<()> {
    for (key, setting) in REGISTRY_KEYS {
        let Some(raw) = registry.current_value(setting) else {
            continue;
        };
        if raw.trim().is_empty() {
            continue;
        }
        let full_key = setting.full_key();
        assign(config, key, &raw, &full_key)?;
        config
            .sources
            .insert(key, ConfigSource::Registry { key: full_key });
    }
    Ok(())
}

/// Parse `raw` for `key` and store it; `origin` names the setting in errors.
fn assign(config: &mut EffectiveConfig, key: ConfigKey, raw: &str, origin: &str) -> ExecResult<()> {
    let value = raw.trim();
    match key {
        ConfigKey::Executable => {
            let path = PathBuf::from(value);
            config.executable = path.display().to_string();
            config.executable_override = Some(path);
        }
        ConfigKey::Timeout => config.timeout_seconds = parse_timeout(value, origin)?,
        ConfigKey::KeepTempFile => config.keep_temp_file = value.eq_ignore_ascii_case("true"),
        ConfigKey::TempFileName => config.temp_file_name = Some(value.to_string()),
        ConfigKey::TempDirectory => config.temp_directory = Some(PathBuf::from(value)),
        ConfigKey::ExtraArgs => {
            config.extra_args = value.split_whitespace().map(str::to_string).collect();
        }
        ConfigKey::LogFile => config.log_file = Some(PathBuf::from(value)),
    }
    Ok(())
}

fn parse_timeout(value: &str, origin: &str) -> ExecResult<u64> {
    value.parse::<u64>().map_err(|_| {
        ExecError::config(
            format!("invalid value '{value}' for {origin}: expected a whole number of seconds"),
            json!({
                "key": origin,
                "value": value,
                "fix": format!("set {origin} to a positive integer such as 300"),
            }),
        )
    })
}

/// Check the override path exists and is executable, then canonicalize it.
fn validate_executable(config: &mut EffectiveConfig) -> ExecResult<()> {
    let Some(path) = config.executable_override.clone() else {
        config.executable = DEFAULT_EXECUTABLE.to_string();
        return Ok(());
    };

    if !path.exists() {
        return Err(ExecError::new(
            ErrorCode::BinaryNotFound,
            format!("the '{DEFAULT_EXECUTABLE}' executable was not found at {}", path.display()),
        )
        .with_context(json!({
            "path": path.display().to_string(),
            "fix": format!("point {} at an existing mongosh binary", project_key("path")),
        })));
    }
    if !is_executable(&path) {
        return Err(ExecError::new(
            ErrorCode::BinaryNotExecutable,
            format!("{} is not executable", path.display()),
        )
        .with_context(json!({
            "path": path.display().to_string(),
            "fix": "grant execute permission on the mongosh binary",
        })));
    }

    let canonical = path.canonicalize().map_err(|err| {
        ExecError::io(
            ErrorCode::BinaryNotFound,
            format!("failed to resolve {}", path.display()),
            err,
        )
    })?;
    info!(
        "Using the '{DEFAULT_EXECUTABLE}' executable located at {}",
        canonical.display()
    );
    config.executable = canonical.display().to_string();
    config.executable_override = Some(canonical);
    Ok(())
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

fn log_config(config: &EffectiveConfig) {
    info!("Mongosh keep temp file: {}", config.keep_temp_file);
    if let Some(dir) = &config.temp_directory {
        info!("Mongosh temp file path: {}", dir.display());
    }
    if let Some(name) = &config.temp_file_name {
        info!("Mongosh temp file name: {name}");
    }
    if let Some(log) = &config.log_file {
        info!("Mongosh log file: {}", log.display());
    }
    info!("Mongosh extra args: {}", config.extra_args.join(" "));
    info!("Mongosh timeout: {}s", config.timeout_seconds);
    debug!(sources = ?config.sources, "resolved mongosh configuration");
}
