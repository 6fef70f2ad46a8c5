//! Temporary script files handed to `mongosh --file`.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use crate::cleanup;
use crate::error::{ExecError, ExecResult};
use crate::model::{EffectiveConfig, ScriptPayload};

/// Extension used for mongosh run scripts.
pub const SCRIPT_EXTENSION: &str = ".txt";

/// Characters never allowed in a generated or custom file name.
const ILLEGAL_CHARS: [char; 9] = ['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// How and where to create a script file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptFileRequest {
    /// Custom base name; the extension is appended.
    pub file_name: Option<String>,
    /// Directory to create the file in, created when missing. Defaults to the
    /// platform temp directory.
    pub directory: Option<PathBuf>,
    /// Replace an existing file with the same name.
    pub overwrite: bool,
    /// Keep the file after the process exits.
    pub retain: bool,
    pub extension: String,
}

impl Default for ScriptFileRequest {
    fn default() -> Self {
        Self {
            file_name: None,
            directory: None,
            overwrite: true,
            retain: false,
            extension: SCRIPT_EXTENSION.to_string(),
        }
    }
}

impl ScriptFileRequest {
    /// Request matching an effective configuration. Always overwrites.
    #[must_use]
    pub fn from_config(config: &EffectiveConfig) -> Self {
        Self {
            file_name: non_empty(config.temp_file_name.as_deref()).map(str::to_string),
            directory: config
                .temp_directory
                .as_ref()
                .filter(|dir| !dir.as_os_str().is_empty())
                .cloned(),
            overwrite: true,
            retain: config.keep_temp_file,
            extension: SCRIPT_EXTENSION.to_string(),
        }
    }
}

/// A script file on disk.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TempScriptFile {
    path: PathBuf,
    overwrite: bool,
    retain: bool,
}

impl TempScriptFile {
    /// Absolute path of the file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn overwrite(&self) -> bool {
        self.overwrite
    }

    #[must_use]
    pub fn retain(&self) -> bool {
        self.retain
    }
}

/// Remove path traversal and characters that are illegal in file names.
#[must_use]
pub fn sanitize_file_name(name: &str) -> String {
    let mut cleaned: String = name
        .chars()
        .filter(|ch| !ILLEGAL_CHARS.contains(ch) && !ch.is_control())
        .collect();
    while cleaned.contains("..") {
        cleaned = cleaned.replace("..", "");
    }
    cleaned.trim().to_string()
}

/// `liquibase<ext>-<id>-<author>-<epochMillis>`, before sanitizing.
#[must_use]
pub fn synthesized_name(payload: &ScriptPayload, extension: &str) -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    format!(
        "liquibase{extension}-{}-{}-{millis}",
        payload.changeset.id, payload.changeset.author
    )
}

/// Write the rendered payload to a new script file.
pub fn create_script_file(
    payload: &ScriptPayload,
    request: &ScriptFileRequest,
) -> ExecResult<TempScriptFile> {
    info!(
        "Creating temporary {} file for changeset '{}:{}'",
        request.extension,
        payload.changeset.id,
        payload.changeset.author
    );

    let directory = target_directory(request)?;
    let custom = non_empty(request.file_name.as_deref()).map(sanitize_file_name);
    let (mut file, path) = match custom.filter(|name| !name.is_empty()) {
        Some(name) => {
            let path = directory.join(format!("{name}{}", request.extension));
            (open_named(&path, request.overwrite)?, path)
        }
        None => {
            let prefix = sanitize_file_name(&synthesized_name(payload, &request.extension));
            open_unique(&directory, &prefix, &request.extension)?
        }
    };

    file.write_all(payload.render().as_bytes())
        .and_then(|()| file.flush())
        .map_err(|err| {
            ExecError::file_creation(format!("failed to write {}", path.display()), err)
        })?;

    if request.retain {
        info!(path = %path.display(), "Temporary file will be retained for debugging");
    } else {
        cleanup::delete_on_exit(&path);
        debug!(path = %path.display(), "Temporary file scheduled for cleanup on exit");
    }
    info!("Created temporary file: {}", path.display());

    Ok(TempScriptFile {
        path,
        overwrite: request.overwrite,
        retain: request.retain,
    })
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

fn target_directory(request: &ScriptFileRequest) -> ExecResult<PathBuf> {
    let Some(dir) = &request.directory else {
        return Ok(std::env::temp_dir());
    };
    let dir = if dir.is_absolute() {
        dir.clone()
    } else {
        std::env::current_dir()
            .map_err(|err| ExecError::file_creation("failed to read working directory", err))?
            .join(dir)
    };
    if !dir.is_dir() {
        std::fs::create_dir_all(&dir).map_err(|err| {
            ExecError::file_creation(format!("Failed to create directory: {}", dir.display()), err)
                .with_context(json!({
                    "path": dir.display().to_string(),
                    "fix": "check liquibase.mongosh.keep.temp.path points to a writable location",
                }))
        })?;
    }
    Ok(dir)
}

fn open_named(path: &Path, overwrite: bool) -> ExecResult<File> {
    if !overwrite && path.exists() {
        return Err(already_exists(path));
    }
    let mut options = OpenOptions::new();
    options.write(true);
    if overwrite {
        options.create(true).truncate(true);
    } else {
        options.create_new(true);
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    options.open(path).map_err(|err| {
        if err.kind() == std::io::ErrorKind::AlreadyExists {
            already_exists(path)
        } else {
            ExecError::file_creation(format!("Failed to create new file: {}", path.display()), err)
        }
    })
}

fn open_unique(dir: &Path, prefix: &str, extension: &str) -> ExecResult<(File, PathBuf)> {
    let named = tempfile::Builder::new()
        .prefix(prefix)
        .suffix(extension)
        .tempfile_in(dir)
        .map_err(|err| {
            ExecError::file_creation(format!("Failed to create file in {}", dir.display()), err)
        })?;
    named.keep().map_err(|err| {
        ExecError::file_creation("Failed to persist temporary file", err.error)
    })
}

fn already_exists(path: &Path) -> ExecError {
    ExecError::file_creation(
        format!(
            "File already exists and overwrite is disabled: {}",
            path.display()
        ),
        std::io::Error::new(std::io::ErrorKind::AlreadyExists, "file exists"),
    )
    .with_context(json!({
        "path": path.display().to_string(),
        "fix": "remove the file or allow overwriting",
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_traversal_and_illegal_characters() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "etcpasswd");
        assert_eq!(sanitize_file_name("a:b*c?d\"e<f>g|h"), "abcdefgh");
        assert_eq!(sanitize_file_name("...."), "");
        assert_eq!(sanitize_file_name(" run-1 "), "run-1");
    }

    #[test]
    fn synthesized_name_has_changeset_identity() {
        let payload = ScriptPayload::new(crate::model::ChangeSetRef::new("42", "bob"), ["x"]);
        let name = synthesized_name(&payload, ".txt");
        assert!(name.starts_with("liquibase.txt-42-bob-"));
    }

    #[test]
    fn request_from_config_always_overwrites() {
        let config = crate::model::EffectiveConfigBuilder::new()
            .keep_temp_file(true)
            .temp_file_name("  ")
            .build();
        let request = ScriptFileRequest::from_config(&config);
        assert!(request.overwrite);
        assert!(request.retain);
        assert_eq!(request.file_name, None);
    }
}
