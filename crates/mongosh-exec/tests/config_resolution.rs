// Test module - relaxed lint rules
#![allow(clippy::default_trait_access)]
#![allow(clippy::indexing_slicing)]
#![allow(clippy::panic)]
#![allow(clippy::manual_assert)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use mongosh_exec::config::{ConfigResolver, DeclaredSettings, MapSettings, SettingKey};
use mongosh_exec::model::{ConfigKey, ConfigSource};
use mongosh_exec::ErrorCode;

fn write_conf(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("liquibase.mongosh.conf");
    std::fs::write(&path, body).unwrap();
    path
}

#[test]
fn file_values_apply_when_registry_is_silent() {
    let dir = tempfile::tempdir().unwrap();
    let conf = write_conf(
        dir.path(),
        "liquibase.mongosh.timeout=42\n\
         liquibase.mongosh.args=--quiet   --norc --nodb\n\
         liquibase.mongosh.keep.temp=TRUE\n\
         liquibase.mongosh.keep.temp.name=my-run\n\
         liquibase.mongosh.logFile=/tmp/mongosh.log\n",
    );
    let config = ConfigResolver::new(MapSettings::new())
        .with_conf_file(&conf)
        .resolve()
        .unwrap();

    assert_eq!(config.timeout_seconds, 42);
    assert_eq!(config.extra_args, vec!["--quiet", "--norc", "--nodb"]);
    assert!(config.keep_temp_file);
    assert_eq!(config.temp_file_name.as_deref(), Some("my-run"));
    assert_eq!(config.log_file, Some(PathBuf::from("/tmp/mongosh.log")));
    assert_eq!(
        config.source_of(ConfigKey::Timeout),
        ConfigSource::ProjectFile { path: conf }
    );
}

#[test]
fn registry_overrides_file_per_key() {
    let dir = tempfile::tempdir().unwrap();
    let conf = write_conf(
        dir.path(),
        "liquibase.mongosh.timeout=42\nliquibase.mongosh.logFile=/tmp/file.log\n",
    );
    let registry = MapSettings::new().with(SettingKey::MongoshTimeoutSeconds, "7");
    let config = ConfigResolver::new(registry)
        .with_conf_file(&conf)
        .resolve()
        .unwrap();

    assert_eq!(config.timeout_seconds, 7);
    assert_eq!(config.log_file, Some(PathBuf::from("/tmp/file.log")));
    assert_eq!(
        config.source_of(ConfigKey::Timeout),
        ConfigSource::Registry {
            key: "liquibase.mongodb.mongoshTimeoutSeconds".to_string()
        }
    );
}

#[test]
fn declared_defaults_shadow_file_values() {
    let dir = tempfile::tempdir().unwrap();
    let conf = write_conf(dir.path(), "liquibase.mongosh.timeout=42\n");
    let config = ConfigResolver::new(DeclaredSettings::new(MapSettings::new()))
        .with_conf_file(&conf)
        .resolve()
        .unwrap();
    assert_eq!(config.timeout_seconds, 300);
}

#[test]
fn non_integer_file_timeout_names_key_and_value() {
    let dir = tempfile::tempdir().unwrap();
    let conf = write_conf(dir.path(), "liquibase.mongosh.timeout=ten\n");
    let err = ConfigResolver::new(MapSettings::new())
        .with_conf_file(&conf)
        .resolve()
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::Config);
    assert!(err.message.contains("liquibase.mongosh.timeout"));
    assert!(err.message.contains("'ten'"));
}

#[test]
fn missing_conf_file_is_not_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let resolver = ConfigResolver::new(MapSettings::new()).with_search_dirs([dir.path()]);
    assert!(resolver.locate_conf_file().is_none());
    let config = resolver.resolve().unwrap();
    assert_eq!(config.timeout_seconds, 1800);
}

#[test]
fn search_dirs_find_conf_file() {
    let dir = tempfile::tempdir().unwrap();
    let conf = write_conf(dir.path(), "liquibase.mongosh.timeout=9\n");
    let resolver = ConfigResolver::new(MapSettings::new()).with_search_dirs([dir.path()]);
    assert_eq!(resolver.locate_conf_file(), Some(conf));
    assert_eq!(resolver.resolve().unwrap().timeout_seconds, 9);
}

#[test]
fn resolving_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let conf = write_conf(
        dir.path(),
        "liquibase.mongosh.args=--quiet\nliquibase.mongosh.keep.temp.path=/tmp/scripts\n",
    );
    let resolver = ConfigResolver::new(DeclaredSettings::new(
        MapSettings::new().with(SettingKey::MongoshLogFile, "/tmp/a.log"),
    ))
    .with_conf_file(&conf);
    assert_eq!(resolver.resolve().unwrap(), resolver.resolve().unwrap());
}

#[cfg(unix)]
#[test]
fn executable_override_is_validated_and_canonicalized() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let bin = dir.path().join("mongosh");
    std::fs::write(&bin, "#!/bin/sh\nexit 0\n").unwrap();

    std::fs::set_permissions(&bin, std::fs::Permissions::from_mode(0o644)).unwrap();
    let registry = MapSettings::new().with(SettingKey::MongoshPath, bin.display().to_string());
    let err = ConfigResolver::new(registry.clone()).resolve().unwrap_err();
    assert_eq!(err.code, ErrorCode::BinaryNotExecutable);

    std::fs::set_permissions(&bin, std::fs::Permissions::from_mode(0o755)).unwrap();
    let config = ConfigResolver::new(registry).resolve().unwrap();
    let canonical = bin.canonicalize().unwrap();
    assert_eq!(config.executable_override, Some(canonical.clone()));
    assert_eq!(config.executable, canonical.display().to_string());
}

#[test]
fn nonexistent_override_from_file_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let conf = write_conf(dir.path(), "liquibase.mongosh.path=/no/such/dir/mongosh\n");
    let err = ConfigResolver::new(MapSettings::new())
        .with_conf_file(&conf)
        .resolve()
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::BinaryNotFound);
    assert!(err.fix().is_some());
}
