// Test module - relaxed lint rules
#![allow(clippy::indexing_slicing)]
#![allow(clippy::panic)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(missing_docs)]

use mongosh_exec::cleanup;
use mongosh_exec::model::{ChangeSetRef, ScriptPayload};
use mongosh_exec::script_file::{create_script_file, ScriptFileRequest};
use mongosh_exec::ErrorCode;

fn payload() -> ScriptPayload {
    ScriptPayload::new(
        ChangeSetRef::new("cs-1", "alice"),
        ["db.a.find()\r\n", "db.b.insert({x:1})"],
    )
}

fn request_in(dir: &std::path::Path) -> ScriptFileRequest {
    ScriptFileRequest {
        directory: Some(dir.to_path_buf()),
        ..ScriptFileRequest::default()
    }
}

#[test]
fn content_is_fragments_without_cr_plus_terminator() {
    let dir = tempfile::tempdir().unwrap();
    let file = create_script_file(&payload(), &request_in(dir.path())).unwrap();
    let content = std::fs::read_to_string(file.path()).unwrap();
    assert_eq!(content, "db.a.find()\ndb.b.insert({x:1});\n");
    assert!(file.path().is_absolute());
}

#[test]
fn synthesized_names_are_unique_and_carry_identity() {
    let dir = tempfile::tempdir().unwrap();
    let first = create_script_file(&payload(), &request_in(dir.path())).unwrap();
    let second = create_script_file(&payload(), &request_in(dir.path())).unwrap();
    assert_ne!(first.path(), second.path());

    let name = first.path().file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("liquibase.txt-cs-1-alice-"), "{name}");
    assert!(name.ends_with(".txt"), "{name}");
}

#[test]
fn existing_target_without_overwrite_fails() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("fixed.txt"), "old").unwrap();
    let request = ScriptFileRequest {
        file_name: Some("fixed".to_string()),
        overwrite: false,
        ..request_in(dir.path())
    };
    let err = create_script_file(&payload(), &request).unwrap_err();
    assert_eq!(err.code, ErrorCode::FileCreation);
    assert_eq!(
        std::fs::read_to_string(dir.path().join("fixed.txt")).unwrap(),
        "old"
    );
}

#[test]
fn existing_target_with_overwrite_is_replaced() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("fixed.txt"), "old content that is longer").unwrap();
    let request = ScriptFileRequest {
        file_name: Some("fixed".to_string()),
        overwrite: true,
        ..request_in(dir.path())
    };
    let file = create_script_file(&payload(), &request).unwrap();
    assert_eq!(file.path(), dir.path().join("fixed.txt"));
    assert_eq!(
        std::fs::read_to_string(file.path()).unwrap(),
        "db.a.find()\ndb.b.insert({x:1});\n"
    );
}

#[test]
fn custom_names_cannot_escape_the_directory() {
    let dir = tempfile::tempdir().unwrap();
    let request = ScriptFileRequest {
        file_name: Some("../../evil:name".to_string()),
        ..request_in(dir.path())
    };
    let file = create_script_file(&payload(), &request).unwrap();
    assert_eq!(file.path().parent(), Some(dir.path()));
    assert_eq!(file.path().file_name().unwrap(), "evilname.txt");
}

#[test]
fn missing_directory_is_created() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("a").join("b");
    let file = create_script_file(&payload(), &request_in(&nested)).unwrap();
    assert!(nested.is_dir());
    assert!(file.path().starts_with(&nested));
}

#[cfg(unix)]
#[test]
fn uncreatable_directory_is_file_creation_error() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, "").unwrap();
    let err = create_script_file(&payload(), &request_in(&blocker.join("sub"))).unwrap_err();
    assert_eq!(err.code, ErrorCode::FileCreation);
}

#[test]
fn cleanup_registration_follows_retain_flag() {
    let dir = tempfile::tempdir().unwrap();
    let temp = create_script_file(&payload(), &request_in(dir.path())).unwrap();
    assert!(cleanup::is_scheduled(temp.path()));

    let kept = create_script_file(
        &payload(),
        &ScriptFileRequest {
            retain: true,
            ..request_in(dir.path())
        },
    )
    .unwrap();
    assert!(kept.retain());
    assert!(!cleanup::is_scheduled(kept.path()));
}
