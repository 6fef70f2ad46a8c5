// Test module - relaxed lint rules
#![allow(clippy::unwrap_used)]
#![allow(missing_docs)]

use mongosh_exec::cleanup::{self, ExitCleanupGuard};
use mongosh_exec::model::{ChangeSetRef, ScriptPayload};
use mongosh_exec::script_file::{create_script_file, ScriptFileRequest};

#[test]
fn guard_removes_unretained_scripts_and_keeps_retained_ones() {
    let dir = tempfile::tempdir().unwrap();
    let payload = ScriptPayload::new(ChangeSetRef::new("1", "a"), ["db.x.find()"]);
    let base = ScriptFileRequest {
        directory: Some(dir.path().to_path_buf()),
        ..ScriptFileRequest::default()
    };
    let temp = create_script_file(&payload, &base).unwrap();
    let kept = create_script_file(
        &payload,
        &ScriptFileRequest {
            retain: true,
            ..base.clone()
        },
    )
    .unwrap();

    {
        let _guard = ExitCleanupGuard::new();
    }

    assert!(!temp.path().exists());
    assert!(kept.path().exists());
    assert!(!cleanup::is_scheduled(temp.path()));
    assert_eq!(cleanup::run_exit_cleanup(), 0);
}
