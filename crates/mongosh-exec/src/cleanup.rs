//! Process-wide delete-on-exit list for temp script files.
//!
//! Paths are removed by [`run_exit_cleanup`], normally through an
//! [`ExitCleanupGuard`] held by `main`. Abnormal termination (SIGKILL, abort)
//! skips it, so removal is best-effort.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock, PoisonError};

use tracing::debug;

fn registry() -> &'static Mutex<Vec<PathBuf>> {
    static PENDING: OnceLock<Mutex<Vec<PathBuf>>> = OnceLock::new();
    PENDING.get_or_init(|| Mutex::new(Vec::new()))
}

/// Schedule `path` for removal at orderly shutdown.
pub fn delete_on_exit(path: impl Into<PathBuf>) {
    let path = path.into();
    let mut pending = registry().lock().unwrap_or_else(PoisonError::into_inner);
    if !pending.contains(&path) {
        pending.push(path);
    }
}

/// Drop `path` from the list, e.g. once it has been deleted already.
pub fn forget(path: &Path) {
    let mut pending = registry().lock().unwrap_or_else(PoisonError::into_inner);
    pending.retain(|p| p != path);
}

/// Whether `path` is scheduled for removal.
#[must_use]
pub fn is_scheduled(path: &Path) -> bool {
    registry()
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .iter()
        .any(|p| p == path)
}

/// Remove every scheduled path. Returns how many files were deleted.
pub fn run_exit_cleanup() -> usize {
    let pending = {
        let mut guard = registry().lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::take(&mut *guard)
    };
    let mut removed = 0;
    for path in pending {
        match std::fs::remove_file(&path) {
            Ok(()) => {
                debug!(path = %path.display(), "removed temp script file");
                removed += 1;
            }
            Err(err) => debug!(path = %path.display(), %err, "temp script file not removed"),
        }
    }
    removed
}

/// Runs [`run_exit_cleanup`] when dropped.
#[derive(Debug, Default)]
pub struct ExitCleanupGuard {
    _private: (),
}

impl ExitCleanupGuard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Drop for ExitCleanupGuard {
    fn drop(&mut self) {
        run_exit_cleanup();
    }
}
