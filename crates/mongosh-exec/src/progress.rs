//! Progress callback for reporting invocation progress.
//!
//! This is the interactive surface of the runner: timeout warnings go here as
//! well as to the log.

use std::sync::{Mutex, PoisonError};

use crate::model::InvocationId;

/// Event emitted while an invocation runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// The script file was written.
    ScriptCreated {
        /// Invocation identifier.
        invocation_id: InvocationId,
        /// Absolute script path.
        path: String,
    },
    /// The process was spawned.
    Started {
        /// Invocation identifier.
        invocation_id: InvocationId,
        /// Redacted command line.
        command_line: String,
        /// OS process id.
        pid: u32,
    },
    /// The process exited on its own.
    Exited {
        /// Invocation identifier.
        invocation_id: InvocationId,
        /// Exit status.
        exit_code: i32,
        /// Wall time in milliseconds.
        duration_ms: u64,
    },
    /// The timeout elapsed; the runner is in its grace wait.
    GraceWait {
        /// Invocation identifier.
        invocation_id: InvocationId,
        /// Grace period in milliseconds.
        grace_ms: u64,
    },
    /// Something the user should see.
    Warning {
        /// Invocation identifier.
        invocation_id: InvocationId,
        /// Message text.
        message: String,
    },
}

impl ProgressEvent {
    #[must_use]
    pub fn invocation_id(&self) -> InvocationId {
        match self {
            Self::ScriptCreated { invocation_id, .. }
            | Self::Started { invocation_id, .. }
            | Self::Exited { invocation_id, .. }
            | Self::GraceWait { invocation_id, .. }
            | Self::Warning { invocation_id, .. } => *invocation_id,
        }
    }
}

/// Trait for receiving progress events during execution.
pub trait ProgressCallback: Send + Sync {
    /// Called for each progress event.
    fn on_progress(&self, event: &ProgressEvent);
}

/// A no-op progress callback that discards all events.
#[derive(Debug, Default)]
pub struct NoopProgress;

impl ProgressCallback for NoopProgress {
    fn on_progress(&self, _event: &ProgressEvent) {}
}

/// Keeps every event, for inspection after a run.
#[derive(Debug, Default)]
pub struct CollectingProgress {
    events: Mutex<Vec<ProgressEvent>>,
}

impl CollectingProgress {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Events received so far.
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Warning messages received so far.
    pub fn warnings(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ProgressEvent::Warning { message, .. } => Some(message),
                _ => None,
            })
            .collect()
    }
}

impl ProgressCallback for CollectingProgress {
    fn on_progress(&self, event: &ProgressEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }
}
