//! Notifications from the recording core to front ends.
//!
//! Any number of subscribers can listen; each gets its own unbounded
//! channel. Subscribers that hang up are pruned on the next emit.

use std::sync::Arc;

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use serde::Serialize;

use super::types::SessionState;

/// Event sent to front ends.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RecordingEvent {
    /// The session entered a new state.
    StateChanged { state: SessionState },
    /// Periodic capture progress.
    #[serde(rename_all = "camelCase")]
    Progress { frame_count: u64, elapsed_secs: f64 },
    /// The buffer filled and recording stopped on its own.
    BufferLimitReached { limit: usize },
    /// The frame source failed and recording stopped.
    CaptureFailed { message: String },
    /// A command was rejected or an export failed.
    Error { message: String },
    /// The GIF was written.
    #[serde(rename_all = "camelCase")]
    Exported { path: String, file_size_bytes: u64 },
}

/// Fan-out of [`RecordingEvent`]s, cloneable into the capture thread.
#[derive(Debug, Clone, Default)]
pub struct EventHub {
    subscribers: Arc<Mutex<Vec<Sender<RecordingEvent>>>>,
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new listener.
    pub fn subscribe(&self) -> Receiver<RecordingEvent> {
        let (tx, rx) = unbounded();
        self.subscribers.lock().push(tx);
        rx
    }

    pub fn emit(&self, event: RecordingEvent) {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn emit_state_change(&self, state: &SessionState) {
        self.emit(RecordingEvent::StateChanged {
            state: state.clone(),
        });
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}
