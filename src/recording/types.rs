//! Type definitions for recording sessions.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::capture::Region;

/// Why a capture loop ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "camelCase")]
pub enum StopReason {
    /// `stop()` was called.
    Requested,
    /// Recording was cancelled; frames are discarded.
    Cancelled,
    /// The frame buffer filled up.
    BufferLimitReached { limit: usize },
    /// The frame source failed; frames captured so far are kept.
    CaptureFailed { message: String },
    /// A frame arrived with a non-increasing timestamp.
    OrderingViolation { message: String },
}

impl StopReason {
    /// Whether the loop ended without an explicit stop from the host.
    pub fn is_automatic(&self) -> bool {
        !matches!(self, StopReason::Requested | StopReason::Cancelled)
    }
}

/// Current state of a recording session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum SessionState {
    /// No region chosen.
    Idle,
    /// The front end is letting the user drag out a region.
    Selecting,
    /// Region finalized, buffer allocated empty.
    Armed { region: Region },
    /// Capture loop running.
    Recording {
        region: Region,
        #[serde(rename = "startedAt")]
        started_at: String,
    },
    /// Capture loop joined; frames ready for export or discard.
    Stopped {
        region: Region,
        #[serde(rename = "frameCount")]
        frame_count: usize,
        reason: StopReason,
    },
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Selecting => "selecting",
            SessionState::Armed { .. } => "armed",
            SessionState::Recording { .. } => "recording",
            SessionState::Stopped { .. } => "stopped",
        }
    }

    pub fn is_armed(&self) -> bool {
        matches!(self, SessionState::Armed { .. })
    }

    pub fn is_recording(&self) -> bool {
        matches!(self, SessionState::Recording { .. })
    }

    pub fn is_stopped(&self) -> bool {
        matches!(self, SessionState::Stopped { .. })
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::Idle
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Information about a finished recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingSummary {
    pub frame_count: usize,
    pub width: u32,
    pub height: u32,
    pub channels: u32,
    /// Time between the first and last captured frame.
    pub duration_secs: f64,
    /// Ticks skipped because a capture overran its interval.
    pub dropped_ticks: u64,
    /// Resident size of the buffered pixels.
    pub memory_bytes: usize,
}

/// Result of a successful export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportSummary {
    pub path: PathBuf,
    pub frame_count: usize,
    pub file_size_bytes: u64,
    /// Playback length of one loop of the GIF.
    pub duration_secs: f64,
}
