//! In-memory frame store for one recording.
//!
//! Frames are appended in capture order and kept resident until the
//! recording is exported or discarded. Each frame sits behind an `Arc`, so a
//! [`FrameSnapshot`] is a cheap point-in-time copy of the handle list that
//! later appends or clears cannot affect.

use std::ops::Deref;
use std::sync::Arc;
use std::time::Duration;

use crate::capture::{Frame, BYTES_PER_PIXEL};
use crate::error::{OpenCutError, OpenCutResult};

use super::types::RecordingSummary;

/// Ordered, append-only, bounded sequence of frames.
#[derive(Debug)]
pub struct FrameBuffer {
    frames: Vec<Arc<Frame>>,
    capacity: usize,
}

impl FrameBuffer {
    /// Empty buffer holding at most `capacity` frames.
    pub fn new(capacity: usize) -> Self {
        Self {
            frames: Vec::new(),
            capacity: capacity.max(1),
        }
    }

    /// Append `frame` if its timestamp is strictly after the last one.
    ///
    /// Returns the new length.
    pub fn append(&mut self, frame: Frame) -> OpenCutResult<usize> {
        if self.is_full() {
            return Err(OpenCutError::BufferLimitReached {
                limit: self.capacity,
            });
        }

        if let Some(last) = self.frames.last() {
            if frame.captured_at() <= last.captured_at() {
                let origin = self.frames[0].captured_at();
                return Err(OpenCutError::OrderingError {
                    previous_ms: last.captured_at().saturating_duration_since(origin).as_millis(),
                    attempted_ms: frame.captured_at().saturating_duration_since(origin).as_millis(),
                });
            }
        }

        if self.frames.is_empty() {
            // First frame of a recording: size the handle list once.
            self.frames.reserve(self.capacity.min(1000));
        }
        self.frames.push(Arc::new(frame));
        Ok(self.frames.len())
    }

    /// Point-in-time read-only view of the frames.
    pub fn snapshot(&self) -> FrameSnapshot {
        FrameSnapshot {
            frames: self.frames.clone(),
        }
    }

    /// Release all frames.
    pub fn clear(&mut self) {
        self.frames = Vec::new();
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.frames.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes of pixel data held.
    pub fn memory_bytes(&self) -> usize {
        self.frames.iter().map(|f| f.byte_len()).sum()
    }

    /// Time between the first and last frame.
    pub fn duration(&self) -> Duration {
        match (self.frames.first(), self.frames.last()) {
            (Some(first), Some(last)) => last.captured_at().saturating_duration_since(first.captured_at()),
            _ => Duration::ZERO,
        }
    }
}

/// Immutable ordered view of a buffer's frames.
#[derive(Debug, Clone, Default)]
pub struct FrameSnapshot {
    frames: Vec<Arc<Frame>>,
}

impl FrameSnapshot {
    pub fn frames(&self) -> &[Arc<Frame>] {
        &self.frames
    }

    /// Summary of the frames, with `dropped_ticks` taken from the loop.
    pub fn summary(&self, dropped_ticks: u64) -> RecordingSummary {
        let (width, height) = self
            .frames
            .first()
            .map(|f| (f.width(), f.height()))
            .unwrap_or((0, 0));
        let duration = match (self.frames.first(), self.frames.last()) {
            (Some(first), Some(last)) => last.captured_at().saturating_duration_since(first.captured_at()),
            _ => Duration::ZERO,
        };

        RecordingSummary {
            frame_count: self.frames.len(),
            width,
            height,
            channels: BYTES_PER_PIXEL as u32,
            duration_secs: duration.as_secs_f64(),
            dropped_ticks,
            memory_bytes: self.frames.iter().map(|f| f.byte_len()).sum(),
        }
    }
}

impl Deref for FrameSnapshot {
    type Target = [Arc<Frame>];

    fn deref(&self) -> &Self::Target {
        &self.frames
    }
}
