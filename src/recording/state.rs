//! Loop control signals and progress tracking.
//!
//! The session talks to its capture thread through a bounded command channel
//! and reads progress through atomics, so neither side blocks the other.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Commands that can be sent to the capture loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderCommand {
    /// Stop recording and keep the frames.
    Stop,
    /// Stop recording and drop the frames.
    Cancel,
}

/// Shared state for tracking recording progress.
#[derive(Debug)]
pub struct RecordingProgress {
    frame_count: AtomicU64,
    dropped_ticks: AtomicU64,
    started_at: Instant,
}

impl RecordingProgress {
    pub fn new() -> Self {
        Self {
            frame_count: AtomicU64::new(0),
            dropped_ticks: AtomicU64::new(0),
            started_at: Instant::now(),
        }
    }

    pub fn increment_frame(&self) -> u64 {
        self.frame_count.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn get_frame_count(&self) -> u64 {
        self.frame_count.load(Ordering::Relaxed)
    }

    pub fn add_dropped_ticks(&self, ticks: u64) {
        self.dropped_ticks.fetch_add(ticks, Ordering::Relaxed);
    }

    pub fn get_dropped_ticks(&self) -> u64 {
        self.dropped_ticks.load(Ordering::Relaxed)
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}

impl Default for RecordingProgress {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_counters() {
        let progress = RecordingProgress::new();
        assert_eq!(progress.increment_frame(), 1);
        assert_eq!(progress.increment_frame(), 2);
        progress.add_dropped_ticks(3);

        assert_eq!(progress.get_frame_count(), 2);
        assert_eq!(progress.get_dropped_ticks(), 3);
    }
}
