//! Recording configuration.
//!
//! Every setting that shapes a recording lives in one typed struct. A
//! [`RecordingSession`](crate::recording::RecordingSession) takes a copy when
//! it is created; hosts that want live edits rebuild the session.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::OpenCutResult;
use crate::gif_encoder::PalettePolicy;

/// Shortest accepted frame interval (100 fps).
pub const MIN_FRAME_INTERVAL_MS: u64 = 10;
/// Longest accepted frame interval (1 fps).
pub const MAX_FRAME_INTERVAL_MS: u64 = 1000;
/// Hard ceiling on buffered frames regardless of configuration.
pub const MAX_FRAME_COUNT_LIMIT: usize = 10_000;

/// Centralized recording configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecordingConfig {
    /// Milliseconds between capture ticks (10-1000).
    pub frame_interval_ms: u64,

    /// Maximum number of frames kept in memory. Recording stops on its own
    /// once the buffer holds this many frames.
    pub max_frame_count: usize,

    /// Global palette or one adaptive palette per frame.
    pub palette_policy: PalettePolicy,

    /// Quality setting (1-100). Higher is slower and more faithful.
    pub quality: u32,

    /// Upper bound for a single frame delay, in hundredths of a second.
    pub max_delay_cs: u16,

    /// Emit a progress event every N captured frames (0 disables).
    pub progress_event_every: u64,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            frame_interval_ms: 66, // ~15 fps
            max_frame_count: 450,  // 30s at 15 fps
            palette_policy: PalettePolicy::default(),
            quality: 80,
            max_delay_cs: 500,
            progress_event_every: 15,
        }
    }
}

impl RecordingConfig {
    /// Config capturing at `fps` frames per second, other settings default.
    pub fn from_fps(fps: u32) -> Self {
        let mut config = Self {
            frame_interval_ms: 1000 / u64::from(fps.max(1)),
            ..Self::default()
        };
        config.validate();
        config
    }

    /// Validate and clamp settings to acceptable ranges.
    pub fn validate(&mut self) {
        self.frame_interval_ms = self
            .frame_interval_ms
            .clamp(MIN_FRAME_INTERVAL_MS, MAX_FRAME_INTERVAL_MS);
        self.max_frame_count = self.max_frame_count.clamp(1, MAX_FRAME_COUNT_LIMIT);
        self.quality = self.quality.clamp(1, 100);
        self.max_delay_cs = self.max_delay_cs.max(1);
    }

    /// Target time between two capture ticks.
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }

    /// Nominal frames per second implied by the interval.
    pub fn fps(&self) -> f64 {
        1000.0 / self.frame_interval_ms.max(1) as f64
    }

    /// Longest recording the frame limit allows at the configured cadence.
    pub fn max_duration(&self) -> Duration {
        self.frame_interval() * self.max_frame_count as u32
    }

    /// Load a config from a JSON file. Missing fields take their defaults.
    pub fn load(path: &Path) -> OpenCutResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: RecordingConfig = serde_json::from_str(&contents)?;
        config.validate();
        log::debug!("[CONFIG] Loaded recording config from {}", path.display());
        Ok(config)
    }

    /// Write the config as pretty JSON.
    pub fn save(&self, path: &Path) -> OpenCutResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_clamps_ranges() {
        let mut config = RecordingConfig {
            frame_interval_ms: 1,
            max_frame_count: 0,
            quality: 500,
            max_delay_cs: 0,
            ..RecordingConfig::default()
        };
        config.validate();

        assert_eq!(config.frame_interval_ms, MIN_FRAME_INTERVAL_MS);
        assert_eq!(config.max_frame_count, 1);
        assert_eq!(config.quality, 100);
        assert_eq!(config.max_delay_cs, 1);
    }

    #[test]
    fn test_from_fps() {
        assert_eq!(RecordingConfig::from_fps(10).frame_interval_ms, 100);
        assert_eq!(RecordingConfig::from_fps(20).frame_interval(), Duration::from_millis(50));
        // 0 fps would divide by zero; clamps to the slowest cadence
        assert_eq!(RecordingConfig::from_fps(0).frame_interval_ms, MAX_FRAME_INTERVAL_MS);
    }

    #[test]
    fn test_max_duration() {
        let config = RecordingConfig {
            frame_interval_ms: 100,
            max_frame_count: 50,
            ..RecordingConfig::default()
        };
        assert_eq!(config.max_duration(), Duration::from_secs(5));
    }

    #[test]
    fn test_json_uses_camel_case_and_defaults() {
        let config: RecordingConfig =
            serde_json::from_str(r#"{"frameIntervalMs": 50, "palettePolicy": "perFrame"}"#)
                .unwrap();
        assert_eq!(config.frame_interval_ms, 50);
        assert_eq!(config.palette_policy, PalettePolicy::PerFrame);
        assert_eq!(config.max_frame_count, RecordingConfig::default().max_frame_count);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("recording.json");

        let config = RecordingConfig {
            frame_interval_ms: 40,
            quality: 55,
            ..RecordingConfig::default()
        };
        config.save(&path).unwrap();

        assert_eq!(RecordingConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_load_clamps_out_of_range_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recording.json");
        std::fs::write(&path, r#"{"frameIntervalMs": 5000}"#).unwrap();

        let config = RecordingConfig::load(&path).unwrap();
        assert_eq!(config.frame_interval_ms, MAX_FRAME_INTERVAL_MS);
    }
}
