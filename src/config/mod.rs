//! Recording configuration.
//!
//! - `RecordingConfig`: capture cadence, buffer limit, palette policy and
//!   encoder quality, loadable from JSON.

pub mod recording;

pub use recording::RecordingConfig;
