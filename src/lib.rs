//! OpenCut: record a screen region and export it as a looping GIF.
//!
//! A host owns one [`RecordingSession`], points it at a [`FrameSource`]
//! (normally [`XcapFrameSource`]) and drives it through region selection,
//! recording, stopping and export. Progress and state changes are published
//! as [`RecordingEvent`]s.

pub mod capture;
pub mod config;
pub mod error;
pub mod gif_encoder;
pub mod recording;

pub use capture::{DisplayBounds, Frame, FrameSource, Region, XcapFrameSource};
pub use config::RecordingConfig;
pub use error::{OpenCutError, OpenCutResult};
pub use gif_encoder::{GifDocument, GifEncoder, PalettePolicy};
pub use recording::{
    ExportSummary, RecordingEvent, RecordingSession, RecordingSummary, SessionState, StopReason,
};
