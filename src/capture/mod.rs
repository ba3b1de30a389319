//! Screen capture.
//!
//! A [`FrameSource`] reads the pixels of a fixed screen rectangle on demand.
//! The capture loop calls it once per tick from its own thread, so sources
//! must be `Send + Sync` and keep no per-call state.

pub mod types;
pub mod xcap_source;

pub use types::{CapturedFrame, DisplayBounds, Frame, Region, BYTES_PER_PIXEL};
pub use xcap_source::XcapFrameSource;

use crate::error::OpenCutResult;

/// Pulls raw pixel snapshots of a screen region.
pub trait FrameSource: Send + Sync {
    /// Displays this source can read, used to validate a selected region.
    fn displays(&self) -> OpenCutResult<Vec<DisplayBounds>>;

    /// Read the current pixels of `region`.
    ///
    /// Fails with `CaptureError` when the backend cannot read the display and
    /// with `InvalidRegion` when the region no longer fits a display.
    fn capture(&self, region: &Region) -> OpenCutResult<CapturedFrame>;

    /// Backend name for logging.
    fn name(&self) -> &'static str {
        "custom"
    }
}
