//! Region capture implementation using xcap.
//!
//! Monitors are enumerated on every call so a display that was unplugged
//! mid-recording surfaces as a capture error instead of stale pixels.

use image::DynamicImage;
use xcap::Monitor;

use super::types::{CapturedFrame, DisplayBounds, Region};
use super::FrameSource;
use crate::error::{OpenCutError, OpenCutResult};

/// Frame source backed by xcap monitor captures.
#[derive(Debug, Default, Clone, Copy)]
pub struct XcapFrameSource;

impl XcapFrameSource {
    pub fn new() -> Self {
        Self
    }
}

fn monitor_bounds(idx: usize, monitor: &Monitor) -> DisplayBounds {
    DisplayBounds {
        name: monitor
            .name()
            .unwrap_or_else(|_| format!("Monitor {}", idx)),
        x: monitor.x().unwrap_or(0),
        y: monitor.y().unwrap_or(0),
        width: monitor.width().unwrap_or(0),
        height: monitor.height().unwrap_or(0),
        is_primary: monitor.is_primary().unwrap_or(false),
    }
}

impl FrameSource for XcapFrameSource {
    fn displays(&self) -> OpenCutResult<Vec<DisplayBounds>> {
        let monitors = Monitor::all()?;

        Ok(monitors
            .iter()
            .enumerate()
            .map(|(idx, monitor)| monitor_bounds(idx, monitor))
            .collect())
    }

    fn capture(&self, region: &Region) -> OpenCutResult<CapturedFrame> {
        let monitors = Monitor::all()?;

        let (monitor, bounds) = monitors
            .iter()
            .enumerate()
            .map(|(idx, monitor)| (monitor, monitor_bounds(idx, monitor)))
            .find(|(_, bounds)| bounds.contains(region))
            .ok_or_else(|| {
                OpenCutError::InvalidRegion(format!("{} is not within a single display", region))
            })?;

        let full_image = monitor.capture_image()?;

        // Scaled displays can return an image that differs from the logical bounds.
        let (rel_x, rel_y) = bounds.to_local(region);
        let dynamic_image = DynamicImage::ImageRgba8(full_image);
        if rel_x + region.width > dynamic_image.width()
            || rel_y + region.height > dynamic_image.height()
        {
            return Err(OpenCutError::CaptureError(format!(
                "{} exceeds captured image of {}x{}",
                region,
                dynamic_image.width(),
                dynamic_image.height()
            )));
        }

        let cropped = dynamic_image
            .crop_imm(rel_x, rel_y, region.width, region.height)
            .to_rgba8();

        Ok(CapturedFrame::from(cropped))
    }

    fn name(&self) -> &'static str {
        "xcap"
    }
}
