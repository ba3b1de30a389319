//! Shared types for the capture module.

use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::error::{OpenCutError, OpenCutResult};

/// Bytes per pixel of every buffer the capture path produces (RGBA).
pub const BYTES_PER_PIXEL: usize = 4;

/// Screen rectangle to record, in virtual screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Region {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Exclusive right edge.
    pub fn right(&self) -> i64 {
        i64::from(self.x) + i64::from(self.width)
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> i64 {
        i64::from(self.y) + i64::from(self.height)
    }

    pub fn is_degenerate(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Size in bytes of one RGBA frame of this region.
    pub fn frame_bytes(&self) -> usize {
        self.width as usize * self.height as usize * BYTES_PER_PIXEL
    }

    /// Check the region is non-empty and fully inside one of `displays`.
    ///
    /// Returns the display that contains it.
    pub fn validate<'a>(&self, displays: &'a [DisplayBounds]) -> OpenCutResult<&'a DisplayBounds> {
        if self.is_degenerate() {
            return Err(OpenCutError::InvalidRegion(format!(
                "{}x{} has no area",
                self.width, self.height
            )));
        }

        displays
            .iter()
            .find(|d| d.contains(self))
            .ok_or_else(|| {
                OpenCutError::InvalidRegion(format!(
                    "{}x{} at ({}, {}) is not within a single display",
                    self.width, self.height, self.x, self.y
                ))
            })
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}+{}+{}", self.width, self.height, self.x, self.y)
    }
}

/// Bounds of one display as reported by a frame source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayBounds {
    pub name: String,
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    pub is_primary: bool,
}

impl DisplayBounds {
    /// Whether `region` lies entirely on this display.
    pub fn contains(&self, region: &Region) -> bool {
        let right = i64::from(self.x) + i64::from(self.width);
        let bottom = i64::from(self.y) + i64::from(self.height);

        region.x >= self.x && region.y >= self.y && region.right() <= right && region.bottom() <= bottom
    }

    /// Region origin translated into display-local coordinates.
    pub fn to_local(&self, region: &Region) -> (u32, u32) {
        (
            (region.x - self.x).max(0) as u32,
            (region.y - self.y).max(0) as u32,
        )
    }

    /// The whole display as a region.
    pub fn as_region(&self) -> Region {
        Region::new(self.x, self.y, self.width, self.height)
    }
}

/// Raw pixels returned by a frame source, before they are timestamped.
#[derive(Debug, Clone)]
pub struct CapturedFrame {
    /// RGBA pixel data, row-major, no padding.
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl CapturedFrame {
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> OpenCutResult<Self> {
        let expected = width as usize * height as usize * BYTES_PER_PIXEL;
        if data.len() != expected {
            return Err(OpenCutError::CaptureError(format!(
                "{}x{} frame needs {} bytes, got {}",
                width,
                height,
                expected,
                data.len()
            )));
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }
}

impl From<image::RgbaImage> for CapturedFrame {
    fn from(image: image::RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        CapturedFrame {
            data: image.into_raw(),
            width,
            height,
        }
    }
}

/// One captured snapshot with its monotonic capture time.
///
/// Frames are immutable once built; the buffer shares them behind `Arc`.
#[derive(Debug, Clone)]
pub struct Frame {
    pixels: Vec<u8>,
    width: u32,
    height: u32,
    captured_at: Instant,
}

impl Frame {
    pub fn new(captured: CapturedFrame, captured_at: Instant) -> Self {
        Self {
            pixels: captured.data,
            width: captured.width,
            height: captured.height,
            captured_at,
        }
    }

    /// RGBA bytes, `width * height * 4` long.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn captured_at(&self) -> Instant {
        self.captured_at
    }

    pub fn byte_len(&self) -> usize {
        self.pixels.len()
    }
}

impl AsRef<Frame> for Frame {
    fn as_ref(&self) -> &Frame {
        self
    }
}
