//! GIF encoding for finished recordings.
//!
//! [`GifEncoder::encode`] turns an ordered frame sequence into a
//! [`GifDocument`]: delays computed from capture timestamps, colours reduced
//! to 8-bit palettes per the configured [`PalettePolicy`]. The document is
//! serialized to GIF89a bytes by [`GifDocument::to_bytes`]. Nothing here
//! touches the filesystem.

pub mod delay;
pub mod palette;

#[cfg(test)]
mod tests;

use std::borrow::Cow;
use std::time::Duration;

pub use delay::{compute_delays, duration_to_cs, MIN_DELAY_CS};
pub use palette::{quality_to_speed, GlobalPalette, PaletteMapper, PalettePolicy};

use crate::capture::Frame;
use crate::config::RecordingConfig;
use crate::error::{OpenCutError, OpenCutResult};

/// One quantized image of the animation.
#[derive(Debug, Clone, PartialEq)]
pub struct GifImage {
    /// One palette index per pixel, row-major.
    pub indices: Vec<u8>,
    /// Local colour table (RGB triples). `None` uses the global table.
    pub palette: Option<Vec<u8>>,
    /// Display time in hundredths of a second.
    pub delay_cs: u16,
}

/// Encoder output, ready to be written as GIF89a.
#[derive(Debug, Clone, PartialEq)]
pub struct GifDocument {
    pub width: u16,
    pub height: u16,
    /// Global colour table (RGB triples), present with the global policy.
    pub global_palette: Option<Vec<u8>>,
    /// 0 = loop forever.
    pub loop_count: u16,
    pub images: Vec<GifImage>,
}

impl GifDocument {
    pub fn frame_count(&self) -> usize {
        self.images.len()
    }

    pub fn delays(&self) -> Vec<u16> {
        self.images.iter().map(|i| i.delay_cs).collect()
    }

    /// Total display time of one loop.
    pub fn duration(&self) -> Duration {
        let cs: u64 = self.images.iter().map(|i| u64::from(i.delay_cs)).sum();
        Duration::from_millis(cs * 10)
    }

    /// Serialize to GIF89a: header, screen descriptor, global table, loop
    /// extension, then per image a graphic control extension, descriptor,
    /// optional local table and LZW data, and the trailer.
    pub fn to_bytes(&self) -> OpenCutResult<Vec<u8>> {
        let mut output = Vec::new();

        {
            let global = self.global_palette.as_deref().unwrap_or(&[]);
            let mut encoder = gif::Encoder::new(&mut output, self.width, self.height, global)?;

            let repeat = if self.loop_count == 0 {
                gif::Repeat::Infinite
            } else {
                gif::Repeat::Finite(self.loop_count)
            };
            encoder.set_repeat(repeat)?;

            for image in &self.images {
                let mut frame = gif::Frame::default();
                frame.width = self.width;
                frame.height = self.height;
                frame.delay = image.delay_cs;
                frame.dispose = gif::DisposalMethod::Keep;
                frame.transparent = None;
                frame.palette = image.palette.clone();
                frame.buffer = Cow::Borrowed(&image.indices);

                encoder.write_frame(&frame)?;
            }

            encoder.into_inner()?;
        }

        Ok(output)
    }
}

/// Converts captured frames into a [`GifDocument`].
#[derive(Debug, Clone)]
pub struct GifEncoder {
    policy: PalettePolicy,
    quality: u32,
    max_delay_cs: u16,
    /// Delay used when a recording has a single frame.
    fallback_delay: Duration,
}

impl Default for GifEncoder {
    fn default() -> Self {
        Self::from_config(&RecordingConfig::default())
    }
}

impl GifEncoder {
    pub fn new(policy: PalettePolicy, quality: u32, max_delay_cs: u16, fallback_delay: Duration) -> Self {
        Self {
            policy,
            quality: quality.clamp(1, 100),
            max_delay_cs: max_delay_cs.max(MIN_DELAY_CS),
            fallback_delay,
        }
    }

    pub fn from_config(config: &RecordingConfig) -> Self {
        Self::new(
            config.palette_policy,
            config.quality,
            config.max_delay_cs,
            config.frame_interval(),
        )
    }

    pub fn policy(&self) -> PalettePolicy {
        self.policy
    }

    /// Encode `frames` (in capture order) into a looping animation.
    pub fn encode<F: AsRef<Frame>>(&self, frames: &[F]) -> OpenCutResult<GifDocument> {
        let first = frames.first().ok_or(OpenCutError::EmptyRecording)?.as_ref();
        let (width, height) = (first.width(), first.height());

        if width == 0 || height == 0 {
            return Err(OpenCutError::EncoderError("frames have no pixels".to_string()));
        }
        let (gif_width, gif_height) = match (u16::try_from(width), u16::try_from(height)) {
            (Ok(w), Ok(h)) => (w, h),
            _ => {
                return Err(OpenCutError::EncoderError(format!(
                    "{}x{} exceeds the GIF size limit of 65535",
                    width, height
                )))
            },
        };
        if let Some((i, f)) = frames
            .iter()
            .map(|f| f.as_ref())
            .enumerate()
            .find(|(_, f)| f.width() != width || f.height() != height)
        {
            return Err(OpenCutError::EncoderError(format!(
                "frame {} is {}x{}, expected {}x{}",
                i,
                f.width(),
                f.height(),
                width,
                height
            )));
        }

        let timestamps: Vec<_> = frames.iter().map(|f| f.as_ref().captured_at()).collect();
        let delays = compute_delays(&timestamps, self.fallback_delay, self.max_delay_cs);
        let speed = quality_to_speed(self.quality);

        log::debug!(
            "[GIF] Encoding {} frames at {}x{} ({:?} palette, speed {})",
            frames.len(),
            width,
            height,
            self.policy,
            speed
        );

        let (global_palette, images) = match self.policy {
            PalettePolicy::Global => {
                let mut global = GlobalPalette::build(frames, speed);
                let images = frames
                    .iter()
                    .zip(&delays)
                    .map(|(frame, &delay_cs)| GifImage {
                        indices: global.map_pixels(frame.as_ref().pixels()),
                        palette: None,
                        delay_cs,
                    })
                    .collect();
                (Some(global.colors().to_vec()), images)
            },
            PalettePolicy::PerFrame => {
                let images = frames
                    .iter()
                    .zip(&delays)
                    .map(|(frame, &delay_cs)| {
                        let (local, indices) = palette::quantize_frame(frame.as_ref(), speed);
                        GifImage {
                            indices,
                            palette: Some(local),
                            delay_cs,
                        }
                    })
                    .collect();
                (None, images)
            },
        };

        Ok(GifDocument {
            width: gif_width,
            height: gif_height,
            global_palette,
            loop_count: 0,
            images,
        })
    }

    /// Encode straight to GIF89a bytes.
    pub fn encode_to_bytes<F: AsRef<Frame>>(&self, frames: &[F]) -> OpenCutResult<Vec<u8>> {
        self.encode(frames)?.to_bytes()
    }
}
