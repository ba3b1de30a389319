//! Colour reduction to 8-bit palettes.
//!
//! Both policies use an exact palette when the input has at most 256
//! colours and the NeuQuant quantizer otherwise, so the output is a pure
//! function of the input pixels and the quantizer speed. Per-frame palettes
//! come from `gif::Frame::from_rgba_speed`; the global palette drives
//! `color_quant::NeuQuant` directly and reuses its nearest-colour search to
//! map every frame. No dithering is applied.

use std::collections::{BTreeSet, HashMap};

use color_quant::NeuQuant;

use serde::{Deserialize, Serialize};

use crate::capture::{Frame, BYTES_PER_PIXEL};

/// Upper bound on pixels fed to the quantizer when building a global palette.
pub const GLOBAL_SAMPLE_LIMIT: usize = 65_535;

/// How frames are reduced to 256 colours.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PalettePolicy {
    /// One palette for the whole animation, built from a strided sample of
    /// every frame. Smaller files, more banding.
    #[default]
    Global,
    /// An adaptive palette per frame. Larger files, better fidelity.
    PerFrame,
}

/// Convert quality (1-100) to NeuQuant speed (1-30).
///
/// quality 100 -> speed 1 (slowest, best), quality 1 -> speed 29.
pub fn quality_to_speed(quality: u32) -> i32 {
    let normalized = 100 - quality.clamp(1, 100) as i32;
    (normalized * 29 / 100 + 1).clamp(1, 30)
}

/// RGBA copy of `pixels` with alpha forced opaque, so the quantizer never
/// reserves a transparent index.
fn opaque_copy(pixels: &[u8]) -> Vec<u8> {
    let mut copy = pixels.to_vec();
    for px in copy.chunks_exact_mut(BYTES_PER_PIXEL) {
        px[3] = 0xFF;
    }
    copy
}

/// Evenly spaced pixels across all frames, at most `GLOBAL_SAMPLE_LIMIT`.
pub fn sample_pixels<F: AsRef<Frame>>(frames: &[F]) -> Vec<u8> {
    let total: usize = frames
        .iter()
        .map(|f| f.as_ref().byte_len() / BYTES_PER_PIXEL)
        .sum();
    let stride = total.div_ceil(GLOBAL_SAMPLE_LIMIT).max(1);

    let mut sample = Vec::with_capacity(total.min(GLOBAL_SAMPLE_LIMIT) * BYTES_PER_PIXEL);
    let mut index = 0usize;
    for frame in frames {
        for px in frame.as_ref().pixels().chunks_exact(BYTES_PER_PIXEL) {
            if index % stride == 0 {
                sample.extend_from_slice(&[px[0], px[1], px[2], 0xFF]);
            }
            index += 1;
        }
    }
    sample
}

/// Quantize `rgba` (opaque) and return `(palette, indices)`.
///
/// `palette` holds RGB triples; `indices` has one entry per input pixel.
fn quantize(rgba: &mut [u8], speed: i32) -> (Vec<u8>, Vec<u8>) {
    let pixel_count = rgba.len() / BYTES_PER_PIXEL;
    // Lay the pixels out as rows of at most u16::MAX so any length fits the
    // quantizer's width/height arguments.
    let width = pixel_count.min(u16::MAX as usize).max(1);
    let height = pixel_count.div_ceil(width).max(1);

    let mut padded;
    let buffer: &mut [u8] = if width * height == pixel_count {
        rgba
    } else {
        padded = rgba.to_vec();
        let last = padded[padded.len() - BYTES_PER_PIXEL..].to_vec();
        while padded.len() < width * height * BYTES_PER_PIXEL {
            padded.extend_from_slice(&last);
        }
        &mut padded
    };

    let frame = gif::Frame::from_rgba_speed(width as u16, height as u16, buffer, speed);
    let palette = frame.palette.clone().unwrap_or_default();
    let mut indices = frame.buffer.into_owned();
    indices.truncate(pixel_count);
    (palette, indices)
}

/// One palette shared by every frame of a recording, with its pixel lookup.
pub struct GlobalPalette {
    colors: Vec<u8>,
    lookup: Lookup,
}

enum Lookup {
    /// The sample held at most 256 colours and they form the palette as is.
    Exact(PaletteMapper),
    /// Palette learned by NeuQuant, which also maps the pixels.
    Learned(NeuQuant),
}

impl GlobalPalette {
    /// Build the palette from a strided sample of every frame.
    pub fn build<F: AsRef<Frame>>(frames: &[F], speed: i32) -> Self {
        let sample = sample_pixels(frames);

        let mut distinct = BTreeSet::new();
        let exact = sample.chunks_exact(BYTES_PER_PIXEL).all(|px| {
            distinct.insert([px[0], px[1], px[2]]);
            distinct.len() <= 256
        });

        let palette = if exact {
            let colors: Vec<u8> = if distinct.is_empty() {
                vec![0, 0, 0]
            } else {
                distinct.iter().flatten().copied().collect()
            };
            Self {
                lookup: Lookup::Exact(PaletteMapper::new(&colors)),
                colors,
            }
        } else {
            let quantizer = NeuQuant::new(speed, 256, &sample);
            Self {
                colors: quantizer.color_map_rgb(),
                lookup: Lookup::Learned(quantizer),
            }
        };

        log::debug!(
            "[GIF] Global palette: {} colours from {} sampled pixels ({})",
            palette.len(),
            sample.len() / BYTES_PER_PIXEL,
            if exact { "exact" } else { "learned" }
        );
        palette
    }

    /// RGB triples, at most 256 of them.
    pub fn colors(&self) -> &[u8] {
        &self.colors
    }

    pub fn len(&self) -> usize {
        self.colors.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Index buffer for an RGBA pixel slice.
    pub fn map_pixels(&mut self, rgba: &[u8]) -> Vec<u8> {
        match &mut self.lookup {
            Lookup::Exact(mapper) => mapper.map_pixels(rgba),
            Lookup::Learned(quantizer) => rgba
                .chunks_exact(BYTES_PER_PIXEL)
                .map(|px| quantizer.index_of(&[px[0], px[1], px[2], 0xFF]) as u8)
                .collect(),
        }
    }
}

/// Adaptive palette and index buffer for a single frame.
pub fn quantize_frame(frame: &Frame, speed: i32) -> (Vec<u8>, Vec<u8>) {
    let mut rgba = opaque_copy(frame.pixels());
    quantize(&mut rgba, speed)
}

/// Maps true-colour pixels to the nearest entry of a small fixed palette.
///
/// Nearest is squared RGB distance; ties go to the lowest index. Lookups are
/// cached, so frames made of palette colours cost one hash lookup per pixel.
pub struct PaletteMapper {
    colors: Vec<[u8; 3]>,
    cache: HashMap<[u8; 3], u8>,
}

impl PaletteMapper {
    pub fn new(palette: &[u8]) -> Self {
        let colors = palette
            .chunks_exact(3)
            .take(256)
            .map(|c| [c[0], c[1], c[2]])
            .collect();
        Self {
            colors,
            cache: HashMap::new(),
        }
    }

    pub fn index_of(&mut self, rgb: [u8; 3]) -> u8 {
        if let Some(&idx) = self.cache.get(&rgb) {
            return idx;
        }

        let mut best = 0usize;
        let mut best_dist = u32::MAX;
        for (i, c) in self.colors.iter().enumerate() {
            let dr = i32::from(c[0]) - i32::from(rgb[0]);
            let dg = i32::from(c[1]) - i32::from(rgb[1]);
            let db = i32::from(c[2]) - i32::from(rgb[2]);
            let dist = (dr * dr + dg * dg + db * db) as u32;
            if dist < best_dist {
                best = i;
                best_dist = dist;
                if dist == 0 {
                    break;
                }
            }
        }

        let idx = best as u8;
        self.cache.insert(rgb, idx);
        idx
    }

    /// Index buffer for an RGBA pixel slice.
    pub fn map_pixels(&mut self, rgba: &[u8]) -> Vec<u8> {
        rgba.chunks_exact(BYTES_PER_PIXEL)
            .map(|px| self.index_of([px[0], px[1], px[2]]))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::CapturedFrame;
    use std::time::Instant;

    fn solid(width: u32, height: u32, rgb: [u8; 3]) -> Frame {
        let data = [rgb[0], rgb[1], rgb[2], 255].repeat((width * height) as usize);
        Frame::new(CapturedFrame::new(data, width, height).unwrap(), Instant::now())
    }

    fn gradient(width: u32, height: u32, shift: u32) -> Frame {
        let mut data = Vec::new();
        for i in 0..(width * height) {
            let i = i + shift;
            data.extend_from_slice(&[(i % 256) as u8, (i / 4 % 256) as u8, (i * 7 % 256) as u8, 255]);
        }
        Frame::new(CapturedFrame::new(data, width, height).unwrap(), Instant::now())
    }

    #[test]
    fn test_quality_to_speed() {
        assert_eq!(quality_to_speed(100), 1);
        assert_eq!(quality_to_speed(1), 29);
        assert_eq!(quality_to_speed(0), 29);
        assert_eq!(quality_to_speed(80), 6);
    }

    #[test]
    fn test_policy_serde_names() {
        assert_eq!(serde_json::to_string(&PalettePolicy::PerFrame).unwrap(), "\"perFrame\"");
        assert_eq!(PalettePolicy::default(), PalettePolicy::Global);
    }

    #[test]
    fn test_sample_respects_limit() {
        let frames = vec![solid(300, 300, [1, 2, 3]), solid(300, 300, [4, 5, 6])];
        let sample = sample_pixels(&frames);
        assert!(sample.len() / BYTES_PER_PIXEL <= GLOBAL_SAMPLE_LIMIT);
        // Both frames contribute
        assert!(sample.chunks_exact(4).any(|p| p[..3] == [1, 2, 3]));
        assert!(sample.chunks_exact(4).any(|p| p[..3] == [4, 5, 6]));
    }

    #[test]
    fn test_global_palette_keeps_exact_colors() {
        let frames = vec![solid(4, 4, [255, 0, 0]), solid(4, 4, [0, 0, 255])];
        let mut palette = GlobalPalette::build(&frames, 10);
        assert_eq!(palette.colors(), &[0, 0, 255, 255, 0, 0]);
        assert_eq!(palette.map_pixels(frames[0].pixels()), vec![1; 16]);
        assert_eq!(palette.map_pixels(frames[1].pixels()), vec![0; 16]);
    }

    #[test]
    fn test_global_palette_learns_from_many_colors() {
        let frames: Vec<Frame> = (0..3).map(|shift| gradient(64, 64, shift)).collect();
        let mut palette = GlobalPalette::build(&frames, 10);
        assert!(palette.len() > 1 && palette.len() <= 256);

        let first = palette.map_pixels(frames[1].pixels());
        assert_eq!(first.len(), 64 * 64);
        assert!(first.iter().all(|&i| (i as usize) < palette.len()));

        // Same input, same palette, same indices
        let mut rebuilt = GlobalPalette::build(&frames, 10);
        assert_eq!(rebuilt.colors(), palette.colors());
        assert_eq!(rebuilt.map_pixels(frames[1].pixels()), first);
    }

    #[test]
    fn test_global_palette_for_no_frames() {
        let frames: Vec<Frame> = Vec::new();
        let mut palette = GlobalPalette::build(&frames, 10);
        assert_eq!(palette.colors(), &[0, 0, 0]);
        assert!(palette.map_pixels(&[]).is_empty());
    }

    #[test]
    fn test_mapper_picks_nearest_and_breaks_ties_low() {
        let mut mapper = PaletteMapper::new(&[0, 0, 0, 255, 255, 255, 0, 0, 0]);
        assert_eq!(mapper.index_of([10, 10, 10]), 0);
        assert_eq!(mapper.index_of([250, 240, 255]), 1);
        // Exact duplicate entries resolve to the first
        assert_eq!(mapper.index_of([0, 0, 0]), 0);
        assert_eq!(mapper.map_pixels(&[255, 255, 255, 255, 1, 1, 1, 255]), vec![1, 0]);
    }

    #[test]
    fn test_quantize_frame_is_deterministic() {
        let frame = gradient(32, 32, 0);

        let first = quantize_frame(&frame, 10);
        let second = quantize_frame(&frame, 10);
        assert_eq!(first, second);
        assert_eq!(first.1.len(), 32 * 32);
        assert!(first.0.len() <= 256 * 3);
    }
}
