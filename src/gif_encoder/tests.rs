//! Encoder tests: document construction, GIF89a output and decoding back.

use std::io::Cursor;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::*;
use crate::capture::CapturedFrame;

fn frame_at(base: Instant, offset_ms: u64, width: u32, height: u32, seed: u8) -> Frame {
    let mut data = Vec::with_capacity((width * height * 4) as usize);
    for y in 0..height {
        for x in 0..width {
            data.extend_from_slice(&[
                (x as u8).wrapping_mul(16).wrapping_add(seed),
                (y as u8).wrapping_mul(16),
                seed,
                255,
            ]);
        }
    }
    Frame::new(
        CapturedFrame::new(data, width, height).unwrap(),
        base + Duration::from_millis(offset_ms),
    )
}

fn frames(offsets_ms: &[u64], width: u32, height: u32) -> Vec<Frame> {
    let base = Instant::now();
    offsets_ms
        .iter()
        .enumerate()
        .map(|(i, ms)| frame_at(base, *ms, width, height, (i * 40) as u8))
        .collect()
}

fn encoder(policy: PalettePolicy) -> GifEncoder {
    GifEncoder::new(policy, 80, 500, Duration::from_millis(66))
}

struct Decoded {
    delays: Vec<u16>,
    sizes: Vec<(u16, u16)>,
    screen: (u16, u16),
}

fn decode(bytes: &[u8]) -> Decoded {
    let mut options = gif::DecodeOptions::new();
    options.set_color_output(gif::ColorOutput::RGBA);
    let mut decoder = options.read_info(Cursor::new(bytes)).unwrap();
    let screen = (decoder.width(), decoder.height());

    let mut delays = Vec::new();
    let mut sizes = Vec::new();
    while let Some(frame) = decoder.read_next_frame().unwrap() {
        delays.push(frame.delay);
        sizes.push((frame.width, frame.height));
    }
    Decoded {
        delays,
        sizes,
        screen,
    }
}

#[test]
fn test_empty_input_is_rejected() {
    let empty: Vec<Frame> = Vec::new();
    let err = encoder(PalettePolicy::Global).encode(&empty).unwrap_err();
    assert!(matches!(err, OpenCutError::EmptyRecording));
}

#[test]
fn test_delays_from_timestamps() {
    let doc = encoder(PalettePolicy::Global)
        .encode(&frames(&[0, 100, 250], 4, 4))
        .unwrap();
    assert_eq!(doc.delays(), vec![10, 15, 15]);
    assert_eq!(doc.duration(), Duration::from_millis(400));
}

#[test]
fn test_single_frame_uses_frame_interval() {
    let doc = encoder(PalettePolicy::Global)
        .encode(&frames(&[0], 4, 4))
        .unwrap();
    assert_eq!(doc.delays(), vec![7]);
}

#[test]
fn test_global_policy_shares_one_palette() {
    let doc = encoder(PalettePolicy::Global)
        .encode(&frames(&[0, 50, 100], 8, 8))
        .unwrap();

    let global = doc.global_palette.as_ref().unwrap();
    assert!(!global.is_empty() && global.len() % 3 == 0);
    assert!(doc.images.iter().all(|i| i.palette.is_none()));
    let colors = global.len() / 3;
    assert!(doc
        .images
        .iter()
        .all(|i| i.indices.iter().all(|&idx| usize::from(idx) < colors)));
}

#[test]
fn test_per_frame_policy_has_local_palettes() {
    let doc = encoder(PalettePolicy::PerFrame)
        .encode(&frames(&[0, 50, 100], 8, 8))
        .unwrap();

    assert!(doc.global_palette.is_none());
    assert!(doc.images.iter().all(|i| i.palette.is_some()));
    assert!(doc.images.iter().all(|i| i.indices.len() == 64));
}

#[test]
fn test_encoding_is_deterministic() {
    let input = frames(&[0, 70, 140, 210], 16, 16);
    for policy in [PalettePolicy::Global, PalettePolicy::PerFrame] {
        let first = encoder(policy).encode_to_bytes(&input).unwrap();
        let second = encoder(policy).encode_to_bytes(&input).unwrap();
        assert_eq!(first, second, "{:?} output differs between runs", policy);
    }
}

#[test]
fn test_output_is_looping_gif89a() {
    let bytes = encoder(PalettePolicy::Global)
        .encode_to_bytes(&frames(&[0, 100], 4, 4))
        .unwrap();

    assert_eq!(&bytes[..6], b"GIF89a");
    assert_eq!(*bytes.last().unwrap(), 0x3B);
    assert!(bytes.windows(11).any(|w| w == b"NETSCAPE2.0"));
}

#[test]
fn test_decoder_round_trip() {
    let input = frames(&[0, 100, 250, 330], 12, 7);
    for policy in [PalettePolicy::Global, PalettePolicy::PerFrame] {
        let bytes = encoder(policy).encode_to_bytes(&input).unwrap();
        let decoded = decode(&bytes);

        assert_eq!(decoded.screen, (12, 7));
        assert_eq!(decoded.sizes, vec![(12, 7); 4]);
        assert_eq!(decoded.delays, vec![10, 15, 8, 8]);
    }
}

#[test]
fn test_exact_colors_survive_round_trip() {
    let base = Instant::now();
    let red = [255u8, 0, 0, 255].repeat(4);
    let blue = [0u8, 0, 255, 255].repeat(4);
    let input = vec![
        Frame::new(CapturedFrame::new(red, 2, 2).unwrap(), base),
        Frame::new(
            CapturedFrame::new(blue, 2, 2).unwrap(),
            base + Duration::from_millis(100),
        ),
    ];

    let bytes = encoder(PalettePolicy::Global).encode_to_bytes(&input).unwrap();

    let mut options = gif::DecodeOptions::new();
    options.set_color_output(gif::ColorOutput::RGBA);
    let mut decoder = options.read_info(Cursor::new(&bytes)).unwrap();
    let first = decoder.read_next_frame().unwrap().unwrap();
    assert_eq!(&first.buffer[..4], &[255, 0, 0, 255]);
    let second = decoder.read_next_frame().unwrap().unwrap();
    assert_eq!(&second.buffer[..4], &[0, 0, 255, 255]);
}

#[test]
fn test_accepts_shared_frames() {
    let input: Vec<Arc<Frame>> = frames(&[0, 100], 4, 4).into_iter().map(Arc::new).collect();
    let doc = encoder(PalettePolicy::Global).encode(&input).unwrap();
    assert_eq!(doc.frame_count(), 2);
}

#[test]
fn test_mismatched_dimensions_are_rejected() {
    let base = Instant::now();
    let input = vec![frame_at(base, 0, 4, 4, 0), frame_at(base, 100, 5, 4, 0)];
    let err = encoder(PalettePolicy::Global).encode(&input).unwrap_err();
    assert!(matches!(err, OpenCutError::EncoderError(_)));
}

#[test]
fn test_encoder_from_config() {
    let config = RecordingConfig {
        palette_policy: PalettePolicy::PerFrame,
        ..RecordingConfig::default()
    };
    assert_eq!(GifEncoder::from_config(&config).policy(), PalettePolicy::PerFrame);
    assert_eq!(GifEncoder::default().policy(), PalettePolicy::Global);
}
