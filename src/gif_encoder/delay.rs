//! Frame delay computation.
//!
//! GIF stores per-frame display time in hundredths of a second. Delays are
//! derived from the gap to the next frame's capture time; the last frame has
//! no successor and repeats the previous delay.

use std::time::{Duration, Instant};

/// Smallest delay the format can express.
pub const MIN_DELAY_CS: u16 = 1;

/// Convert a duration to centiseconds, rounding half up, clamped to
/// `[MIN_DELAY_CS, max_cs]`.
pub fn duration_to_cs(duration: Duration, max_cs: u16) -> u16 {
    let cs = (duration.as_micros() + 5_000) / 10_000;
    cs.clamp(u128::from(MIN_DELAY_CS), u128::from(max_cs.max(MIN_DELAY_CS))) as u16
}

/// Delays for frames captured at `timestamps`.
///
/// `fallback` is used when there is a single frame and therefore no gap to
/// measure.
pub fn compute_delays(timestamps: &[Instant], fallback: Duration, max_cs: u16) -> Vec<u16> {
    match timestamps.len() {
        0 => Vec::new(),
        1 => vec![duration_to_cs(fallback, max_cs)],
        _ => {
            let mut delays: Vec<u16> = timestamps
                .windows(2)
                .map(|pair| duration_to_cs(pair[1].saturating_duration_since(pair[0]), max_cs))
                .collect();
            let last = delays[delays.len() - 1];
            delays.push(last);
            delays
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stamps(offsets_ms: &[u64]) -> Vec<Instant> {
        let base = Instant::now();
        offsets_ms
            .iter()
            .map(|ms| base + Duration::from_millis(*ms))
            .collect()
    }

    #[test]
    fn test_last_frame_repeats_previous_delay() {
        let delays = compute_delays(&stamps(&[0, 100, 250]), Duration::from_millis(66), 500);
        assert_eq!(delays, vec![10, 15, 15]);
    }

    #[test]
    fn test_rounding_to_nearest_centisecond() {
        assert_eq!(duration_to_cs(Duration::from_millis(66), 500), 7);
        assert_eq!(duration_to_cs(Duration::from_millis(64), 500), 6);
        assert_eq!(duration_to_cs(Duration::from_millis(65), 500), 7);
    }

    #[test]
    fn test_clamped_to_format_minimum() {
        let delays = compute_delays(&stamps(&[0, 2, 4]), Duration::from_millis(66), 500);
        assert_eq!(delays, vec![MIN_DELAY_CS; 3]);
    }

    #[test]
    fn test_clamped_to_max_delay() {
        let delays = compute_delays(&stamps(&[0, 30_000]), Duration::from_millis(66), 500);
        assert_eq!(delays, vec![500, 500]);
    }

    #[test]
    fn test_single_frame_uses_fallback() {
        assert_eq!(compute_delays(&stamps(&[0]), Duration::from_millis(100), 500), vec![10]);
        assert!(compute_delays(&[], Duration::from_millis(100), 500).is_empty());
    }
}
