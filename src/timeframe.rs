//! Fetch window arithmetic
//!
//! A `Timeframe` is one contiguous half-open window `[start, end)` spanning
//! `size` intervals. `prev` and `next` tile the timeline exactly: stepping
//! back and forth visits every instant once, with no gap and no overlap, so
//! a walk over consecutive windows loses no records at the boundaries.

use crate::interval::Interval;

/// A half-open window of `size` intervals, `[start_ms, end_ms)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Timeframe {
    interval: Interval,
    size: u32,
    start_ms: i64,
    end_ms: i64,
}

impl Timeframe {
    /// The window starting at `anchor_ms`: `[anchor, anchor + size * duration)`.
    pub fn new(interval: Interval, size: u32, anchor_ms: i64) -> Self {
        let width = interval.duration_ms() * i64::from(size);
        Self {
            interval,
            size,
            start_ms: anchor_ms,
            end_ms: anchor_ms + width,
        }
    }

    /// The most recent complete window before `anchor_ms`: ends exactly at
    /// the anchor. This is where a backward history walk starts.
    pub fn ending_before(interval: Interval, size: u32, anchor_ms: i64) -> Self {
        Self::new(interval, size, anchor_ms).prev()
    }

    /// The adjacent earlier window. Its end is this window's start.
    pub fn prev(&self) -> Self {
        Self {
            interval: self.interval,
            size: self.size,
            start_ms: self.start_ms - self.width_ms(),
            end_ms: self.start_ms,
        }
    }

    /// The adjacent later window. Exact mirror of [`Timeframe::prev`].
    pub fn next(&self) -> Self {
        Self {
            interval: self.interval,
            size: self.size,
            start_ms: self.end_ms,
            end_ms: self.end_ms + self.width_ms(),
        }
    }

    pub fn interval(&self) -> Interval {
        self.interval
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    /// Window width in milliseconds, always `size * duration`
    pub fn width_ms(&self) -> i64 {
        self.interval.duration_ms() * i64::from(self.size)
    }

    pub fn start_ms(&self) -> i64 {
        self.start_ms
    }

    pub fn end_ms(&self) -> i64 {
        self.end_ms
    }

    /// Start in whole seconds, floored (correct for pre-epoch instants too)
    pub fn start_secs(&self) -> i64 {
        self.start_ms.div_euclid(1_000)
    }

    /// End in whole seconds, floored
    pub fn end_secs(&self) -> i64 {
        self.end_ms.div_euclid(1_000)
    }

    /// Whether a timestamp falls inside the window
    pub fn contains(&self, timestamp_ms: i64) -> bool {
        timestamp_ms >= self.start_ms && timestamp_ms < self.end_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ANCHOR: i64 = 1_700_000_000_000;

    #[test]
    fn test_width_invariant() {
        for interval in Interval::ALL {
            let tf = Timeframe::new(interval, 100, ANCHOR);
            assert_eq!(tf.end_ms() - tf.start_ms(), interval.duration_ms() * 100);
        }
    }

    #[test]
    fn test_ending_before_ends_at_anchor() {
        let tf = Timeframe::ending_before(Interval::Day1, 100, ANCHOR);
        assert_eq!(tf.end_ms(), ANCHOR);
        assert_eq!(tf.start_ms(), ANCHOR - 100 * 86_400_000);
    }

    #[test]
    fn test_prev_tiles_without_gap_or_overlap() {
        let tf = Timeframe::ending_before(Interval::Hour1, 24, ANCHOR);
        let earlier = tf.prev();
        assert_eq!(earlier.end_ms(), tf.start_ms());
        assert_eq!(earlier.width_ms(), tf.width_ms());
        // the boundary instant belongs to exactly one window
        assert!(tf.contains(tf.start_ms()));
        assert!(!earlier.contains(tf.start_ms()));
        assert!(earlier.contains(tf.start_ms() - 1));
    }

    #[test]
    fn test_prev_next_roundtrip() {
        for interval in Interval::ALL {
            for size in [1u32, 7, 100, 1_000] {
                let tf = Timeframe::new(interval, size, ANCHOR);
                let mut walked = tf;
                for _ in 0..5 {
                    walked = walked.prev();
                    assert_eq!(walked.end_ms() - walked.start_ms(), tf.width_ms());
                }
                for _ in 0..5 {
                    walked = walked.next();
                }
                assert_eq!(walked, tf);
            }
        }
    }

    #[test]
    fn test_second_accessors_floor_negative_timestamps() {
        let tf = Timeframe::new(Interval::Min1, 1, -1_500);
        assert_eq!(tf.start_secs(), -2);
        assert_eq!(tf.end_ms(), 58_500);
        assert_eq!(tf.end_secs(), 58);
    }
}
