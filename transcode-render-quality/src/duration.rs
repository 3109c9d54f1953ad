//! Sliding window of recent frame durations.

/// Number of durations kept per window. Pulldown detection needs five.
pub const WINDOW_SIZE: usize = 5;

/// One slot of a [`FrameDurationWindow`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DurationSlot {
    /// No prior timestamp to measure from (first frame, or after a reset).
    #[default]
    Unknown,
    /// The frame at this position was skipped or dropped.
    NotRendered,
    /// Measured duration in microseconds.
    Known(i64),
}

impl DurationSlot {
    /// The duration, if one was measured.
    pub fn us(self) -> Option<i64> {
        match self {
            Self::Known(us) => Some(us),
            _ => None,
        }
    }

    /// Check if this slot carries a duration.
    pub fn is_known(self) -> bool {
        matches!(self, Self::Known(_))
    }
}

/// The most recent frame durations for one timeline (content, desired or
/// actual render time). Index 0 is the duration ending at the last pushed
/// timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FrameDurationWindow {
    slots: [DurationSlot; WINDOW_SIZE],
    prior_timestamp_us: Option<i64>,
}

impl FrameDurationWindow {
    /// Create an empty window.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the next frame's timestamp, or `None` when the frame was not
    /// rendered on this timeline.
    ///
    /// A missing timestamp leaves the prior timestamp untouched, so the next
    /// real timestamp measures across the gap.
    pub fn push(&mut self, timestamp_us: Option<i64>) {
        let slot = match timestamp_us {
            None => DurationSlot::NotRendered,
            Some(ts) => {
                let slot = match self.prior_timestamp_us {
                    Some(prior) => DurationSlot::Known(ts.saturating_sub(prior)),
                    None => DurationSlot::Unknown,
                };
                self.prior_timestamp_us = Some(ts);
                slot
            }
        };
        self.slots.rotate_right(1);
        self.slots[0] = slot;
    }

    /// Forget all durations and the prior timestamp.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Slot at `index` (0 = most recent). Out-of-range indices read as unknown.
    pub fn slot(&self, index: usize) -> DurationSlot {
        self.slots.get(index).copied().unwrap_or_default()
    }

    /// Duration at `index` in microseconds, if known.
    pub fn get(&self, index: usize) -> Option<i64> {
        self.slot(index).us()
    }

    /// The first `N` durations, or `None` if any of them is not known.
    pub fn known<const N: usize>(&self) -> Option<[i64; N]> {
        let mut out = [0i64; N];
        for (i, value) in out.iter_mut().enumerate() {
            *value = self.get(i)?;
        }
        Some(out)
    }

    /// Timestamp the next duration will be measured from.
    pub fn prior_timestamp_us(&self) -> Option<i64> {
        self.prior_timestamp_us
    }

    /// All slots, most recent first.
    pub fn slots(&self) -> &[DurationSlot; WINDOW_SIZE] {
        &self.slots
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_push_is_unknown() {
        let mut w = FrameDurationWindow::new();
        w.push(Some(1_000));
        assert_eq!(w.slot(0), DurationSlot::Unknown);
        assert_eq!(w.prior_timestamp_us(), Some(1_000));
    }

    #[test]
    fn test_push_measures_from_prior() {
        let mut w = FrameDurationWindow::new();
        w.push(Some(0));
        w.push(Some(16_667));
        w.push(Some(33_334));
        assert_eq!(w.get(0), Some(16_667));
        assert_eq!(w.get(1), Some(16_667));
        assert_eq!(w.slot(2), DurationSlot::Unknown);
    }

    #[test]
    fn test_missing_timestamp_spans_gap() {
        let mut w = FrameDurationWindow::new();
        w.push(Some(0));
        w.push(Some(10_000));
        w.push(None);
        assert_eq!(w.slot(0), DurationSlot::NotRendered);
        assert_eq!(w.prior_timestamp_us(), Some(10_000));
        w.push(Some(30_000));
        assert_eq!(w.get(0), Some(20_000));
        assert_eq!(w.slot(1), DurationSlot::NotRendered);
        assert_eq!(w.get(2), Some(10_000));
    }

    #[test]
    fn test_oldest_discarded() {
        let mut w = FrameDurationWindow::new();
        for i in 0..=WINDOW_SIZE as i64 + 1 {
            w.push(Some(i * 100 * (i + 1)));
        }
        assert!(w.slots().iter().all(|s| s.is_known()));
        assert_eq!(w.slot(WINDOW_SIZE), DurationSlot::Unknown);
    }

    #[test]
    fn test_known_requires_all() {
        let mut w = FrameDurationWindow::new();
        w.push(Some(0));
        w.push(Some(10));
        w.push(Some(30));
        assert_eq!(w.known::<2>(), Some([20, 10]));
        assert_eq!(w.known::<3>(), None);
    }

    #[test]
    fn test_extreme_timestamps_saturate() {
        let mut w = FrameDurationWindow::new();
        w.push(Some(i64::MIN));
        w.push(Some(i64::MAX));
        assert_eq!(w.get(0), Some(i64::MAX));
    }

    #[test]
    fn test_reset() {
        let mut w = FrameDurationWindow::new();
        w.push(Some(0));
        w.push(Some(10));
        w.reset();
        assert_eq!(w, FrameDurationWindow::new());
        assert_eq!(w.prior_timestamp_us(), None);
    }
}
