//! Freeze and judder scoring.
//!
//! Both scorers are pure functions over the duration windows; the tracker
//! decides what to do with their results.

use crate::duration::{DurationSlot, FrameDurationWindow};

/// A freeze ending at the frame just rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Freeze {
    /// How long the previous image stayed on screen, in milliseconds. This
    /// includes the previous frame's own display time.
    pub duration_ms: i64,
    /// Time between the end of the previous freeze and the start of this
    /// one, in milliseconds, when there was a previous freeze.
    pub distance_ms: Option<i64>,
}

/// Detect a freeze ending at `actual_render_time_us`.
///
/// `actual` must already contain the duration of the frame just rendered. A
/// freeze happened when the frame before it was never rendered and some frame
/// was rendered before that.
pub fn detect_freeze(
    actual: &FrameDurationWindow,
    actual_render_time_us: i64,
    last_render_time_us: Option<i64>,
    last_freeze_end_time_us: Option<i64>,
) -> Option<Freeze> {
    if actual.slot(1) != DurationSlot::NotRendered {
        return None;
    }
    let last_render_time_us = last_render_time_us?;
    Some(Freeze {
        duration_ms: actual_render_time_us.saturating_sub(last_render_time_us) / 1000,
        distance_ms: last_freeze_end_time_us.map(|end| last_render_time_us.saturating_sub(end) / 1000),
    })
}

/// Judder score, in milliseconds, of the frame before the one just rendered.
///
/// Judder needs the durations on both sides of a frame, so it is always
/// scored one frame late. Returns `None` when there is no judder to record.
pub fn previous_judder_score(
    actual: &FrameDurationWindow,
    content: &FrameDurationWindow,
    judder_error_tolerance_us: i64,
) -> Option<i64> {
    // Drops next to the frame are scored as freezes instead.
    let [_, actual_us, prev_actual_us] = actual.known::<3>()?;
    let content_us = content.get(1)?;

    // A frame held for twice its duration or more is a pause, a rebuffer, or
    // deliberate slow playback. If it was unintentional a drop follows and
    // it is scored as a freeze.
    if actual_us >= content_us.saturating_mul(2) {
        return None;
    }

    let mut error_us = actual_us.saturating_sub(content_us);
    if error_us.saturating_abs() < judder_error_tolerance_us {
        return None;
    }

    // Errors that amplify the previous frame's error are penalized, errors
    // that catch up for it are not: (50, 16, 16, 50) vs (50, 16, 50, 16).
    if let Some(prev_content_us) = content.get(2) {
        let prev_error_us = prev_actual_us.saturating_sub(prev_content_us);
        if prev_error_us.saturating_abs() >= judder_error_tolerance_us {
            error_us = error_us
                .saturating_abs()
                .saturating_add(error_us.saturating_add(prev_error_us).saturating_abs());
        }
    }

    // Small cadence errors such as 3:2 pulldown are not judder.
    if error_us.saturating_abs() < content_us / 4 {
        return None;
    }

    let score_ms = error_us.saturating_abs() / 1000;
    (score_ms != 0).then_some(score_ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(timestamps: &[Option<i64>]) -> FrameDurationWindow {
        let mut w = FrameDurationWindow::new();
        for ts in timestamps {
            w.push(*ts);
        }
        w
    }

    fn render_windows(content_ms: i64, actual_ms: &[i64]) -> (FrameDurationWindow, FrameDurationWindow) {
        let mut content = FrameDurationWindow::new();
        let mut actual = FrameDurationWindow::new();
        let mut content_ts = 0;
        let mut actual_ts = 0;
        content.push(Some(content_ts));
        actual.push(Some(actual_ts));
        for d in actual_ms {
            content_ts += content_ms * 1000;
            actual_ts += d * 1000;
            content.push(Some(content_ts));
            actual.push(Some(actual_ts));
        }
        (actual, content)
    }

    #[test]
    fn test_freeze_after_dropped_frame() {
        let actual = window(&[Some(0), None, Some(50_000)]);
        let freeze = detect_freeze(&actual, 50_000, Some(0), None).unwrap();
        assert_eq!(freeze.duration_ms, 50);
        assert_eq!(freeze.distance_ms, None);
    }

    #[test]
    fn test_freeze_distance() {
        let actual = window(&[Some(100_000), None, Some(150_000)]);
        let freeze = detect_freeze(&actual, 150_000, Some(100_000), Some(40_000)).unwrap();
        assert_eq!(freeze.distance_ms, Some(60));
    }

    #[test]
    fn test_no_freeze_without_prior_render() {
        let actual = window(&[None, Some(50_000)]);
        assert_eq!(detect_freeze(&actual, 50_000, None, None), None);
    }

    #[test]
    fn test_no_freeze_after_reset() {
        // second frame after a reset: the slot behind it is unknown, not dropped
        let actual = window(&[Some(0), Some(16_000)]);
        assert_eq!(actual.slot(1), DurationSlot::Unknown);
        assert_eq!(detect_freeze(&actual, 16_000, Some(0), None), None);
    }

    #[test]
    fn test_steady_cadence_has_no_judder() {
        let (actual, content) = render_windows(33, &[33, 33, 33]);
        assert_eq!(previous_judder_score(&actual, &content, 2000), None);
    }

    #[test]
    fn test_isolated_error_is_judder() {
        // content 33 ms, actual 33 then 50 then 16
        let (actual, content) = render_windows(33, &[33, 50, 16]);
        assert_eq!(previous_judder_score(&actual, &content, 2000), Some(17));
    }

    #[test]
    fn test_amplifying_error_scores_higher_than_correction() {
        // both score the third frame: errors -17 then -17 vs -17 then +17
        let (actual, content) = render_windows(33, &[50, 16, 16, 50]);
        let amplified = previous_judder_score(&actual, &content, 2000);
        let (actual, content) = render_windows(33, &[50, 16, 50, 16]);
        let corrected = previous_judder_score(&actual, &content, 2000);
        assert_eq!(amplified, Some(51));
        assert_eq!(corrected, Some(17));
    }

    #[test]
    fn test_long_hold_is_not_judder() {
        let (actual, content) = render_windows(20, &[20, 40, 20]);
        assert_eq!(previous_judder_score(&actual, &content, 2000), None);
    }

    #[test]
    fn test_pulldown_cadence_is_not_judder() {
        let mut content = FrameDurationWindow::new();
        let mut actual = FrameDurationWindow::new();
        let mut c = 0;
        let mut a = 0;
        content.push(Some(c));
        actual.push(Some(a));
        for d in [50_000, 33_333, 50_000, 33_333] {
            c += 41_666;
            a += d;
            content.push(Some(c));
            actual.push(Some(a));
        }
        assert_eq!(previous_judder_score(&actual, &content, 2000), None);
    }

    #[test]
    fn test_adjacent_drop_is_not_judder() {
        let content = window(&[Some(0), Some(33_000), Some(66_000), Some(99_000)]);
        let actual = window(&[Some(0), Some(50_000), None, Some(99_000)]);
        assert_eq!(previous_judder_score(&actual, &content, 2000), None);
    }
}
