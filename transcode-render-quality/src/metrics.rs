//! Render quality metrics snapshot.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::RenderQualityConfig;
use crate::framerate::FrameRate;
use crate::histogram::Histogram;

/// Video rendering quality metrics for one playback session.
///
/// Counts, rates and histograms are updated as frame events arrive. The
/// derived scores and rates at the bottom are only filled in on snapshots
/// taken through [`RenderQualityTracker::metrics`](crate::RenderQualityTracker::metrics).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoRenderQualityMetrics {
    /// Render time of the first frame (µs).
    pub first_render_time_us: Option<i64>,
    /// Frames released to be rendered.
    pub frame_released_count: u64,
    /// Frames actually rendered.
    pub frame_rendered_count: u64,
    /// Frames released but never rendered.
    pub frame_dropped_count: u64,
    /// Frames the app intentionally did not render.
    pub frame_skipped_count: u64,

    /// Frame rate of the content timestamps.
    pub content_frame_rate: FrameRate,
    /// Frame rate of the render times requested by the app.
    pub desired_frame_rate: FrameRate,
    /// Frame rate of the render times reported by the display.
    pub actual_frame_rate: FrameRate,

    /// Durations of freezes caused by dropped or skipped frames (ms).
    pub freeze_duration_ms_histogram: Histogram,
    /// Durations between freezes (ms).
    pub freeze_distance_ms_histogram: Histogram,
    /// Judder scores.
    pub judder_score_histogram: Histogram,

    /// Overall freeze score from the freeze duration histogram.
    pub freeze_score: i64,
    /// Fraction of playback time spent frozen.
    pub freeze_rate: f32,
    /// Overall judder score from the judder score histogram.
    pub judder_score: i64,
    /// Fraction of frames that juddered.
    pub judder_rate: f32,
}

impl VideoRenderQualityMetrics {
    /// Empty metrics with histograms laid out per `config`.
    pub fn new(config: &RenderQualityConfig) -> Self {
        Self {
            first_render_time_us: None,
            frame_released_count: 0,
            frame_rendered_count: 0,
            frame_dropped_count: 0,
            frame_skipped_count: 0,
            content_frame_rate: FrameRate::Undetermined,
            desired_frame_rate: FrameRate::Undetermined,
            actual_frame_rate: FrameRate::Undetermined,
            freeze_duration_ms_histogram: Histogram::new(&config.freeze_duration_ms_buckets),
            freeze_distance_ms_histogram: Histogram::new(&config.freeze_distance_ms_buckets),
            judder_score_histogram: Histogram::new(&config.judder_score_buckets),
            freeze_score: 0,
            freeze_rate: 0.0,
            judder_score: 0,
            judder_rate: 0.0,
        }
    }

    /// A copy of these metrics with the scores and rates computed.
    ///
    /// `render_duration_us` is the total wall time covered by rendering.
    /// Rates with a zero denominator are reported as `0.0`.
    pub fn with_derived(&self, config: &RenderQualityConfig, render_duration_us: i64) -> Self {
        let mut m = self.clone();

        m.freeze_score = if config.freeze_score_enabled() {
            m.freeze_duration_ms_histogram
                .weighted_suffix_score(&config.freeze_duration_ms_score_weights)
        } else {
            0
        };
        m.freeze_rate = if render_duration_us > 0 {
            let render_duration_ms = render_duration_us as f64 / 1000.0;
            (m.freeze_duration_ms_histogram.sum() as f64 / render_duration_ms) as f32
        } else {
            0.0
        };

        m.judder_score = if config.judder_score_enabled() {
            m.judder_score_histogram
                .weighted_suffix_score(&config.judder_score_weights)
        } else {
            0
        };
        let judder_opportunities = m.frame_released_count + m.frame_skipped_count;
        m.judder_rate = if judder_opportunities > 0 {
            (m.judder_score_histogram.count() as f64 / judder_opportunities as f64) as f32
        } else {
            0.0
        };

        m
    }
}

impl Default for VideoRenderQualityMetrics {
    fn default() -> Self {
        Self::new(&RenderQualityConfig::default())
    }
}

impl fmt::Display for VideoRenderQualityMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Render Quality")?;
        writeln!(
            f,
            "  Frames:      released={} rendered={} dropped={} skipped={}",
            self.frame_released_count,
            self.frame_rendered_count,
            self.frame_dropped_count,
            self.frame_skipped_count
        )?;
        writeln!(
            f,
            "  Frame rate:  content={} desired={} actual={}",
            self.content_frame_rate, self.desired_frame_rate, self.actual_frame_rate
        )?;
        writeln!(
            f,
            "  Freeze:      score={} rate={:.4} durations=[{}] distances=[{}]",
            self.freeze_score,
            self.freeze_rate,
            self.freeze_duration_ms_histogram.emit(),
            self.freeze_distance_ms_histogram.emit()
        )?;
        write!(
            f,
            "  Judder:      score={} rate={:.4} scores=[{}]",
            self.judder_score,
            self.judder_rate,
            self.judder_score_histogram.emit()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_zeroed() {
        let c = RenderQualityConfig::default();
        let m = VideoRenderQualityMetrics::new(&c);
        assert_eq!(m.frame_released_count, 0);
        assert_eq!(m.actual_frame_rate, FrameRate::Undetermined);
        assert_eq!(
            m.freeze_duration_ms_histogram.bucket_count(),
            c.freeze_duration_ms_buckets.len()
        );
        assert!(m.judder_score_histogram.is_empty());
    }

    #[test]
    fn test_zero_denominators_give_zero_rates() {
        let c = RenderQualityConfig::default();
        let m = VideoRenderQualityMetrics::new(&c).with_derived(&c, 0);
        assert_eq!(m.freeze_rate, 0.0);
        assert_eq!(m.judder_rate, 0.0);
        assert_eq!(m.freeze_score, 0);
        assert_eq!(m.judder_score, 0);
    }

    #[test]
    fn test_freeze_rate_and_score() {
        let c = RenderQualityConfig::default();
        let mut m = VideoRenderQualityMetrics::new(&c);
        m.freeze_duration_ms_histogram.insert(50);
        m.freeze_duration_ms_histogram.insert(150);
        let d = m.with_derived(&c, 1_000_000);
        assert!((d.freeze_rate - 0.2).abs() < 1e-6);
        // 50 ms reaches buckets 0..=3 (upper bound 60), 150 ms reaches 0..=7
        assert_eq!(d.freeze_score, 4 + 8);
    }

    #[test]
    fn test_judder_rate() {
        let c = RenderQualityConfig::default();
        let mut m = VideoRenderQualityMetrics::new(&c);
        m.frame_released_count = 8;
        m.frame_skipped_count = 2;
        m.judder_score_histogram.insert(17);
        let d = m.with_derived(&c, 0);
        assert!((d.judder_rate - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_mismatched_weights_disable_score() {
        let c = RenderQualityConfig::default().with_freeze_duration_ms_score_weights(&[1, 1]);
        let mut m = VideoRenderQualityMetrics::new(&c);
        m.freeze_duration_ms_histogram.insert(50);
        let d = m.with_derived(&c, 1_000_000);
        assert_eq!(d.freeze_score, 0);
        assert_eq!(d.freeze_duration_ms_histogram.count(), 1);
    }

    #[test]
    fn test_with_derived_does_not_mutate() {
        let c = RenderQualityConfig::default();
        let mut m = VideoRenderQualityMetrics::new(&c);
        m.freeze_duration_ms_histogram.insert(50);
        let before = m.clone();
        let _ = m.with_derived(&c, 1_000_000);
        assert_eq!(m, before);
    }

    #[test]
    fn test_serializes_to_json() {
        let m = VideoRenderQualityMetrics::default();
        let json = serde_json::to_string(&m).unwrap();
        assert!(json.contains("\"frame_released_count\":0"));
        assert!(json.contains("\"actual_frame_rate\":\"undetermined\""));
    }
}
