//! Tracker configuration.

use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{RenderQualityError, Result};

/// Freeze duration bucket upper bounds in milliseconds.
pub const DEFAULT_FREEZE_DURATION_MS_BUCKETS: [i64; 13] =
    [1, 20, 40, 60, 80, 100, 120, 150, 175, 225, 300, 400, 500];

/// Per-bucket weights for the freeze score.
pub const DEFAULT_FREEZE_DURATION_MS_SCORE_WEIGHTS: [i64; 13] = [1; 13];

/// Bucket upper bounds in milliseconds for the distance between freezes.
pub const DEFAULT_FREEZE_DISTANCE_MS_BUCKETS: [i64; 12] =
    [0, 20, 100, 400, 1000, 2000, 3000, 4000, 8000, 15000, 30000, 60000];

/// Judder score bucket upper bounds in milliseconds.
pub const DEFAULT_JUDDER_SCORE_BUCKETS: [i64; 12] = [1, 4, 5, 9, 11, 20, 30, 40, 50, 60, 70, 80];

/// Per-bucket weights for the judder score.
pub const DEFAULT_JUDDER_SCORE_WEIGHTS: [i64; 12] = [1; 12];

/// Configuration for a [`RenderQualityTracker`](crate::RenderQualityTracker).
///
/// All durations are in microseconds unless the field name says otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderQualityConfig {
    /// Whether render quality is tracked at all.
    pub enabled: bool,
    /// Whether frames the app chose not to render are treated as dropped.
    pub skipped_frames_are_dropped: bool,
    /// Largest forward step in content time that is still a normal frame.
    /// 400ms is 8 frames at 20fps and 24 frames at 60fps.
    pub max_expected_content_frame_duration_us: i64,
    /// Allowed deviation between frame durations when detecting a frame rate.
    pub frame_rate_detection_tolerance_us: i64,
    /// Allowed mismatch between a content-time jump and the app's desired
    /// render-time step for the jump to count as live-content frame drops
    /// rather than a seek.
    pub live_content_advance_tolerance_us: i64,
    /// Freeze duration histogram bucket upper bounds (ms).
    pub freeze_duration_ms_buckets: Vec<i64>,
    /// Freeze score weights, one per freeze duration bucket.
    pub freeze_duration_ms_score_weights: Vec<i64>,
    /// Freeze distance histogram bucket upper bounds (ms).
    pub freeze_distance_ms_buckets: Vec<i64>,
    /// Frame duration errors below this are not judder.
    pub judder_error_tolerance_us: i64,
    /// Judder score histogram bucket upper bounds.
    pub judder_score_buckets: Vec<i64>,
    /// Judder score weights, one per judder bucket.
    pub judder_score_weights: Vec<i64>,
}

impl Default for RenderQualityConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            // Apps usually skip a frame because they know it can't be shown in time.
            skipped_frames_are_dropped: true,
            max_expected_content_frame_duration_us: 400 * 1000,
            frame_rate_detection_tolerance_us: 2 * 1000,
            live_content_advance_tolerance_us: 200 * 1000,
            freeze_duration_ms_buckets: DEFAULT_FREEZE_DURATION_MS_BUCKETS.to_vec(),
            freeze_duration_ms_score_weights: DEFAULT_FREEZE_DURATION_MS_SCORE_WEIGHTS.to_vec(),
            freeze_distance_ms_buckets: DEFAULT_FREEZE_DISTANCE_MS_BUCKETS.to_vec(),
            judder_error_tolerance_us: 2 * 1000,
            judder_score_buckets: DEFAULT_JUDDER_SCORE_BUCKETS.to_vec(),
            judder_score_weights: DEFAULT_JUDDER_SCORE_WEIGHTS.to_vec(),
        }
    }
}

/// Keys understood by [`RenderQualityConfig::from_flags`].
pub mod flags {
    /// `bool`
    pub const ENABLED: &str = "render_metrics_enabled";
    /// `bool`
    pub const SKIPPED_FRAMES_ARE_DROPPED: &str = "render_metrics_are_skipped_frames_dropped";
    /// integer µs
    pub const MAX_EXPECTED_CONTENT_FRAME_DURATION_US: &str =
        "render_metrics_max_expected_content_frame_duration_us";
    /// integer µs
    pub const FRAME_RATE_DETECTION_TOLERANCE_US: &str =
        "render_metrics_frame_rate_detection_tolerance_us";
    /// integer µs
    pub const LIVE_CONTENT_ADVANCE_TOLERANCE_US: &str =
        "render_metrics_content_time_advanced_for_live_content_tolerance_us";
    /// comma-separated integers
    pub const FREEZE_DURATION_MS_BUCKETS: &str = "render_metrics_freeze_duration_ms_histogram_buckets";
    /// comma-separated integers
    pub const FREEZE_DURATION_MS_SCORE_WEIGHTS: &str =
        "render_metrics_freeze_duration_ms_histogram_to_score";
    /// comma-separated integers
    pub const FREEZE_DISTANCE_MS_BUCKETS: &str = "render_metrics_freeze_distance_ms_histogram_buckets";
    /// integer µs
    pub const JUDDER_ERROR_TOLERANCE_US: &str = "render_metrics_judder_error_tolerance_us";
    /// comma-separated integers
    pub const JUDDER_SCORE_BUCKETS: &str = "render_metrics_judder_score_histogram_buckets";
    /// comma-separated integers
    pub const JUDDER_SCORE_WEIGHTS: &str = "render_metrics_judder_score_histogram_to_score";
}

impl RenderQualityConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// A configuration that turns every event into a no-op.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    /// Set whether tracking is enabled.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set whether skipped frames count as dropped.
    pub fn with_skipped_frames_are_dropped(mut self, dropped: bool) -> Self {
        self.skipped_frames_are_dropped = dropped;
        self
    }

    /// Set the largest expected content frame duration.
    pub fn with_max_expected_content_frame_duration_us(mut self, us: i64) -> Self {
        self.max_expected_content_frame_duration_us = us;
        self
    }

    /// Set the frame rate detection tolerance.
    pub fn with_frame_rate_detection_tolerance_us(mut self, us: i64) -> Self {
        self.frame_rate_detection_tolerance_us = us;
        self
    }

    /// Set the live content advance tolerance.
    pub fn with_live_content_advance_tolerance_us(mut self, us: i64) -> Self {
        self.live_content_advance_tolerance_us = us;
        self
    }

    /// Set the freeze duration buckets.
    pub fn with_freeze_duration_ms_buckets(mut self, buckets: &[i64]) -> Self {
        self.freeze_duration_ms_buckets = buckets.to_vec();
        self
    }

    /// Set the freeze score weights.
    pub fn with_freeze_duration_ms_score_weights(mut self, weights: &[i64]) -> Self {
        self.freeze_duration_ms_score_weights = weights.to_vec();
        self
    }

    /// Set the freeze distance buckets.
    pub fn with_freeze_distance_ms_buckets(mut self, buckets: &[i64]) -> Self {
        self.freeze_distance_ms_buckets = buckets.to_vec();
        self
    }

    /// Set the judder error tolerance.
    pub fn with_judder_error_tolerance_us(mut self, us: i64) -> Self {
        self.judder_error_tolerance_us = us;
        self
    }

    /// Set the judder score buckets.
    pub fn with_judder_score_buckets(mut self, buckets: &[i64]) -> Self {
        self.judder_score_buckets = buckets.to_vec();
        self
    }

    /// Set the judder score weights.
    pub fn with_judder_score_weights(mut self, weights: &[i64]) -> Self {
        self.judder_score_weights = weights.to_vec();
        self
    }

    /// Whether the freeze score can be computed with these weights.
    pub fn freeze_score_enabled(&self) -> bool {
        self.freeze_duration_ms_score_weights.len() == self.freeze_duration_ms_buckets.len()
    }

    /// Whether the judder score can be computed with these weights.
    pub fn judder_score_enabled(&self) -> bool {
        self.judder_score_weights.len() == self.judder_score_buckets.len()
    }

    /// Check the configuration for values the tracker cannot work with.
    ///
    /// A score weight list whose length does not match its buckets is not an
    /// error: the corresponding score simply stays zero.
    pub fn validate(&self) -> Result<()> {
        let tolerances = [
            (
                "max_expected_content_frame_duration_us",
                self.max_expected_content_frame_duration_us,
            ),
            (
                "frame_rate_detection_tolerance_us",
                self.frame_rate_detection_tolerance_us,
            ),
            (
                "live_content_advance_tolerance_us",
                self.live_content_advance_tolerance_us,
            ),
            ("judder_error_tolerance_us", self.judder_error_tolerance_us),
        ];
        for (name, value) in tolerances {
            if value < 0 {
                return Err(RenderQualityError::invalid_config(format!(
                    "{name} must not be negative, got {value}"
                )));
            }
        }

        let bucket_lists = [
            ("freeze_duration_ms_buckets", &self.freeze_duration_ms_buckets),
            ("freeze_distance_ms_buckets", &self.freeze_distance_ms_buckets),
            ("judder_score_buckets", &self.judder_score_buckets),
        ];
        for (name, buckets) in bucket_lists {
            if buckets.is_empty() {
                return Err(RenderQualityError::invalid_config(format!(
                    "{name} must not be empty"
                )));
            }
            if buckets.windows(2).any(|w| w[0] >= w[1]) {
                return Err(RenderQualityError::invalid_config(format!(
                    "{name} must be strictly ascending: {buckets:?}"
                )));
            }
        }
        Ok(())
    }

    /// Parse and validate a JSON configuration. Missing fields take defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Build a configuration from a string key/value flag store (see
    /// [`flags`]), starting from the defaults.
    ///
    /// Absent keys keep their default. Values that fail to parse are ignored
    /// with a warning. Lists are comma-separated integers.
    pub fn from_flags<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut c = Self::default();
        read_flag(&lookup, flags::ENABLED, &mut c.enabled);
        read_flag(
            &lookup,
            flags::SKIPPED_FRAMES_ARE_DROPPED,
            &mut c.skipped_frames_are_dropped,
        );
        read_flag(
            &lookup,
            flags::MAX_EXPECTED_CONTENT_FRAME_DURATION_US,
            &mut c.max_expected_content_frame_duration_us,
        );
        read_flag(
            &lookup,
            flags::FRAME_RATE_DETECTION_TOLERANCE_US,
            &mut c.frame_rate_detection_tolerance_us,
        );
        read_flag(
            &lookup,
            flags::LIVE_CONTENT_ADVANCE_TOLERANCE_US,
            &mut c.live_content_advance_tolerance_us,
        );
        read_list_flag(
            &lookup,
            flags::FREEZE_DURATION_MS_BUCKETS,
            &mut c.freeze_duration_ms_buckets,
        );
        read_list_flag(
            &lookup,
            flags::FREEZE_DURATION_MS_SCORE_WEIGHTS,
            &mut c.freeze_duration_ms_score_weights,
        );
        read_list_flag(
            &lookup,
            flags::FREEZE_DISTANCE_MS_BUCKETS,
            &mut c.freeze_distance_ms_buckets,
        );
        read_flag(
            &lookup,
            flags::JUDDER_ERROR_TOLERANCE_US,
            &mut c.judder_error_tolerance_us,
        );
        read_list_flag(&lookup, flags::JUDDER_SCORE_BUCKETS, &mut c.judder_score_buckets);
        read_list_flag(&lookup, flags::JUDDER_SCORE_WEIGHTS, &mut c.judder_score_weights);
        c
    }
}

fn read_flag<F, T>(lookup: &F, key: &str, target: &mut T)
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    let Some(raw) = lookup(key) else {
        return;
    };
    match raw.trim().parse() {
        Ok(value) => *target = value,
        Err(_) => warn!(flag = key, value = %raw, "Ignoring unparsable render metrics flag"),
    }
}

fn read_list_flag<F>(lookup: &F, key: &str, target: &mut Vec<i64>)
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return;
    };
    let parsed: std::result::Result<Vec<i64>, _> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::parse)
        .collect();
    match parsed {
        Ok(values) => *target = values,
        Err(_) => warn!(flag = key, value = %raw, "Ignoring unparsable render metrics flag"),
    }
}
