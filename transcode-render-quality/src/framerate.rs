//! Frame rate detection from a window of frame durations.
//!
//! A rate is reported only when the last three durations agree within the
//! configured tolerance. Otherwise the window is checked for the alternating
//! 2-vsync/3-vsync cadence of 24fps film shown on a 60Hz display (3:2
//! pulldown), which never settles on a single duration.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::duration::FrameDurationWindow;

/// Duration of two vsyncs at 60Hz, in microseconds.
pub const PULLDOWN_SHORT_US: i64 = 33_333;

/// Duration of three vsyncs at 60Hz, in microseconds.
pub const PULLDOWN_LONG_US: i64 = 50_000;

/// A detected frame rate.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameRate {
    /// Not enough stable history to tell.
    #[default]
    Undetermined,
    /// 24fps content displayed with 3:2 pulldown at 60Hz.
    Pulldown32,
    /// A stable rate in frames per second.
    Hz(f32),
}

impl FrameRate {
    /// Legacy sentinel for an undetermined rate.
    pub const LEGACY_UNDETERMINED: f32 = -1.0;

    /// Legacy sentinel for 3:2 pulldown.
    pub const LEGACY_24_3_2_PULLDOWN: f32 = -2.0;

    /// Check if a rate has been determined.
    pub fn is_determined(&self) -> bool {
        !matches!(self, Self::Undetermined)
    }

    /// The rate in Hz, if a stable one was detected.
    pub fn hz(&self) -> Option<f32> {
        match self {
            Self::Hz(hz) => Some(*hz),
            _ => None,
        }
    }

    /// Flatten into the single float used by existing telemetry sinks, where
    /// `-1` means undetermined and `-2` means 3:2 pulldown.
    pub fn as_legacy_f32(&self) -> f32 {
        match self {
            Self::Undetermined => Self::LEGACY_UNDETERMINED,
            Self::Pulldown32 => Self::LEGACY_24_3_2_PULLDOWN,
            Self::Hz(hz) => *hz,
        }
    }

    /// Replace `self` with `detected` unless the detection was inconclusive.
    pub fn update(&mut self, detected: FrameRate) {
        if detected.is_determined() {
            *self = detected;
        }
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undetermined => write!(f, "undetermined"),
            Self::Pulldown32 => write!(f, "24fps (3:2 pulldown)"),
            Self::Hz(hz) => write!(f, "{:.2}fps", hz),
        }
    }
}

/// Detect the frame rate of the durations in `window`.
pub fn detect_frame_rate(window: &FrameDurationWindow, tolerance_us: i64) -> FrameRate {
    let Some([d0, d1, d2]) = window.known::<3>() else {
        return FrameRate::Undetermined;
    };
    if (d0 - d1).abs() > tolerance_us || (d0 - d2).abs() > tolerance_us {
        return if is_32_pulldown(window, tolerance_us) {
            FrameRate::Pulldown32
        } else {
            FrameRate::Undetermined
        };
    }
    if d0 <= 0 {
        return FrameRate::Undetermined;
    }
    FrameRate::Hz((1_000_000.0 / d0 as f64) as f32)
}

/// Check for the 2-3-2-3 vsync cadence of 3:2 pulldown.
pub fn is_32_pulldown(window: &FrameDurationWindow, tolerance_us: i64) -> bool {
    let Some([d0, d1, d2, d3, d4]) = window.known::<5>() else {
        return false;
    };
    // every other frame has the same duration...
    if (d0 - d2).abs() > tolerance_us
        || (d1 - d3).abs() > tolerance_us
        || (d0 - d4).abs() > tolerance_us
    {
        return false;
    }
    // ...of either two or three vsyncs
    let near = |d: i64, target: i64| (d - target).abs() < tolerance_us;
    (near(d0, PULLDOWN_SHORT_US) && near(d1, PULLDOWN_LONG_US))
        || (near(d0, PULLDOWN_LONG_US) && near(d1, PULLDOWN_SHORT_US))
}
