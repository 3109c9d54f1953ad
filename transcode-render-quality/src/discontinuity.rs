//! Detection of breaks in content-time progression.
//!
//! Content time normally advances by roughly one frame per release. A step
//! backward is a seek or a loop. A large step forward is usually a seek too,
//! except for live content where the app deliberately skips ahead after
//! dropping frames; in that case the app's desired render time jumps by the
//! same amount and tracking continues.

use std::fmt;

use crate::config::RenderQualityConfig;

/// Why tracking state had to be reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Discontinuity {
    /// No previous frame to compare against.
    FirstFrame,
    /// Content time moved backward.
    Backward {
        /// Previous content time (µs).
        from_us: i64,
        /// New content time (µs).
        to_us: i64,
    },
    /// Content time jumped forward further than a frame drop can explain.
    Forward {
        /// Previous content time (µs).
        from_us: i64,
        /// New content time (µs).
        to_us: i64,
    },
}

impl fmt::Display for Discontinuity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::FirstFrame => write!(f, "first frame"),
            Self::Backward { from_us, to_us } => write!(
                f,
                "jumped {} ms backwards in content time ({} -> {})",
                from_us.saturating_sub(to_us) / 1000,
                from_us / 1000,
                to_us / 1000
            ),
            Self::Forward { from_us, to_us } => write!(
                f,
                "jumped {} ms forward in content time ({} -> {})",
                to_us.saturating_sub(from_us) / 1000,
                from_us / 1000,
                to_us / 1000
            ),
        }
    }
}

/// Decide whether a newly released frame breaks continuity with the last one.
///
/// `last_content_time_us` is the content time of the previous release and
/// `last_render_time_us` the actual render time of the previous render, both
/// since the last reset. Returns `None` when tracking can continue.
///
/// A false live-content match is possible if a user spends exactly as long
/// seeking forward as the distance sought. This is rare enough to accept.
pub fn detect_discontinuity(
    config: &RenderQualityConfig,
    last_content_time_us: Option<i64>,
    last_render_time_us: Option<i64>,
    content_time_us: i64,
    desired_render_time_us: i64,
) -> Option<Discontinuity> {
    let Some(last_content_time_us) = last_content_time_us else {
        return Some(Discontinuity::FirstFrame);
    };
    if content_time_us < last_content_time_us {
        return Some(Discontinuity::Backward {
            from_us: last_content_time_us,
            to_us: content_time_us,
        });
    }

    let content_gap_us = content_time_us.saturating_sub(last_content_time_us);
    if content_gap_us <= config.max_expected_content_frame_duration_us {
        return None;
    }

    let is_live_catch_up = last_render_time_us.is_some_and(|last_render| {
        let desired_gap_us = desired_render_time_us.saturating_sub(last_render);
        content_gap_us.saturating_sub(desired_gap_us).saturating_abs()
            < config.live_content_advance_tolerance_us
    });
    if is_live_catch_up {
        None
    } else {
        Some(Discontinuity::Forward {
            from_us: last_content_time_us,
            to_us: content_time_us,
        })
    }
}
