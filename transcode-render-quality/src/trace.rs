//! Recorded frame lifecycle events.
//!
//! A trace is a JSON-lines file with one event per line, for example:
//!
//! ```text
//! {"event":"released","content_time_us":0,"desired_render_time_ns":1000000}
//! {"event":"rendered","content_time_us":0,"actual_render_time_ns":1000000}
//! ```
//!
//! Blank lines and lines starting with `#` are ignored.

use std::io::BufRead;

use serde::{Deserialize, Serialize};

use crate::error::{RenderQualityError, Result};

/// One frame lifecycle event, as delivered to the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RenderEvent {
    /// A frame was queued to a tunneled decoder, in decode order.
    TunnelQueued {
        /// Content time of the frame (µs).
        content_time_us: i64,
    },
    /// The app chose not to render a frame.
    Skipped {
        /// Content time of the frame (µs).
        content_time_us: i64,
    },
    /// A frame was released for rendering.
    Released {
        /// Content time of the frame (µs).
        content_time_us: i64,
        /// When the app wants the frame shown (ns). Taken from the tracker's
        /// clock when absent.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        desired_render_time_ns: Option<i64>,
    },
    /// A frame was shown on the display.
    Rendered {
        /// Content time of the frame (µs).
        content_time_us: i64,
        /// When the frame was actually shown (ns).
        actual_render_time_ns: i64,
    },
    /// The pipeline flushed; tracking state must restart.
    Discontinuity,
    /// The session ended; everything is reset.
    Clear,
}

impl RenderEvent {
    /// Content time carried by the event, if any.
    pub fn content_time_us(&self) -> Option<i64> {
        match *self {
            Self::TunnelQueued { content_time_us }
            | Self::Skipped { content_time_us }
            | Self::Released {
                content_time_us, ..
            }
            | Self::Rendered {
                content_time_us, ..
            } => Some(content_time_us),
            Self::Discontinuity | Self::Clear => None,
        }
    }
}

/// Parse one trace line. `line_number` is one-based and only used for errors.
///
/// Returns `Ok(None)` for blank and comment lines.
pub fn parse_event(line_number: usize, line: &str) -> Result<Option<RenderEvent>> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }
    serde_json::from_str(trimmed)
        .map(Some)
        .map_err(|e| RenderQualityError::invalid_trace(line_number, e.to_string()))
}

/// Parse a JSON-lines trace, stopping at the first bad line.
pub fn parse_trace<R: BufRead>(reader: R) -> Result<Vec<RenderEvent>> {
    let mut events = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        if let Some(event) = parse_event(idx + 1, &line?)? {
            events.push(event);
        }
    }
    Ok(events)
}
