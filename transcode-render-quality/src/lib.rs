//! # Transcode Render Quality
//!
//! Video render quality tracking for the Transcode project.
//!
//! A playback pipeline reports the lifecycle of every video frame (queued,
//! released, skipped, rendered) and this crate turns the timing of those
//! events into quality metrics:
//!
//! - **Frame counts**: released, rendered, dropped and skipped frames
//! - **Frame rates**: content, desired and actual, including 3:2 pulldown
//! - **Freezes**: duration and spacing of on-screen freezes from dropped frames
//! - **Judder**: uneven frame pacing scored per frame
//! - **Scores and rates**: histogram-weighted severity scores for telemetry
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use transcode_render_quality::{RenderQualityConfig, RenderQualityTracker};
//!
//! let mut tracker = RenderQualityTracker::new(RenderQualityConfig::default());
//!
//! // From the playback pipeline
//! tracker.on_frame_released(content_time_us);
//! tracker.on_frame_rendered(content_time_us, actual_render_time_ns);
//!
//! // At the end of the session
//! let metrics = tracker.metrics();
//! println!("freeze score {} judder score {}", metrics.freeze_score, metrics.judder_score);
//! ```
//!
//! ## Deterministic Time
//!
//! The tracker only reads the clock when a frame is released without a
//! desired render time. Tests and trace replay drive a [`ManualClock`]:
//!
//! ```rust,ignore
//! use transcode_render_quality::{ManualClock, RenderQualityConfig, RenderQualityTracker};
//!
//! let clock = ManualClock::new(0);
//! let mut tracker = RenderQualityTracker::with_clock(RenderQualityConfig::default(), clock.clone());
//! clock.advance_us(16_667);
//! ```
//!
//! ## Trace Replay
//!
//! Recorded sessions are JSON-lines files of [`RenderEvent`]s:
//!
//! ```rust,ignore
//! use transcode_render_quality::{parse_trace, RenderQualityTracker};
//!
//! let events = parse_trace(std::io::BufReader::new(file))?;
//! for event in &events {
//!     tracker.apply(event);
//! }
//! ```

#![warn(missing_docs)]

pub mod clock;
pub mod config;
pub mod discontinuity;
pub mod duration;
pub mod error;
pub mod framerate;
pub mod histogram;
pub mod metrics;
pub mod scoring;
pub mod trace;
pub mod tracker;
pub mod tunnel;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::RenderQualityConfig;
pub use discontinuity::{detect_discontinuity, Discontinuity};
pub use duration::{DurationSlot, FrameDurationWindow, WINDOW_SIZE};
pub use error::{RenderQualityError, Result};
pub use framerate::{detect_frame_rate, FrameRate};
pub use histogram::Histogram;
pub use metrics::VideoRenderQualityMetrics;
pub use scoring::{detect_freeze, previous_judder_score, Freeze};
pub use trace::{parse_event, parse_trace, RenderEvent};
pub use tracker::RenderQualityTracker;
pub use tunnel::{Reorder, TunnelReorderBuffer};
