//! The render quality tracker.
//!
//! The tracker correlates frames released for rendering with frames that were
//! actually rendered. Frames are rendered in content-time order, so a released
//! frame that is passed over by a later render was dropped. Matched frames
//! feed the duration windows from which frame rates, freezes and judder are
//! derived.

use std::collections::VecDeque;

use tracing::{debug, info, warn};

use crate::clock::{Clock, MonotonicClock};
use crate::config::RenderQualityConfig;
use crate::discontinuity::{detect_discontinuity, Discontinuity};
use crate::duration::FrameDurationWindow;
use crate::framerate::detect_frame_rate;
use crate::metrics::VideoRenderQualityMetrics;
use crate::scoring::{detect_freeze, previous_judder_score};
use crate::trace::RenderEvent;
use crate::tunnel::{Reorder, TunnelReorderBuffer};

/// A released frame waiting to be rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FrameInfo {
    content_time_us: i64,
    desired_render_time_us: i64,
}

/// Tracks video render quality for one playback session.
///
/// Events must be delivered in the order they happen. None of the event
/// methods fail; anomalies are logged and folded into the metrics.
///
/// # Example
///
/// ```
/// use transcode_render_quality::{ManualClock, RenderQualityConfig, RenderQualityTracker};
///
/// let mut tracker = RenderQualityTracker::with_clock(
///     RenderQualityConfig::default(),
///     ManualClock::new(0),
/// );
/// for i in 0..10 {
///     let content_time_us = i * 16_667;
///     tracker.on_frame_released_at(content_time_us, content_time_us * 1000);
///     tracker.on_frame_rendered(content_time_us, content_time_us * 1000);
/// }
/// let metrics = tracker.metrics();
/// assert_eq!(metrics.frame_rendered_count, 10);
/// assert!(metrics.freeze_duration_ms_histogram.is_empty());
/// ```
#[derive(Debug)]
pub struct RenderQualityTracker<C: Clock = MonotonicClock> {
    config: RenderQualityConfig,
    clock: C,
    metrics: VideoRenderQualityMetrics,

    /// Wall time covered by rendering since the last clear (µs).
    render_duration_us: i64,

    last_content_time_us: Option<i64>,
    last_render_time_us: Option<i64>,
    last_freeze_end_time_us: Option<i64>,

    /// Skips are only counted once a later frame renders, so skips at the
    /// end of playback are ignored.
    pending_skipped_content_times_us: Vec<i64>,
    tunnel: TunnelReorderBuffer,
    expected_frames: VecDeque<FrameInfo>,

    content_durations: FrameDurationWindow,
    desired_durations: FrameDurationWindow,
    actual_durations: FrameDurationWindow,
}

impl RenderQualityTracker<MonotonicClock> {
    /// Create a tracker using the system monotonic clock.
    pub fn new(config: RenderQualityConfig) -> Self {
        Self::with_clock(config, MonotonicClock::new())
    }
}

impl Default for RenderQualityTracker<MonotonicClock> {
    fn default() -> Self {
        Self::new(RenderQualityConfig::default())
    }
}

impl<C: Clock> RenderQualityTracker<C> {
    /// Create a tracker with an explicit time source.
    pub fn with_clock(config: RenderQualityConfig, clock: C) -> Self {
        if config.enabled {
            for problem in config_problems(&config) {
                warn!("{}", problem);
            }
        }

        let metrics = VideoRenderQualityMetrics::new(&config);
        Self {
            config,
            clock,
            metrics,
            render_duration_us: 0,
            last_content_time_us: None,
            last_render_time_us: None,
            last_freeze_end_time_us: None,
            pending_skipped_content_times_us: Vec::new(),
            tunnel: TunnelReorderBuffer::new(),
            expected_frames: VecDeque::new(),
            content_durations: FrameDurationWindow::new(),
            desired_durations: FrameDurationWindow::new(),
            actual_durations: FrameDurationWindow::new(),
        }
    }

    /// The configuration this tracker was built with.
    pub fn config(&self) -> &RenderQualityConfig {
        &self.config
    }

    /// A frame was queued to a tunneled decoder, in decode order.
    ///
    /// Tunneled playback has no release callback, so queued frames are
    /// reordered into display order and released with no desired render
    /// time.
    pub fn on_tunnel_frame_queued(&mut self, content_time_us: i64) {
        if !self.config.enabled {
            return;
        }
        match self.tunnel.reorder(content_time_us) {
            Reorder::Hold => self.tunnel.hold(content_time_us),
            Reorder::ReleaseQueued => self.release(content_time_us, 0),
            Reorder::ReleaseHeld(held_us) => {
                self.release(held_us, 0);
                self.tunnel.hold(content_time_us);
            }
        }
    }

    /// The app chose not to render a frame.
    pub fn on_frame_skipped(&mut self, content_time_us: i64) {
        if !self.config.enabled {
            return;
        }
        // Skips before the first render are usually the app seeking past the
        // key frame to its start point.
        if self.last_render_time_us.is_none() {
            return;
        }
        self.pending_skipped_content_times_us.push(content_time_us);
    }

    /// A frame was released for rendering now.
    pub fn on_frame_released(&mut self, content_time_us: i64) {
        if !self.config.enabled {
            return;
        }
        let desired_render_time_us = self.clock.now_us();
        self.release(content_time_us, desired_render_time_us);
    }

    /// A frame was released for rendering at `desired_render_time_ns`.
    pub fn on_frame_released_at(&mut self, content_time_us: i64, desired_render_time_ns: i64) {
        if !self.config.enabled {
            return;
        }
        self.release(content_time_us, desired_render_time_ns / 1000);
    }

    /// A frame was shown on the display at `actual_render_time_ns`.
    pub fn on_frame_rendered(&mut self, content_time_us: i64, actual_render_time_ns: i64) {
        if !self.config.enabled {
            return;
        }
        let actual_render_time_us = actual_render_time_ns / 1000;

        if let Some(last_render_time_us) = self.last_render_time_us {
            self.render_duration_us = self
                .render_duration_us
                .saturating_add(actual_render_time_us.saturating_sub(last_render_time_us));
        }

        // A render proves the skips before it were not the end of playback.
        for skipped_us in std::mem::take(&mut self.pending_skipped_content_times_us) {
            self.process_skipped_frame(skipped_us);
        }

        // The last frame of a tunneled stream is never pushed out by a
        // successor.
        if let Some(held_us) = self.tunnel.take_if_held(content_time_us) {
            self.release(held_us, 0);
        }

        let mut matched = None;
        let mut last_dropped = None;
        while let Some(&next) = self.expected_frames.front() {
            if next.content_time_us == content_time_us {
                self.expected_frames.pop_front();
                matched = Some(next);
                break;
            }
            if content_time_us < next.content_time_us {
                warn!(
                    rendered_us = content_time_us,
                    expected_us = next.content_time_us,
                    "Rendered frame is earlier than the next expected frame"
                );
                break;
            }
            self.expected_frames.pop_front();
            self.process_dropped_frame(next.content_time_us, Some(next.desired_render_time_us));
            last_dropped = Some(next);
        }
        // Every queued frame was passed over: the render stands in for the
        // last of them so the freeze it ends is still scored.
        if matched.is_none() && self.expected_frames.is_empty() {
            matched = last_dropped;
        }

        self.process_rendered_frame(matched, actual_render_time_us);
        self.last_render_time_us = Some(actual_render_time_us);
    }

    /// Feed a recorded event.
    pub fn apply(&mut self, event: &RenderEvent) {
        match *event {
            RenderEvent::TunnelQueued { content_time_us } => {
                self.on_tunnel_frame_queued(content_time_us)
            }
            RenderEvent::Skipped { content_time_us } => self.on_frame_skipped(content_time_us),
            RenderEvent::Released {
                content_time_us,
                desired_render_time_ns: Some(desired_ns),
            } => self.on_frame_released_at(content_time_us, desired_ns),
            RenderEvent::Released {
                content_time_us,
                desired_render_time_ns: None,
            } => self.on_frame_released(content_time_us),
            RenderEvent::Rendered {
                content_time_us,
                actual_render_time_ns,
            } => self.on_frame_rendered(content_time_us, actual_render_time_ns),
            RenderEvent::Discontinuity => self.reset_for_discontinuity(),
            RenderEvent::Clear => self.clear(),
        }
    }

    /// Snapshot of the metrics with scores and rates computed.
    ///
    /// A disabled tracker always reports empty metrics.
    pub fn metrics(&self) -> VideoRenderQualityMetrics {
        if !self.config.enabled {
            return self.metrics.clone();
        }
        self.metrics
            .with_derived(&self.config, self.render_duration_us)
    }

    /// Forget everything, starting a new session with the same configuration.
    pub fn clear(&mut self) {
        self.render_duration_us = 0;
        self.metrics = VideoRenderQualityMetrics::new(&self.config);
        self.reset_for_discontinuity();
    }

    /// Restart tracking after a seek or flush.
    ///
    /// Frames in flight and frame duration history are discarded; counts and
    /// histograms are kept.
    pub fn reset_for_discontinuity(&mut self) {
        self.last_content_time_us = None;
        self.last_render_time_us = None;
        self.last_freeze_end_time_us = None;

        // Stutter while playback catches up to the discontinuity is not
        // tracked.
        self.expected_frames.clear();
        self.tunnel.clear();
        self.pending_skipped_content_times_us.clear();

        self.content_durations.reset();
        self.desired_durations.reset();
        self.actual_durations.reset();
    }

    fn release(&mut self, content_time_us: i64, desired_render_time_us: i64) {
        self.reset_if_discontinuity(content_time_us, desired_render_time_us);
        self.metrics.frame_released_count += 1;
        self.expected_frames.push_back(FrameInfo {
            content_time_us,
            desired_render_time_us,
        });
        self.last_content_time_us = Some(content_time_us);
    }

    fn reset_if_discontinuity(&mut self, content_time_us: i64, desired_render_time_us: i64) {
        let Some(discontinuity) = detect_discontinuity(
            &self.config,
            self.last_content_time_us,
            self.last_render_time_us,
            content_time_us,
            desired_render_time_us,
        ) else {
            return;
        };
        if discontinuity != Discontinuity::FirstFrame {
            info!("Video playback {}", discontinuity);
        }
        self.reset_for_discontinuity();
    }

    fn process_skipped_frame(&mut self, content_time_us: i64) {
        self.metrics.frame_skipped_count += 1;
        if self.config.skipped_frames_are_dropped {
            self.process_dropped_frame(content_time_us, None);
            return;
        }
        self.content_durations.push(Some(content_time_us));
        self.desired_durations.push(None);
        self.actual_durations.push(None);
        self.update_content_frame_rate();
    }

    fn process_dropped_frame(&mut self, content_time_us: i64, desired_render_time_us: Option<i64>) {
        self.metrics.frame_dropped_count += 1;
        self.content_durations.push(Some(content_time_us));
        self.desired_durations.push(desired_render_time_us);
        self.actual_durations.push(None);
        self.update_content_frame_rate();
        self.update_desired_frame_rate();
    }

    fn process_rendered_frame(&mut self, frame: Option<FrameInfo>, actual_render_time_us: i64) {
        if self.metrics.first_render_time_us.is_none() {
            self.metrics.first_render_time_us = Some(actual_render_time_us);
        }
        self.metrics.frame_rendered_count += 1;

        // Nothing to compare against, e.g. the first frame shown after a
        // seek. Its impact on the user is insignificant.
        let Some(frame) = frame else {
            return;
        };

        self.content_durations.push(Some(frame.content_time_us));
        self.desired_durations.push(Some(frame.desired_render_time_us));
        self.actual_durations.push(Some(actual_render_time_us));
        self.update_content_frame_rate();
        self.update_desired_frame_rate();
        let tolerance_us = self.config.frame_rate_detection_tolerance_us;
        self.metrics
            .actual_frame_rate
            .update(detect_frame_rate(&self.actual_durations, tolerance_us));

        if let Some(freeze) = detect_freeze(
            &self.actual_durations,
            actual_render_time_us,
            self.last_render_time_us,
            self.last_freeze_end_time_us,
        ) {
            debug!(
                duration_ms = freeze.duration_ms,
                distance_ms = ?freeze.distance_ms,
                content_time_us = frame.content_time_us,
                "Freeze detected"
            );
            self.metrics
                .freeze_duration_ms_histogram
                .insert(freeze.duration_ms);
            if let Some(distance_ms) = freeze.distance_ms {
                self.metrics.freeze_distance_ms_histogram.insert(distance_ms);
            }
            self.last_freeze_end_time_us = Some(actual_render_time_us);
        }

        if let Some(score) = previous_judder_score(
            &self.actual_durations,
            &self.content_durations,
            self.config.judder_error_tolerance_us,
        ) {
            self.metrics.judder_score_histogram.insert(score);
        }
    }

    fn update_content_frame_rate(&mut self) {
        let tolerance_us = self.config.frame_rate_detection_tolerance_us;
        self.metrics
            .content_frame_rate
            .update(detect_frame_rate(&self.content_durations, tolerance_us));
    }

    fn update_desired_frame_rate(&mut self) {
        let tolerance_us = self.config.frame_rate_detection_tolerance_us;
        self.metrics
            .desired_frame_rate
            .update(detect_frame_rate(&self.desired_durations, tolerance_us));
    }
}

/// Configuration issues the tracker works around rather than rejects.
fn config_problems(config: &RenderQualityConfig) -> Vec<String> {
    let mut problems = Vec::new();
    if let Err(e) = config.validate() {
        problems.push(format!("{}, histograms may bucket values wrongly", e));
    }
    if !config.freeze_score_enabled() {
        problems.push(format!(
            "Freeze score weights ({}) do not match buckets ({}), freeze score disabled",
            config.freeze_duration_ms_score_weights.len(),
            config.freeze_duration_ms_buckets.len()
        ));
    }
    if !config.judder_score_enabled() {
        problems.push(format!(
            "Judder score weights ({}) do not match buckets ({}), judder score disabled",
            config.judder_score_weights.len(),
            config.judder_score_buckets.len()
        ));
    }
    problems
}
