//! One-frame reorder buffer for tunnel mode.
//!
//! In tunnel mode frames are queued in decode order, so a P-frame arrives
//! before the B-frames that are displayed ahead of it. Holding back the most
//! recent later frame is enough to restore display order, because today's
//! encoders only let B-frames reference ONE following P-frame per mini-GOP.
//! Streams with more forward references per mini-GOP are not reordered
//! correctly.

/// What to do with a frame that was just queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reorder {
    /// Nothing can be released yet; hold the queued frame.
    Hold,
    /// The queued frame is displayed before the held one; release it now.
    ReleaseQueued,
    /// Release the held frame (µs), then hold the queued frame in its place.
    ReleaseHeld(i64),
}

/// Holds at most one queued frame until its display position is known.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TunnelReorderBuffer {
    held_content_time_us: Option<i64>,
}

impl TunnelReorderBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decide where a newly queued frame goes. Does not modify the buffer.
    ///
    /// Releasing a frame can restart tracking and empty the buffer, so the
    /// caller releases first and calls [`hold`](Self::hold) afterwards.
    pub fn reorder(&self, content_time_us: i64) -> Reorder {
        match self.held_content_time_us {
            None => Reorder::Hold,
            // B-frame displayed before the held P-frame.
            Some(held) if content_time_us < held => Reorder::ReleaseQueued,
            Some(held) => Reorder::ReleaseHeld(held),
        }
    }

    /// Hold `content_time_us`, replacing anything held.
    pub fn hold(&mut self, content_time_us: i64) {
        self.held_content_time_us = Some(content_time_us);
    }

    /// Release the held frame if it is the one being rendered (the last frame
    /// of a stream never gets a successor to push it out).
    pub fn take_if_held(&mut self, content_time_us: i64) -> Option<i64> {
        if self.held_content_time_us == Some(content_time_us) {
            self.held_content_time_us.take()
        } else {
            None
        }
    }

    /// The content time currently held back.
    pub fn held(&self) -> Option<i64> {
        self.held_content_time_us
    }

    /// Drop the held frame.
    pub fn clear(&mut self) {
        self.held_content_time_us = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queue(buf: &mut TunnelReorderBuffer, t: i64) -> Option<i64> {
        match buf.reorder(t) {
            Reorder::Hold => {
                buf.hold(t);
                None
            }
            Reorder::ReleaseQueued => Some(t),
            Reorder::ReleaseHeld(held) => {
                buf.hold(t);
                Some(held)
            }
        }
    }

    #[test]
    fn test_first_frame_is_held() {
        let mut buf = TunnelReorderBuffer::new();
        assert_eq!(buf.reorder(0), Reorder::Hold);
        assert_eq!(buf.held(), None);
        buf.hold(0);
        assert_eq!(buf.held(), Some(0));
    }

    #[test]
    fn test_reorder_decisions() {
        let mut buf = TunnelReorderBuffer::new();
        buf.hold(30);
        assert_eq!(buf.reorder(10), Reorder::ReleaseQueued);
        assert_eq!(buf.reorder(30), Reorder::ReleaseHeld(30));
        assert_eq!(buf.reorder(60), Reorder::ReleaseHeld(30));
        assert_eq!(buf.held(), Some(30));
    }

    #[test]
    fn test_decode_order_becomes_display_order() {
        // I0 P3 B1 B2 P6 B4 B5 in decode order
        let mut buf = TunnelReorderBuffer::new();
        let released: Vec<i64> = [0, 3, 1, 2, 6, 4, 5]
            .into_iter()
            .filter_map(|t| queue(&mut buf, t))
            .collect();
        assert_eq!(released, vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(buf.held(), Some(6));
    }

    #[test]
    fn test_take_if_held() {
        let mut buf = TunnelReorderBuffer::new();
        buf.hold(10);
        assert_eq!(buf.take_if_held(9), None);
        assert_eq!(buf.take_if_held(10), Some(10));
        assert_eq!(buf.held(), None);
    }

    #[test]
    fn test_clear() {
        let mut buf = TunnelReorderBuffer::new();
        buf.hold(10);
        buf.clear();
        assert_eq!(buf, TunnelReorderBuffer::new());
    }
}
