//! Monotonic time sources for the tracker.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// Source of monotonic time in microseconds.
///
/// Consulted only when a frame is released without an explicit desired
/// render time.
pub trait Clock {
    /// Current monotonic time in microseconds.
    fn now_us(&self) -> i64;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_us(&self) -> i64 {
        (**self).now_us()
    }
}

impl<C: Clock + ?Sized> Clock for Box<C> {
    fn now_us(&self) -> i64 {
        (**self).now_us()
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now_us(&self) -> i64 {
        (**self).now_us()
    }
}

/// The system monotonic clock (`CLOCK_MONOTONIC`).
///
/// Render timestamps reported by the display pipeline are on this timebase,
/// so desired render times taken from it are comparable with them.
#[derive(Debug, Clone, Copy, Default)]
pub struct MonotonicClock;

impl MonotonicClock {
    /// Create a handle to the system monotonic clock.
    pub const fn new() -> Self {
        Self
    }
}

impl Clock for MonotonicClock {
    #[cfg(unix)]
    fn now_us(&self) -> i64 {
        let mut ts = libc::timespec {
            tv_sec: 0,
            tv_nsec: 0,
        };
        // SAFETY: `ts` is a valid timespec for the call to write into.
        unsafe { libc::clock_gettime(libc::CLOCK_MONOTONIC, &mut ts) };
        (ts.tv_sec as i64)
            .saturating_mul(1_000_000)
            .saturating_add(ts.tv_nsec as i64 / 1000)
    }

    #[cfg(not(unix))]
    fn now_us(&self) -> i64 {
        // No system-wide monotonic epoch; count from the first reading in
        // this process so every handle still shares one timebase.
        static ORIGIN: std::sync::OnceLock<std::time::Instant> = std::sync::OnceLock::new();
        let origin = ORIGIN.get_or_init(std::time::Instant::now);
        i64::try_from(origin.elapsed().as_micros()).unwrap_or(i64::MAX)
    }
}

/// Manually driven clock for tests and trace replay.
///
/// Clones share the same time, so a test can keep a handle while the
/// tracker owns another.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now_us: Arc<AtomicI64>,
}

impl ManualClock {
    /// Create a clock reading `start_us`.
    pub fn new(start_us: i64) -> Self {
        Self {
            now_us: Arc::new(AtomicI64::new(start_us)),
        }
    }

    /// Set the current time.
    pub fn set_us(&self, now_us: i64) {
        self.now_us.store(now_us, Ordering::Relaxed);
    }

    /// Move the current time forward by `delta_us`.
    pub fn advance_us(&self, delta_us: i64) {
        self.now_us.fetch_add(delta_us, Ordering::Relaxed);
    }
}

impl Clock for ManualClock {
    fn now_us(&self) -> i64 {
        self.now_us.load(Ordering::Relaxed)
    }
}
