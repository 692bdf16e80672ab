//! Timing instrumentation for GPU dispatches.
//!
//! With the `profiling` feature enabled, each dispatch records how long it
//! spends in upload, kernel launch, and readback, and the runtime emits
//! the breakdown through `tracing`. Without the feature everything here
//! compiles to no-ops.

use serde::{Deserialize, Serialize};
use std::time::Duration;
#[cfg(feature = "profiling")]
use std::time::Instant;

/// Phase breakdown for a single batch dispatch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DispatchTiming {
    /// Host-to-device transfer time.
    pub upload_ms: f64,
    /// Kernel launch time (submission, not completion).
    pub launch_ms: f64,
    /// Device-to-host readback, including the implicit completion wait.
    pub readback_ms: f64,
}

impl DispatchTiming {
    pub fn total_ms(&self) -> f64 {
        self.upload_ms + self.launch_ms + self.readback_ms
    }
}

/// Timer that can be enabled/disabled at compile time.
#[cfg(feature = "profiling")]
pub struct Timer {
    start: Instant,
}

#[cfg(feature = "profiling")]
impl Timer {
    #[inline]
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    #[inline]
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }

    #[inline]
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

/// No-op timer when profiling is disabled.
#[cfg(not(feature = "profiling"))]
pub struct Timer;

#[cfg(not(feature = "profiling"))]
impl Timer {
    #[inline(always)]
    pub fn start() -> Self {
        Self
    }

    #[inline(always)]
    pub fn elapsed_ms(&self) -> f64 {
        0.0
    }

    #[inline(always)]
    pub fn elapsed(&self) -> Duration {
        Duration::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_timing_total() {
        let timing = DispatchTiming {
            upload_ms: 1.0,
            launch_ms: 0.25,
            readback_ms: 2.0,
        };
        assert!((timing.total_ms() - 3.25).abs() < 1e-12);
    }

    #[test]
    fn test_timer_is_monotonic() {
        let timer = Timer::start();

        #[cfg(feature = "profiling")]
        assert!(timer.elapsed_ms() >= 0.0);

        #[cfg(not(feature = "profiling"))]
        {
            assert_eq!(timer.elapsed_ms(), 0.0);
            assert_eq!(timer.elapsed(), Duration::ZERO);
        }
    }
}
