//! Time and pacing for the monitoring node
//!
//! Provides a clock abstraction so the pipeline can run against:
//! - A monotonic tick counter (hardware timer on the node)
//! - The host clock (integration tests, host-side tooling)
//! - A manually advanced clock (unit tests)
//!
//! Durations in this crate are always milliseconds; the sound aggregator and
//! the debounce filter only ever subtract timestamps, so a monotonic source
//! is sufficient and wall-clock time is never required.

/// Timestamp in milliseconds since device boot (or epoch for wall clocks)
pub type Timestamp = u64;

/// Source of time for the pipeline
pub trait TimeSource {
    /// Get current timestamp in milliseconds
    fn now(&self) -> Timestamp;
}

/// Blocking delay provider, used for per-sample pacing of the analog
/// acquisition loop and for the telemetry period wait.
///
/// On the node this maps to the scheduler's sleep; in tests it is a no-op or
/// a clock-advancing stub. Implementations must yield to other tasks rather
/// than spin.
pub trait DelayMs {
    /// Suspend the calling task for at least `ms` milliseconds
    fn delay_ms(&mut self, ms: u32);
}

/// Monotonic clock backed by the host's `Instant`
#[cfg(feature = "std")]
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    start: std::time::Instant,
}

#[cfg(feature = "std")]
impl MonotonicClock {
    /// Create a clock that reads 0 at the moment of construction
    pub fn new() -> Self {
        Self {
            start: std::time::Instant::now(),
        }
    }
}

#[cfg(feature = "std")]
impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "std")]
impl TimeSource for MonotonicClock {
    fn now(&self) -> Timestamp {
        self.start.elapsed().as_millis() as Timestamp
    }
}

/// Thread-sleeping delay provider for host builds
#[cfg(feature = "std")]
#[derive(Debug, Clone, Copy, Default)]
pub struct StdDelay;

#[cfg(feature = "std")]
impl DelayMs for StdDelay {
    fn delay_ms(&mut self, ms: u32) {
        std::thread::sleep(std::time::Duration::from_millis(ms as u64));
    }
}

/// Manually advanced clock for testing
///
/// Interior mutability keeps the `TimeSource` impl on a shared reference so
/// the same clock can be handed to the aggregator and advanced by the test.
#[derive(Debug, Default)]
pub struct FixedClock {
    timestamp: core::cell::Cell<Timestamp>,
}

impl FixedClock {
    /// Create a clock pinned at `timestamp`
    pub fn new(timestamp: Timestamp) -> Self {
        Self {
            timestamp: core::cell::Cell::new(timestamp),
        }
    }

    /// Pin the clock to an absolute timestamp
    pub fn set(&self, timestamp: Timestamp) {
        self.timestamp.set(timestamp);
    }

    /// Move the clock forward by `ms` milliseconds
    pub fn advance(&self, ms: u64) {
        self.timestamp.set(self.timestamp.get() + ms);
    }
}

impl TimeSource for FixedClock {
    fn now(&self) -> Timestamp {
        self.timestamp.get()
    }
}

/// Clock that advances by a fixed step on every read
///
/// Lets bounded waits expire deterministically in single-threaded tests:
/// each `now()` poll inside a wait loop moves time forward.
#[derive(Debug)]
pub struct TickingClock {
    timestamp: core::cell::Cell<Timestamp>,
    step_ms: u64,
}

impl TickingClock {
    /// Clock reading `start` on the first poll, advancing `step_ms` per poll
    pub fn new(start: Timestamp, step_ms: u64) -> Self {
        Self {
            timestamp: core::cell::Cell::new(start),
            step_ms,
        }
    }
}

impl TimeSource for TickingClock {
    fn now(&self) -> Timestamp {
        let now = self.timestamp.get();
        self.timestamp.set(now + self.step_ms);
        now
    }
}

/// No-op delay for tests that don't care about pacing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelay;

impl DelayMs for NoDelay {
    fn delay_ms(&mut self, _ms: u32) {}
}
