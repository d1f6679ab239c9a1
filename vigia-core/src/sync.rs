//! Interrupt-to-Task Handoff Primitives
#![allow(unsafe_code)] // Required for the lock's interior mutability
//!
//! ## Overview
//!
//! Two small primitives connect the sound sensor's interrupt handler to the
//! consumer task and the telemetry cycle:
//!
//! - [`WakeSignal`]: a single-slot, coalescing wake flag. The interrupt
//!   handler's *only* job is `notify()`: one atomic swap, O(1), no
//!   blocking, no counter arithmetic. The consumer drains with `take()` and
//!   reads the live line level itself, so coalesced wakeups lose nothing.
//!
//! - [`StatsLock`]: a spinlock guarding the shared sound counters. It is
//!   held only around short read-modify-write sequences in task context;
//!   the interrupt handler never touches it. The consolidating side uses a
//!   bounded wait and gives up rather than stalling the telemetry cycle.
//!
//! ## Why not a general queue?
//!
//! At most one outstanding wake is meaningful: the consumer always drains
//! before the next edge in practice, and it reads the GPIO level directly
//! rather than trusting event payload. A capacity-1 signal is therefore
//! strictly simpler and cannot drop information a queue would have kept.
//!
//! ## Memory Ordering
//!
//! - `notify`/`take` pair with Release/Acquire so the consumer observes
//!   everything written before the notify.
//! - The lock uses Acquire on entry and Release on exit; the statistics
//!   counters are Relaxed because they never guard data.

use core::cell::UnsafeCell;
use core::ops::{Deref, DerefMut};
use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use crate::time::TimeSource;

/// Single-slot wake flag for interrupt-to-task signaling
///
/// ## Example
///
/// ```rust
/// use vigia_core::sync::WakeSignal;
///
/// static SOUND_EDGE: WakeSignal = WakeSignal::new();
///
/// // Interrupt handler: record the edge and return immediately
/// fn sound_isr() {
///     SOUND_EDGE.notify();
/// }
///
/// // Consumer task
/// fn drain() {
///     if SOUND_EDGE.take() {
///         // read the live line level, update counters under the lock
///     }
/// }
/// ```
pub struct WakeSignal {
    pending: AtomicBool,
    /// Total notifies observed
    notified: AtomicU32,
    /// Notifies that landed while one was already pending
    coalesced: AtomicU32,
}

impl WakeSignal {
    /// Create an idle signal; usable in static context
    pub const fn new() -> Self {
        Self {
            pending: AtomicBool::new(false),
            notified: AtomicU32::new(0),
            coalesced: AtomicU32::new(0),
        }
    }

    /// Raise the wake flag. Interrupt-safe: one swap, never blocks.
    pub fn notify(&self) {
        if self.pending.swap(true, Ordering::Release) {
            self.coalesced.fetch_add(1, Ordering::Relaxed);
        }
        self.notified.fetch_add(1, Ordering::Relaxed);
    }

    /// Consume the wake flag, returning whether it was raised
    pub fn take(&self) -> bool {
        self.pending.swap(false, Ordering::Acquire)
    }

    /// Peek without consuming
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    /// Total notifies since creation
    pub fn notify_count(&self) -> u32 {
        self.notified.load(Ordering::Relaxed)
    }

    /// Wakeups that coalesced into an already-pending flag
    pub fn coalesced_count(&self) -> u32 {
        self.coalesced.load(Ordering::Relaxed)
    }
}

impl Default for WakeSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Spinlock with bounded-wait acquisition
///
/// Guards the sound statistics shared between the consumer task and the
/// telemetry cycle. Critical sections are a handful of integer operations,
/// so contention is rare and short; the bounded wait exists for the
/// consolidating side, which must never stall the whole cycle.
pub struct StatsLock<T> {
    locked: AtomicBool,
    value: UnsafeCell<T>,
    /// Failed try_lock attempts, for diagnostics
    contended: AtomicU32,
}

// The lock provides the synchronization; T only needs to be Send.
unsafe impl<T: Send> Send for StatsLock<T> {}
unsafe impl<T: Send> Sync for StatsLock<T> {}

// Manual impl: reading the cell would race with a holder, so only the
// atomics are rendered.
impl<T> core::fmt::Debug for StatsLock<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("StatsLock")
            .field("locked", &self.locked.load(Ordering::Relaxed))
            .field("contended", &self.contended.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl<T: Default> Default for StatsLock<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> StatsLock<T> {
    /// Wrap a value; usable in static context
    pub const fn new(value: T) -> Self {
        Self {
            locked: AtomicBool::new(false),
            value: UnsafeCell::new(value),
            contended: AtomicU32::new(0),
        }
    }

    /// Try to take the lock without waiting
    pub fn try_lock(&self) -> Option<StatsGuard<'_, T>> {
        if self
            .locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
        {
            Some(StatsGuard { lock: self })
        } else {
            self.contended.fetch_add(1, Ordering::Relaxed);
            None
        }
    }

    /// Take the lock, spinning until it is free
    ///
    /// Task-context only. Used by the consumer side, whose peer holds the
    /// lock for a bounded handful of operations.
    pub fn lock(&self) -> StatsGuard<'_, T> {
        loop {
            if let Some(guard) = self.try_lock() {
                return guard;
            }
            core::hint::spin_loop();
        }
    }

    /// Take the lock, giving up after `timeout_ms` on `clock`
    ///
    /// Returns `None` on timeout; the caller substitutes default data for
    /// the period instead of blocking indefinitely.
    pub fn lock_deadline(&self, clock: &dyn TimeSource, timeout_ms: u64) -> Option<StatsGuard<'_, T>> {
        let deadline = clock.now().saturating_add(timeout_ms);
        loop {
            if let Some(guard) = self.try_lock() {
                return Some(guard);
            }
            if clock.now() >= deadline {
                return None;
            }
            core::hint::spin_loop();
        }
    }

    /// Failed acquisition attempts so far
    pub fn contention_count(&self) -> u32 {
        self.contended.load(Ordering::Relaxed)
    }
}

/// RAII guard for [`StatsLock`]; releases on drop
pub struct StatsGuard<'a, T> {
    lock: &'a StatsLock<T>,
}

impl<T> Deref for StatsGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // Safe: the guard's existence proves exclusive ownership
        unsafe { &*self.lock.value.get() }
    }
}

impl<T> DerefMut for StatsGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        unsafe { &mut *self.lock.value.get() }
    }
}

impl<T> Drop for StatsGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.locked.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::FixedClock;

    #[test]
    fn signal_take_is_destructive() {
        let signal = WakeSignal::new();
        assert!(!signal.take());

        signal.notify();
        assert!(signal.is_pending());
        assert!(signal.take());
        assert!(!signal.take());
    }

    #[test]
    fn signal_coalesces_repeat_notifies() {
        let signal = WakeSignal::new();
        signal.notify();
        signal.notify();
        signal.notify();

        assert_eq!(signal.notify_count(), 3);
        assert_eq!(signal.coalesced_count(), 2);
        // Still only one wake to consume
        assert!(signal.take());
        assert!(!signal.take());
    }

    #[test]
    fn lock_basic() {
        let lock = StatsLock::new(7u32);
        {
            let mut guard = lock.lock();
            *guard += 1;
        }
        assert_eq!(*lock.lock(), 8);
    }

    #[test]
    fn try_lock_fails_while_held() {
        let lock = StatsLock::new(0u32);
        let _guard = lock.try_lock().unwrap();

        assert!(lock.try_lock().is_none());
        assert_eq!(lock.contention_count(), 1);
    }

    #[test]
    fn lock_deadline_times_out() {
        let lock = StatsLock::new(0u32);
        let clock = FixedClock::new(5_000);
        let _guard = lock.lock();

        // FixedClock never advances on its own; a zero timeout expires on
        // the first failed attempt
        assert!(lock.lock_deadline(&clock, 0).is_none());
    }

    #[test]
    fn lock_deadline_succeeds_when_free() {
        let lock = StatsLock::new(0u32);
        let clock = FixedClock::new(0);
        assert!(lock.lock_deadline(&clock, 1_000).is_some());
    }

    #[test]
    fn lock_debug_shows_state_not_contents() {
        let lock = StatsLock::new(7u32);
        let rendered = std::format!("{lock:?}");
        assert!(rendered.contains("locked"));
        assert!(!rendered.contains('7'));
    }

    #[test]
    fn default_lock_wraps_default_value() {
        let lock: StatsLock<u32> = StatsLock::default();
        assert_eq!(*lock.lock(), 0);
    }
}
