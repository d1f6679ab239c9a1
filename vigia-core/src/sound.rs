//! Sound Event Aggregation
//!
//! ## Overview
//!
//! The sound sensor raises a GPIO edge whenever ambient noise crosses its
//! comparator threshold. Two operating profiles are provided:
//!
//! - **Interrupt-driven counting** ([`SoundEventAggregator`]): the interrupt
//!   handler only raises a [`WakeSignal`](crate::sync::WakeSignal); a
//!   dedicated consumer task reads the live line level and feeds
//!   [`record_edge`](SoundEventAggregator::record_edge). A detection becomes
//!   final on its falling edge, when its duration is known.
//!
//! - **Polled debounce** ([`DebouncedInput`]): a pure state machine that
//!   accepts a level change only after it has held for 50 ms, invoking a
//!   callback exactly once per confirmed transition. Useful on nodes whose
//!   comparator output chatters; independent of the counters above.
//!
//! ## Consolidation
//!
//! Once per telemetry period the cycle drains a summary: under the lock,
//! `{detections, max duration}` are copied out and zeroed. This is a true
//! drain, not a peek: calling it twice back-to-back yields zeros the
//! second time. The drain waits at most one second for the lock; on timeout
//! the period reports zeroed sound data and the counters keep accumulating
//! for the next period.

use crate::constants::timing::{CONSOLIDATE_WAIT_MS, DEBOUNCE_WINDOW_MS};
use crate::sync::StatsLock;
use crate::time::{TimeSource, Timestamp};

/// Shared per-period sound statistics
///
/// Owned exclusively by [`SoundEventAggregator`] behind its lock; mutated
/// only while the lock is held.
#[derive(Debug, Clone, Copy, Default)]
pub struct SoundStats {
    /// Detections finalized this period
    pub total_detections: u32,
    /// Timestamp of the most recent detection start
    pub last_detection_time: Timestamp,
    /// Longest finalized detection this period (ms)
    pub max_duration_ms: u32,
    /// True while a detection is in progress
    pub sound_active: bool,
    /// Rising-edge timestamp of the in-progress detection; meaningful only
    /// while `sound_active` is set
    init_high_time: Timestamp,
}

/// Consolidated copy handed to the telemetry cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SoundSummary {
    /// Detections in the drained period
    pub detections: u32,
    /// Longest detection in the drained period (ms)
    pub max_duration_ms: u32,
}

/// Interrupt-context-safe sound event counter
///
/// Created once at init and alive for the node's lifetime. All counter
/// arithmetic happens in the consumer task via [`record_edge`]; the
/// interrupt handler itself must only signal (see [`crate::sync`]).
///
/// [`record_edge`]: SoundEventAggregator::record_edge
#[derive(Debug, Default)]
pub struct SoundEventAggregator {
    stats: StatsLock<SoundStats>,
}

impl SoundEventAggregator {
    /// Create an idle aggregator; usable in static context
    pub const fn new() -> Self {
        Self {
            stats: StatsLock::new(SoundStats {
                total_detections: 0,
                last_detection_time: 0,
                max_duration_ms: 0,
                sound_active: false,
                init_high_time: 0,
            }),
        }
    }

    /// Feed one observed edge from the consumer task.
    ///
    /// `level` is the live line level read after the wake: `true` for a
    /// rising edge (detection start), `false` for a falling edge (detection
    /// end). Per-event state machine:
    ///
    /// - rising while idle: stamp the start time, no counters change yet
    /// - falling while active: finalize the detection, counting it and
    ///   folding its duration into the period maximum
    ///
    /// Out-of-order edges (falling while idle, rising while active) are
    /// ignored; the next consistent pair resynchronizes.
    pub fn record_edge(&self, level: bool, now: Timestamp) {
        let mut stats = self.stats.lock();

        // Keyed on the active flag, not the stored timestamp: 0 is a valid
        // rising-edge time on a clock that starts at boot.
        if level && !stats.sound_active {
            stats.init_high_time = now;
            stats.last_detection_time = now;
            stats.sound_active = true;
        } else if !level && stats.sound_active {
            let duration = now.saturating_sub(stats.init_high_time) as u32;
            stats.total_detections += 1;
            if duration > stats.max_duration_ms {
                stats.max_duration_ms = duration;
            }
            stats.sound_active = false;
        }
    }

    /// Drain the period's summary: copy out `{detections, max duration}`
    /// and zero both.
    ///
    /// Waits at most [`CONSOLIDATE_WAIT_MS`] for the lock; returns `None`
    /// on timeout, in which case the caller reports zeroed sound data for
    /// the period and the counters keep accumulating (they reset only on a
    /// successful drain).
    pub fn consolidate(&self, clock: &dyn TimeSource) -> Option<SoundSummary> {
        let mut stats = self.stats.lock_deadline(clock, CONSOLIDATE_WAIT_MS)?;

        let summary = SoundSummary {
            detections: stats.total_detections,
            max_duration_ms: stats.max_duration_ms,
        };
        stats.total_detections = 0;
        stats.max_duration_ms = 0;

        Some(summary)
    }

    /// True while a detection is in progress
    pub fn is_active(&self) -> bool {
        self.stats.lock().sound_active
    }

    /// Timestamp of the most recent detection start
    pub fn last_detection_time(&self) -> Timestamp {
        self.stats.lock().last_detection_time
    }

    /// Copy of the live statistics, for diagnostics
    pub fn snapshot(&self) -> SoundStats {
        *self.stats.lock()
    }

    #[cfg(test)]
    pub(crate) fn raw_lock(&self) -> &StatsLock<SoundStats> {
        &self.stats
    }
}

/// Confirmed transition reported by [`DebouncedInput`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Input confirmed high
    Rising,
    /// Input confirmed low
    Falling,
}

/// Polled debounce filter for a chattering digital input
///
/// A state change is accepted only once the input has held the new level
/// for the stability window; the callback fires exactly once per confirmed
/// transition. Pure and single-task: no locks, no interrupts.
#[derive(Debug, Clone)]
pub struct DebouncedInput {
    last_state: bool,
    last_change: Timestamp,
    window_ms: u32,
}

impl DebouncedInput {
    /// Start from the input's current level
    pub fn new(initial: bool, now: Timestamp) -> Self {
        Self::with_window(initial, now, DEBOUNCE_WINDOW_MS)
    }

    /// Start with a custom stability window
    pub fn with_window(initial: bool, now: Timestamp, window_ms: u32) -> Self {
        Self {
            last_state: initial,
            last_change: now,
            window_ms,
        }
    }

    /// Feed one polled sample; returns the accepted (debounced) state.
    ///
    /// `on_transition` is invoked at most once, with the confirmed
    /// transition, when a change is accepted.
    pub fn poll<F: FnMut(Transition)>(
        &mut self,
        level: bool,
        now: Timestamp,
        mut on_transition: F,
    ) -> bool {
        if level != self.last_state
            && now.saturating_sub(self.last_change) >= self.window_ms as u64
        {
            self.last_state = level;
            self.last_change = now;
            on_transition(if level { Transition::Rising } else { Transition::Falling });
        }
        self.last_state
    }

    /// Current accepted state without feeding a sample
    pub fn state(&self) -> bool {
        self.last_state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::{FixedClock, TickingClock};

    #[test]
    fn detection_finalized_on_falling_edge() {
        let agg = SoundEventAggregator::new();
        let clock = FixedClock::new(0);

        agg.record_edge(true, 1_000);
        assert!(agg.is_active());
        // Nothing counted until the detection ends
        assert_eq!(agg.snapshot().total_detections, 0);

        agg.record_edge(false, 1_120);
        assert!(!agg.is_active());

        let summary = agg.consolidate(&clock).unwrap();
        assert_eq!(summary.detections, 1);
        assert_eq!(summary.max_duration_ms, 120);
    }

    #[test]
    fn edge_pairs_accumulate_count_and_max() {
        let agg = SoundEventAggregator::new();
        let clock = FixedClock::new(0);

        let durations = [40u64, 250, 90, 10];
        let mut t = 0u64;
        for d in durations {
            agg.record_edge(true, t);
            agg.record_edge(false, t + d);
            t += d + 500;
        }

        let summary = agg.consolidate(&clock).unwrap();
        assert_eq!(summary.detections, durations.len() as u32);
        assert_eq!(summary.max_duration_ms, 250);
    }

    #[test]
    fn consolidate_is_a_drain_not_a_peek() {
        let agg = SoundEventAggregator::new();
        let clock = FixedClock::new(0);

        agg.record_edge(true, 0);
        agg.record_edge(false, 75);

        let first = agg.consolidate(&clock).unwrap();
        assert_eq!(first, SoundSummary { detections: 1, max_duration_ms: 75 });

        let second = agg.consolidate(&clock).unwrap();
        assert_eq!(second, SoundSummary { detections: 0, max_duration_ms: 0 });
    }

    #[test]
    fn detection_starting_at_boot_instant_is_counted() {
        let agg = SoundEventAggregator::new();
        let clock = FixedClock::new(0);

        // A rising edge at timestamp 0 is a legitimate detection start on
        // a millisecond clock that begins at boot
        agg.record_edge(true, 0);
        assert!(agg.is_active());
        agg.record_edge(false, 75);

        let summary = agg.consolidate(&clock).unwrap();
        assert_eq!(summary, SoundSummary { detections: 1, max_duration_ms: 75 });
    }

    #[test]
    fn consolidate_gives_up_while_the_lock_stays_held() {
        let agg = SoundEventAggregator::new();
        agg.record_edge(true, 10);
        agg.record_edge(false, 50);

        // Hold the lock across the drain attempt; the ticking clock lets
        // the bounded wait expire without a second thread
        let guard = agg.raw_lock().lock();
        let clock = TickingClock::new(0, 250);
        assert!(agg.consolidate(&clock).is_none());
        drop(guard);

        // The failed drain left the counters intact
        let summary = agg.consolidate(&FixedClock::new(0)).unwrap();
        assert_eq!(summary, SoundSummary { detections: 1, max_duration_ms: 40 });
    }

    #[test]
    fn out_of_order_edges_are_ignored() {
        let agg = SoundEventAggregator::new();
        let clock = FixedClock::new(0);

        // Falling with no detection in progress
        agg.record_edge(false, 100);
        // Double rising keeps the original start time
        agg.record_edge(true, 200);
        agg.record_edge(true, 300);
        agg.record_edge(false, 450);

        let summary = agg.consolidate(&clock).unwrap();
        assert_eq!(summary.detections, 1);
        assert_eq!(summary.max_duration_ms, 250);
    }

    #[test]
    fn in_progress_detection_survives_consolidation() {
        let agg = SoundEventAggregator::new();
        let clock = FixedClock::new(0);

        agg.record_edge(true, 1_000);
        let summary = agg.consolidate(&clock).unwrap();
        assert_eq!(summary.detections, 0);

        // The detection that straddled the boundary still finalizes
        agg.record_edge(false, 1_300);
        let next = agg.consolidate(&clock).unwrap();
        assert_eq!(next.detections, 1);
        assert_eq!(next.max_duration_ms, 300);
    }

    #[test]
    fn debounce_rejects_short_glitches() {
        let mut input = DebouncedInput::new(false, 0);
        let mut transitions = 0;

        // Chatter inside the stability window
        assert!(!input.poll(true, 10, |_| transitions += 1));
        assert!(!input.poll(true, 30, |_| transitions += 1));
        assert_eq!(transitions, 0);

        // Held past the window: accepted, callback fires once
        assert!(input.poll(true, 60, |_| transitions += 1));
        assert_eq!(transitions, 1);

        // Stable level produces no further callbacks
        assert!(input.poll(true, 200, |_| transitions += 1));
        assert_eq!(transitions, 1);
    }

    #[test]
    fn debounce_reports_transition_direction() {
        let mut input = DebouncedInput::with_window(false, 0, 50);
        let mut seen = heapless::Vec::<Transition, 4>::new();

        input.poll(true, 60, |t| seen.push(t).unwrap());
        input.poll(false, 200, |t| seen.push(t).unwrap());

        assert_eq!(seen.as_slice(), &[Transition::Rising, Transition::Falling]);
    }
}
