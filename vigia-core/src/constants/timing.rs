//! Timing Constants for the Single-Wire Protocol and Event Handling
//!
//! The single-wire sensor signals each bit as a fixed-length low phase
//! followed by a high phase whose duration carries the bit value. All
//! windows below are in microseconds and come from the sensor's datasheet
//! timing diagram, widened to tolerate edge-capture jitter.

// ===== SINGLE-WIRE FRAME SHAPE =====

/// Data symbols in one protocol transaction (40 bits + response pulse).
pub const FRAME_SYMBOLS: u8 = 41;

/// Transaction length when the capture includes the initial handshake
/// artifact; the first symbol is skipped before decoding.
pub const FRAME_SYMBOLS_WITH_PREAMBLE: u8 = 42;

/// Decoded frame size: four payload bytes plus one checksum byte.
pub const FRAME_BYTES: usize = 5;

/// Capacity of the capture transaction buffer.
///
/// Must be at least [`FRAME_SYMBOLS_WITH_PREAMBLE`]; rounded up so a
/// slightly over-eager capture driver never truncates a frame.
pub const TRANSACTION_CAPACITY: usize = 48;

// ===== BIT TIMING WINDOWS (MICROSECONDS) =====

/// Lower bound of the valid low-phase (bit start) duration.
///
/// Nominal low phase is 50 us; anything shorter is capture jitter and the
/// symbol is skipped without failing the frame.
pub const LOW_PHASE_MIN_US: u16 = 30;

/// Upper bound of the valid low-phase duration.
pub const LOW_PHASE_MAX_US: u16 = 90;

/// Minimum high-phase duration for a symbol to count as a data bit at all.
///
/// Shorter high pulses are glitches from the capture unit, not bits.
pub const HIGH_PHASE_DATA_MIN_US: u16 = 12;

/// High-phase duration above which a bit decodes as `1`.
///
/// Nominal: ~27 us for a `0`, ~70 us for a `1`. The sensor's datasheet
/// threshold is 40 us.
pub const HIGH_PHASE_ONE_MIN_US: u16 = 40;

// ===== HANDSHAKE (DOCUMENTED FOR CAPTURE IMPLEMENTATIONS) =====

/// Host drives the line low for this long to request a reading.
pub const START_SIGNAL_LOW_US: u32 = 20_000;

/// Host releases high for this long before handing the line to the sensor.
pub const START_SIGNAL_HIGH_US: u32 = 40;

// ===== EVENT HANDLING INTERVALS (MILLISECONDS) =====

/// Stability window for the debounced sound-input profile.
///
/// A level change is only accepted as a real transition after the input has
/// held the new level for this long.
pub const DEBOUNCE_WINDOW_MS: u32 = 50;

/// Bounded wait for the sound-statistics lock during consolidation.
///
/// If the consolidating side cannot take the lock within this window, the
/// period's sound fields are zeroed instead of stalling the telemetry cycle.
pub const CONSOLIDATE_WAIT_MS: u64 = 1_000;
