//! Constants for the Vigia sensing core
//!
//! Centralized numeric values for the whole pipeline. Everything that looks
//! like a magic number in the protocol, calibration, or buffer sizing lives
//! here with its source documented.
//!
//! ## Organization
//!
//! - **timing**: single-wire protocol windows, debounce and lock-wait
//!   intervals, acquisition pacing
//! - **gas**: analog front-end electrical constants, per-gas curve
//!   parameters, correction coefficients, EMA filter parameters
//! - **record**: record, nonce, and key buffer sizes for the encoder

/// Single-wire protocol timing windows, debounce and consolidation intervals.
pub mod timing;

/// Gas sensor electrical constants, curve parameters, and filter settings.
pub mod gas;

/// Buffer sizes for telemetry records and the sealed transport encoding.
pub mod record;

// Re-export the values used across module boundaries
pub use timing::{
    FRAME_SYMBOLS, FRAME_SYMBOLS_WITH_PREAMBLE, FRAME_BYTES, TRANSACTION_CAPACITY,
    DEBOUNCE_WINDOW_MS, CONSOLIDATE_WAIT_MS,
};

pub use gas::{GAS_SAMPLE_COUNT, EMA_ALPHA_Q15, Q15_ONE};

pub use record::{KEY_LEN, NONCE_LEN, MAX_RECORD_LEN, MAX_SEALED_LEN};
