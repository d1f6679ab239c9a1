//! Sensing and telemetry core for Vigia environmental nodes
//!
//! Decodes the single-wire climate sensor, aggregates interrupt-driven
//! sound events, estimates gas concentration from the analog front end,
//! and periodically seals the consolidated record for delivery.
//! Designed for battery-powered edge devices with limited resources.
//!
//! Key constraints:
//! - No heap allocation anywhere in the pipeline
//! - Interrupt handlers do one atomic operation, nothing more
//! - A failed channel degrades one period's data, never availability
//! - Records leave the node encrypted or not at all
//!
//! ```no_run
//! use vigia_core::{RecordEncoder, SoundEventAggregator, TelemetryRecord};
//!
//! let sound = SoundEventAggregator::new();
//! sound.record_edge(true, 1_000);
//! sound.record_edge(false, 1_120);
//!
//! let mut encoder = RecordEncoder::new([0u8; 32]);
//! let record = TelemetryRecord::default();
//!
//! // Format and seal one period's record
//! match encoder.seal(record.format().as_bytes()) {
//!     Ok(sealed) => {}, // Hand nonce + text to the sink
//!     Err(e) => {},     // Drop the period, never send plaintext
//! }
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod constants;
pub mod encode;
pub mod errors;
pub mod gas;
pub mod record;
pub mod singlewire;
pub mod sound;
pub mod sync;
pub mod telemetry;
pub mod time;

// Public API
pub use encode::{RecordEncoder, SealedRecord};
pub use errors::{DecodeError, EncodeError, SetupError};
pub use gas::{GasChannel, GasConcentrationEstimator, GasKind, MqGasChannel, NoGas};
pub use record::TelemetryRecord;
pub use singlewire::{EdgeSymbol, SensorFrame, SingleWireSensor};
pub use sound::{SoundEventAggregator, SoundSummary};
pub use telemetry::{CycleConfig, PeriodOutcome, RecordSink, TelemetryCycle};
pub use time::{DelayMs, TimeSource, Timestamp};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
