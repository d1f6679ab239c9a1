//! Error Types for the Acquisition and Encoding Pipeline
//!
//! ## Design Philosophy
//!
//! Vigia's error system follows the constraints of a battery-powered node:
//!
//! 1. **Small Size**: Every variant is kept to a few inline bytes; errors are
//!    returned once per period in the worst case but must never allocate.
//!
//! 2. **Copy Semantics**: All errors implement `Copy` so they can be returned,
//!    logged, and stored in outcomes without move complications.
//!
//! 3. **Taxonomy over detail**: What matters to the caller is the *category*
//!    of failure, because the recovery policy is fixed per category:
//!
//!    - Transient data errors (`ChecksumMismatch`, `InvalidReading`,
//!      `Timeout`) substitute zeroed fields for one period and continue.
//!    - Programming errors (`UnexpectedSymbolCount`, `InvalidSampleRate`)
//!      indicate a setup bug, not a runtime condition to retry.
//!    - Record-fatal errors (`EncodeError::*`) drop the period's record but
//!      never terminate the node.
//!
//! No error defined here should ever bring the process down: every
//! recoverable path degrades data quality for one period, not availability.

use thiserror_no_std::Error;

/// Errors from the single-wire edge-timing decoder and its capture path.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// Decode was handed a transaction of the wrong length.
    ///
    /// Only 41- and 42-symbol transactions are meaningful for the 40-bit
    /// protocol. Anything else is a capture-driver bug, not line noise.
    #[error("unexpected symbol count {count}, expected 41 or 42")]
    UnexpectedSymbolCount {
        /// Symbol count the caller claimed to have captured
        count: u8,
    },

    /// The received checksum byte does not match the payload sum.
    #[error("checksum mismatch: computed {computed}, received {received}")]
    ChecksumMismatch {
        /// Sum of the four payload bytes, modulo 256
        computed: u8,
        /// Checksum byte the sensor transmitted
        received: u8,
    },

    /// All four payload bytes were zero.
    ///
    /// Zero humidity and zero temperature together are not a legitimate
    /// reading; they indicate the sensor never drove the line.
    #[error("all-zero payload is not a valid reading")]
    InvalidReading,

    /// The capture facility timed out waiting for the sensor response.
    #[error("capture timed out waiting for sensor response")]
    Timeout,
}

/// Errors from sealing a telemetry record for transport.
///
/// All of these are fatal for the record in question: the cycle drops the
/// period's contribution and moves on, emitting nothing partial.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeError {
    /// The encoder's nonce source failed to produce entropy.
    #[error("nonce source unavailable")]
    RngFailure,

    /// Plaintext exceeds the fixed record budget.
    #[error("record of {len} bytes exceeds the plaintext budget")]
    RecordTooLong {
        /// Length of the offending plaintext
        len: usize,
    },

    /// Encoded output does not fit the sealed-record buffer.
    #[error("encoded output does not fit the sealed buffer")]
    OutputOverflow,

    /// Ciphertext text handed to `open` is not valid base64.
    #[error("ciphertext is not valid base64")]
    MalformedCiphertext,
}

/// Configuration and initialization errors.
///
/// These signal setup bugs and are distinguishable from data errors so that
/// callers never silently "recover" from a miswired node.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupError {
    /// The configured sampling interval is out of range.
    #[error("invalid sample rate: {minutes} minutes")]
    InvalidSampleRate {
        /// Configured interval in minutes
        minutes: u32,
    },
}

#[cfg(feature = "defmt")]
impl defmt::Format for DecodeError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::UnexpectedSymbolCount { count } =>
                defmt::write!(fmt, "unexpected symbol count {}", count),
            Self::ChecksumMismatch { computed, received } =>
                defmt::write!(fmt, "checksum mismatch: computed {}, received {}", computed, received),
            Self::InvalidReading =>
                defmt::write!(fmt, "all-zero payload"),
            Self::Timeout =>
                defmt::write!(fmt, "capture timeout"),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for SetupError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::InvalidSampleRate { minutes } =>
                defmt::write!(fmt, "invalid sample rate: {} minutes", minutes),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for EncodeError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::RngFailure => defmt::write!(fmt, "nonce source unavailable"),
            Self::RecordTooLong { len } => defmt::write!(fmt, "record too long: {}", len),
            Self::OutputOverflow => defmt::write!(fmt, "sealed buffer overflow"),
            Self::MalformedCiphertext => defmt::write!(fmt, "malformed ciphertext"),
        }
    }
}
