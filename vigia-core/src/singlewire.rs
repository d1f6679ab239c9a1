//! Single-Wire Edge-Timing Decoder
//!
//! ## Overview
//!
//! The humidity/temperature sensor speaks a proprietary single-wire protocol:
//! after a drive-low/release handshake from the host, the sensor answers with
//! 40 bits, each transmitted as a ~50 us low phase followed by a high phase
//! whose duration encodes the bit (~27 us for `0`, ~70 us for `1`).
//!
//! A hardware capture unit measures the line and hands this module a sequence
//! of [`EdgeSymbol`]s, one (level, duration) pair per phase of a low/high cycle.
//! [`decode`] turns that sequence back into the five frame bytes:
//!
//! ```text
//! symbol:   |__50us__|‾‾27us‾‾|  →  bit 0
//!           |__50us__|‾‾‾‾70us‾‾‾‾|  →  bit 1
//!
//! 40 bits, MSB first:
//! [humidity][humidity frac][temperature][temperature frac][checksum]
//! ```
//!
//! ## Jitter tolerance
//!
//! Symbols whose low phase falls outside the validated window, or that are
//! not a low-to-high cycle, are skipped without advancing the bit index and
//! without failing the frame. This is a deliberate leniency for capture
//! jitter on a noisy line; it can also absorb real transmission errors, and
//! the checksum is the backstop. Do not tighten it without data from real
//! captures.
//!
//! ## Concurrency
//!
//! Decoding is a pure function of its input. The blocking acquisition in
//! [`SingleWireSensor`] performs hardware handshake waits and must only ever
//! be called from task context, never from an interrupt handler.

use crate::constants::timing::{
    FRAME_BYTES, FRAME_SYMBOLS, FRAME_SYMBOLS_WITH_PREAMBLE, HIGH_PHASE_DATA_MIN_US,
    HIGH_PHASE_ONE_MIN_US, LOW_PHASE_MAX_US, LOW_PHASE_MIN_US, TRANSACTION_CAPACITY,
};
use crate::errors::DecodeError;

/// Line level during one phase of a captured symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Level {
    /// Line held low
    Low,
    /// Line held high
    High,
}

/// One captured low/high cycle from the capture facility
///
/// Produced by hardware, consumed exactly once by [`decode`], never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EdgeSymbol {
    /// Level of the first phase
    pub first_level: Level,
    /// Duration of the first phase in microseconds
    pub first_us: u16,
    /// Level of the second phase
    pub second_level: Level,
    /// Duration of the second phase in microseconds
    pub second_us: u16,
}

impl EdgeSymbol {
    /// A well-formed low-then-high data cycle
    pub const fn cycle(low_us: u16, high_us: u16) -> Self {
        Self {
            first_level: Level::Low,
            first_us: low_us,
            second_level: Level::High,
            second_us: high_us,
        }
    }

    /// True when the symbol represents a low-to-high transition
    pub fn is_rising(&self) -> bool {
        self.first_level == Level::Low && self.second_level == Level::High
    }
}

/// One protocol transaction's worth of captured symbols
///
/// Fixed capacity, lives for a single decode call.
pub type Transaction = heapless::Vec<EdgeSymbol, TRANSACTION_CAPACITY>;

/// Decoded sensor frame: four payload bytes plus the received checksum
///
/// Frames are value types. A failed read never mutates a previously decoded
/// frame; callers hold the last good frame and replace it wholesale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SensorFrame {
    /// Integer part of relative humidity (%)
    pub humidity: u8,
    /// Fractional part of relative humidity (tenths)
    pub humidity_decimal: u8,
    /// Integer part of temperature (degrees C)
    pub temperature: u8,
    /// Fractional part of temperature (tenths)
    pub temperature_decimal: u8,
    /// Checksum byte as transmitted by the sensor
    pub checksum: u8,
}

impl SensorFrame {
    /// Build a frame from raw bytes, enforcing the checksum and rejecting
    /// the all-zero payload.
    pub fn from_bytes(bytes: [u8; FRAME_BYTES]) -> Result<Self, DecodeError> {
        let computed = bytes[0]
            .wrapping_add(bytes[1])
            .wrapping_add(bytes[2])
            .wrapping_add(bytes[3]);
        if computed != bytes[4] {
            return Err(DecodeError::ChecksumMismatch {
                computed,
                received: bytes[4],
            });
        }

        // Zero humidity and temperature together means the sensor never
        // answered; the checksum trivially matches, so check it separately.
        if bytes[0] == 0 && bytes[1] == 0 && bytes[2] == 0 && bytes[3] == 0 {
            return Err(DecodeError::InvalidReading);
        }

        Ok(Self {
            humidity: bytes[0],
            humidity_decimal: bytes[1],
            temperature: bytes[2],
            temperature_decimal: bytes[3],
            checksum: bytes[4],
        })
    }

    /// Relative humidity as a single float (%)
    pub fn humidity_percent(&self) -> f32 {
        self.humidity as f32 + self.humidity_decimal as f32 / 10.0
    }

    /// Temperature as a single float (degrees C)
    pub fn temperature_celsius(&self) -> f32 {
        self.temperature as f32 + self.temperature_decimal as f32 / 10.0
    }
}

/// Decode a captured transaction into a sensor frame.
///
/// `count` is the number of symbols the capture facility actually produced:
/// 41 for a bare frame, 42 when the initial handshake artifact was captured
/// too (it is skipped before decoding). Any other count is rejected as a
/// capture-driver bug.
///
/// Bits fill each byte MSB first; every 8 bits close out one of the five
/// frame bytes in protocol order. Out-of-window or wrong-direction symbols
/// are skipped without advancing the bit index (see module docs).
pub fn decode(symbols: &[EdgeSymbol], count: u8) -> Result<SensorFrame, DecodeError> {
    if count as usize > symbols.len() {
        return Err(DecodeError::UnexpectedSymbolCount { count });
    }

    let data_symbols = match count {
        FRAME_SYMBOLS => &symbols[..count as usize],
        FRAME_SYMBOLS_WITH_PREAMBLE => &symbols[1..count as usize],
        _ => return Err(DecodeError::UnexpectedSymbolCount { count }),
    };

    let mut bytes = [0u8; FRAME_BYTES];
    let mut bit = 0usize;

    for symbol in data_symbols {
        // Low phase must sit inside the validated bit-start window.
        if symbol.first_us <= LOW_PHASE_MIN_US || symbol.first_us >= LOW_PHASE_MAX_US {
            continue;
        }
        if !symbol.is_rising() {
            continue;
        }
        // Too-short high pulses are capture glitches, not bits.
        if symbol.second_us <= HIGH_PHASE_DATA_MIN_US {
            continue;
        }
        if bit >= FRAME_BYTES * 8 {
            break;
        }

        if symbol.second_us > HIGH_PHASE_ONE_MIN_US {
            bytes[bit / 8] |= 1 << (7 - (bit % 8));
        }
        bit += 1;
    }

    SensorFrame::from_bytes(bytes)
}

/// Raw capture facility for the single-wire line (external collaborator).
///
/// An implementation performs the timing-sensitive handshake (drive the
/// line low for [`START_SIGNAL_LOW_US`](crate::constants::timing::START_SIGNAL_LOW_US),
/// release it high for [`START_SIGNAL_HIGH_US`](crate::constants::timing::START_SIGNAL_HIGH_US),
/// then listen) and fills `transaction` with up to 42 captured symbols,
/// returning the exact count, or [`CaptureTimeout`] if the sensor never
/// answered within the capture window.
pub trait EdgeCapture {
    /// Run the handshake and capture one transaction
    fn acquire(&mut self, transaction: &mut Transaction) -> Result<u8, CaptureTimeout>;
}

/// The capture window elapsed without a complete sensor response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureTimeout;

/// Blocking single-wire sensor built on a capture facility
///
/// Task-context only: the capture handshake blocks for tens of
/// milliseconds. One capture timeout per read is tolerated by mapping it to
/// [`DecodeError::Timeout`]; the caller retries on the next period.
#[derive(Debug)]
pub struct SingleWireSensor<C> {
    capture: C,
}

impl<C: EdgeCapture> SingleWireSensor<C> {
    /// Wrap a capture facility
    pub fn new(capture: C) -> Self {
        Self { capture }
    }

    /// Perform one handshake-and-decode, returning a fresh frame
    pub fn read(&mut self) -> Result<SensorFrame, DecodeError> {
        let mut transaction = Transaction::new();
        let count = self
            .capture
            .acquire(&mut transaction)
            .map_err(|_| DecodeError::Timeout)?;
        decode(&transaction, count)
    }

    /// Access the underlying capture facility
    pub fn capture_mut(&mut self) -> &mut C {
        &mut self.capture
    }
}
