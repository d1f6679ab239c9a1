//! Common test utilities for integration tests
//!
//! This module provides:
//! - Edge-symbol transaction builders mimicking real sensor captures
//! - A scripted capture driver standing in for the GPIO edge recorder
//! - An in-memory delivery sink that remembers every sealed record

#![allow(dead_code)]

use vigia_core::singlewire::{CaptureTimeout, EdgeCapture, EdgeSymbol, Transaction};
use vigia_core::telemetry::RecordSink;

use std::convert::Infallible;

/// Low-phase duration used by every well-formed fixture (µs)
pub const BIT_LOW_US: u16 = 50;
/// High-phase duration encoding a zero bit (µs)
pub const BIT_ZERO_US: u16 = 27;
/// High-phase duration encoding a one bit (µs)
pub const BIT_ONE_US: u16 = 70;

/// Build a clean 41-symbol transaction for the given payload.
///
/// The first symbol is a sub-threshold glitch the decoder must skip; the
/// remaining 40 carry the payload bytes plus their checksum, MSB first.
pub fn transaction_for(payload: [u8; 4]) -> Transaction {
    let checksum = payload.iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
    transaction_with_checksum(payload, checksum)
}

/// Same as [`transaction_for`] but with an explicit (possibly wrong) checksum
pub fn transaction_with_checksum(payload: [u8; 4], checksum: u8) -> Transaction {
    let bytes = [payload[0], payload[1], payload[2], payload[3], checksum];
    let mut symbols = Transaction::new();
    symbols.push(EdgeSymbol::cycle(BIT_LOW_US, 5)).unwrap();
    for byte in bytes {
        for bit in (0..8).rev() {
            let high_us = if (byte >> bit) & 1 == 1 {
                BIT_ONE_US
            } else {
                BIT_ZERO_US
            };
            symbols.push(EdgeSymbol::cycle(BIT_LOW_US, high_us)).unwrap();
        }
    }
    symbols
}

/// A transaction carrying a full 42-symbol capture with response preamble
pub fn transaction_with_preamble(payload: [u8; 4]) -> Transaction {
    let mut symbols = Transaction::new();
    // Sensor response preamble: 80 µs low, 80 µs high
    symbols.push(EdgeSymbol::cycle(80, 80)).unwrap();
    for symbol in transaction_for(payload) {
        symbols.push(symbol).unwrap();
    }
    symbols
}

/// Capture driver replaying a scripted transaction
pub struct ScriptedCapture {
    symbols: Transaction,
    count: u8,
    fail: bool,
}

impl ScriptedCapture {
    /// Replays `symbols`, reporting `count` of them captured
    pub fn new(symbols: Transaction, count: u8) -> Self {
        Self {
            symbols,
            count,
            fail: false,
        }
    }

    /// A capture that always times out
    pub fn timing_out() -> Self {
        Self {
            symbols: Transaction::new(),
            count: 0,
            fail: true,
        }
    }
}

impl EdgeCapture for ScriptedCapture {
    fn acquire(&mut self, transaction: &mut Transaction) -> Result<u8, CaptureTimeout> {
        if self.fail {
            return Err(CaptureTimeout);
        }
        transaction.clear();
        transaction
            .extend_from_slice(&self.symbols)
            .map_err(|_| CaptureTimeout)?;
        Ok(self.count)
    }
}

/// Delivery sink remembering every sealed record it accepted
#[derive(Default)]
pub struct MemorySink {
    /// (nonce, sealed text) pairs in delivery order
    pub deliveries: Vec<([u8; 16], String)>,
}

impl RecordSink for &mut MemorySink {
    type Error = Infallible;

    fn deliver(&mut self, nonce: &[u8; 16], text: &str) -> Result<(), Infallible> {
        self.deliveries.push((*nonce, text.to_string()));
        Ok(())
    }
}
