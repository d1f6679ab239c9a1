//! Record Sealing
//!
//! Every outbound record is sealed with AES-256 in counter mode under a
//! pre-provisioned key, with a fresh random 16-byte nonce per record, and
//! the ciphertext rendered as standard base64 for the text-only transport.
//! The nonce travels alongside the sealed text; it is not secret, only
//! never-reused.
//!
//! The nonce source is injected: hosted builds construct the encoder over
//! the OS entropy pool ([`RecordEncoder::new`], `std` only), embedded
//! builds hand [`with_rng`] their hardware RNG. Either way a nonce-draw
//! failure is fatal for the record, never silently zero.
//!
//! CTR mode provides confidentiality, not integrity: [`open`] detects
//! malformed base64 but a bit-flipped ciphertext decrypts to garbage
//! plaintext without error. The backend validates the record's fixed
//! labels after opening.
//!
//! [`with_rng`]: RecordEncoder::with_rng
//! [`open`]: RecordEncoder::open

use aes::Aes256;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use ctr::cipher::{KeyIvInit, StreamCipher};
use rand::RngCore;

#[cfg(feature = "std")]
use rand::rngs::OsRng;

use crate::constants::record::{KEY_LEN, MAX_RECORD_LEN, MAX_SEALED_LEN, NONCE_LEN};
use crate::errors::EncodeError;

type Aes256Ctr = ctr::Ctr128BE<Aes256>;

/// One sealed record ready for delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedRecord {
    /// Per-record nonce; travels in the clear next to the text
    pub nonce: [u8; NONCE_LEN],
    /// Base64 ciphertext
    pub text: heapless::String<MAX_SEALED_LEN>,
}

/// Seals and opens telemetry records under one symmetric key
#[derive(Clone)]
pub struct RecordEncoder<R> {
    key: [u8; KEY_LEN],
    rng: R,
}

// Manual impl so the key never reaches logs.
impl<R> core::fmt::Debug for RecordEncoder<R> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RecordEncoder")
            .field("key", &"<redacted>")
            .finish_non_exhaustive()
    }
}

#[cfg(feature = "std")]
impl RecordEncoder<OsRng> {
    /// Encoder drawing nonces from the OS entropy pool
    pub fn new(key: [u8; KEY_LEN]) -> Self {
        Self::with_rng(key, OsRng)
    }
}

impl<R: RngCore> RecordEncoder<R> {
    /// Encoder over a pre-provisioned 256-bit key and an injected nonce
    /// source (hardware RNG on embedded targets)
    pub fn with_rng(key: [u8; KEY_LEN], rng: R) -> Self {
        Self { key, rng }
    }

    /// Seal one plaintext record.
    ///
    /// Draws a fresh nonce from the encoder's entropy source, encrypts in
    /// place, and base64-encodes the ciphertext. On any failure the record
    /// is not emitted at all; a record never leaves the node unencrypted.
    pub fn seal(&mut self, plaintext: &[u8]) -> Result<SealedRecord, EncodeError> {
        if plaintext.len() > MAX_RECORD_LEN {
            return Err(EncodeError::RecordTooLong {
                len: plaintext.len(),
            });
        }

        let mut nonce = [0u8; NONCE_LEN];
        self.rng
            .try_fill_bytes(&mut nonce)
            .map_err(|_| EncodeError::RngFailure)?;

        let mut buffer: heapless::Vec<u8, MAX_RECORD_LEN> = heapless::Vec::new();
        buffer
            .extend_from_slice(plaintext)
            .map_err(|_| EncodeError::RecordTooLong {
                len: plaintext.len(),
            })?;

        let mut cipher = Aes256Ctr::new((&self.key).into(), (&nonce).into());
        cipher.apply_keystream(&mut buffer);

        let mut encoded = [0u8; MAX_SEALED_LEN];
        let written = STANDARD
            .encode_slice(&buffer, &mut encoded)
            .map_err(|_| EncodeError::OutputOverflow)?;

        let mut text = heapless::String::new();
        // Base64 output is pure ASCII
        let ascii =
            core::str::from_utf8(&encoded[..written]).map_err(|_| EncodeError::OutputOverflow)?;
        text.push_str(ascii).map_err(|_| EncodeError::OutputOverflow)?;

        Ok(SealedRecord { nonce, text })
    }

    /// Recover the plaintext of a sealed record.
    ///
    /// Provided for loopback verification and host-side tooling; the node
    /// itself only seals.
    pub fn open(
        &self,
        nonce: &[u8; NONCE_LEN],
        text: &str,
    ) -> Result<heapless::Vec<u8, MAX_RECORD_LEN>, EncodeError> {
        let mut decoded = [0u8; MAX_SEALED_LEN];
        let written = STANDARD
            .decode_slice(text.as_bytes(), &mut decoded)
            .map_err(|_| EncodeError::MalformedCiphertext)?;
        if written > MAX_RECORD_LEN {
            return Err(EncodeError::MalformedCiphertext);
        }

        let mut buffer: heapless::Vec<u8, MAX_RECORD_LEN> = heapless::Vec::new();
        buffer
            .extend_from_slice(&decoded[..written])
            .map_err(|_| EncodeError::MalformedCiphertext)?;

        let mut cipher = Aes256Ctr::new((&self.key).into(), nonce.into());
        cipher.apply_keystream(&mut buffer);

        Ok(buffer)
    }
}
