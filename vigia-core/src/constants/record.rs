//! Record and Encoder Buffer Sizes
//!
//! The telemetry record has a fixed shape, so its worst-case length is known
//! at compile time and every buffer in the encode path can be bounded.

/// Pre-provisioned symmetric key length (bytes, AES-256).
pub const KEY_LEN: usize = 32;

/// Per-record nonce length (bytes, one cipher block).
pub const NONCE_LEN: usize = 16;

/// Worst-case plaintext length of the formatted record.
///
/// The fixed-label record maxes out at 128 bytes with every numeric field at
/// its widest; headroom on top of that keeps the bound honest if a label
/// ever grows.
pub const MAX_RECORD_LEN: usize = 160;

/// Worst-case sealed (base64) output length.
///
/// ceil(160 / 3) * 4 = 216 bytes of base64 for a full-length record.
pub const MAX_SEALED_LEN: usize = 256;
