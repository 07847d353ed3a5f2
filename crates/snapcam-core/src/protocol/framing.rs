//! Length-prefixed response framing.
//!
//! Wire format:
//! ```text
//! [payload_len:4][payload:N]
//! ```
//! `payload_len` is an `i32` in the host's native byte order.  There is no
//! version byte, checksum or terminator.  A reader must treat the prefix and
//! the payload as one unit.

use thiserror::Error;

/// Size of the length prefix in bytes.
pub const LENGTH_PREFIX_SIZE: usize = std::mem::size_of::<i32>();

/// Errors that can occur while framing or unframing a response.
#[derive(Debug, Error, PartialEq)]
pub enum ProtocolError {
    /// The byte slice is shorter than the minimum required length.
    #[error("insufficient data: need at least {needed} bytes, got {available}")]
    InsufficientData { needed: usize, available: usize },

    /// The payload does not fit in the signed 32-bit length prefix.
    #[error("payload of {0} bytes exceeds the i32 length prefix")]
    PayloadTooLarge(usize),

    /// The length prefix decoded to a negative value.
    #[error("negative payload length: {0}")]
    NegativeLength(i32),
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Encodes the length prefix for a payload of `payload_len` bytes.
///
/// # Errors
///
/// Returns [`ProtocolError::PayloadTooLarge`] if `payload_len` exceeds
/// `i32::MAX`.
pub fn encode_length_prefix(payload_len: usize) -> Result<[u8; LENGTH_PREFIX_SIZE], ProtocolError> {
    let len = i32::try_from(payload_len).map_err(|_| ProtocolError::PayloadTooLarge(payload_len))?;
    Ok(len.to_ne_bytes())
}

/// Decodes the payload length from the first [`LENGTH_PREFIX_SIZE`] bytes.
///
/// # Errors
///
/// Returns [`ProtocolError::InsufficientData`] if fewer than four bytes are
/// available and [`ProtocolError::NegativeLength`] for a negative prefix.
pub fn decode_length_prefix(bytes: &[u8]) -> Result<usize, ProtocolError> {
    if bytes.len() < LENGTH_PREFIX_SIZE {
        return Err(ProtocolError::InsufficientData {
            needed: LENGTH_PREFIX_SIZE,
            available: bytes.len(),
        });
    }

    let len = i32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    usize::try_from(len).map_err(|_| ProtocolError::NegativeLength(len))
}

/// Encodes a complete response frame (prefix followed by payload).
///
/// # Errors
///
/// Returns [`ProtocolError::PayloadTooLarge`] if the payload cannot be
/// described by the length prefix.
///
/// # Examples
///
/// ```rust
/// use snapcam_core::{decode_response_frame, encode_response_frame};
///
/// let bytes = encode_response_frame(b"\xFF\xD8jpeg").unwrap();
/// let (payload, consumed) = decode_response_frame(&bytes).unwrap();
/// assert_eq!(payload, b"\xFF\xD8jpeg");
/// assert_eq!(consumed, bytes.len());
/// ```
pub fn encode_response_frame(payload: &[u8]) -> Result<Vec<u8>, ProtocolError> {
    let prefix = encode_length_prefix(payload.len())?;

    let mut buf = Vec::with_capacity(LENGTH_PREFIX_SIZE + payload.len());
    buf.extend_from_slice(&prefix);
    buf.extend_from_slice(payload);
    Ok(buf)
}

/// Decodes one response frame from the beginning of `bytes`.
///
/// Returns the payload slice and the total number of bytes consumed
/// (prefix + payload), so a streaming reader can advance its cursor.
///
/// # Errors
///
/// Returns [`ProtocolError::InsufficientData`] until the whole frame is
/// available; this is the normal signal to read more bytes.
pub fn decode_response_frame(bytes: &[u8]) -> Result<(&[u8], usize), ProtocolError> {
    let payload_len = decode_length_prefix(bytes)?;

    let total_needed = LENGTH_PREFIX_SIZE + payload_len;
    if bytes.len() < total_needed {
        return Err(ProtocolError::InsufficientData {
            needed: total_needed,
            available: bytes.len(),
        });
    }

    Ok((&bytes[LENGTH_PREFIX_SIZE..total_needed], total_needed))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
