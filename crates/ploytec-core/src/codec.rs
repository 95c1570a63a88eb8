//! MIDI word codec.
//!
//! The driver consumes short MIDI messages as a single 64-bit word: the low
//! byte holds the message length (1..=3) and byte `i + 1` holds message byte
//! `i`, in original order. All bytes above the payload are zero. The word is
//! therefore exactly the little-endian reading of `[len, b0, b1, b2, 0, 0,
//! 0, 0]`. This layout is shared with the hardware-facing driver and must be
//! reproduced bit-exactly.

use thiserror::Error;

/// Longest MIDI message the driver accepts (status byte + two data bytes).
pub const MAX_MESSAGE_LEN: usize = 3;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecError {
    #[error("invalid MIDI message length: {len} (expected 1..={MAX_MESSAGE_LEN})")]
    InvalidLength { len: usize },
}

/// Pack a 1..=3 byte MIDI message into the driver's word format.
pub fn encode(bytes: &[u8]) -> Result<u64, CodecError> {
    if bytes.is_empty() || bytes.len() > MAX_MESSAGE_LEN {
        return Err(CodecError::InvalidLength { len: bytes.len() });
    }
    let mut buf = [0u8; 8];
    buf[0] = bytes.len() as u8;
    buf[1..1 + bytes.len()].copy_from_slice(bytes);
    Ok(u64::from_le_bytes(buf))
}

/// Unpack a driver word back into the original message bytes.
///
/// Exact left inverse of [`encode`]: `decode(encode(b)) == b` for every
/// valid `b`. Bytes above the encoded length are discarded.
pub fn decode(word: u64) -> Result<Vec<u8>, CodecError> {
    let buf = word.to_le_bytes();
    let len = buf[0] as usize;
    if len == 0 || len > MAX_MESSAGE_LEN {
        return Err(CodecError::InvalidLength { len });
    }
    Ok(buf[1..1 + len].to_vec())
}
