//! The "remaining length" integer: base-128, least significant group first,
//! high bit set on every byte except the last, at most four bytes.

use bytes::BufMut;

use super::CodecError;

/// Largest value four encoding bytes can carry.
pub const MAX_REMAINING_LENGTH: usize = 268_435_455;

/// Maximum number of bytes the field may occupy.
pub const MAX_ENCODED_LEN: usize = 4;

/// Number of bytes `value` occupies once encoded.
pub const fn encoded_len(value: usize) -> usize {
    if value < 128 {
        1
    } else if value < 16_384 {
        2
    } else if value < 2_097_152 {
        3
    } else {
        4
    }
}

/// Appends the encoding of `value` to `buf`.
pub fn encode<B: BufMut>(buf: &mut B, value: usize) -> Result<(), CodecError> {
    if value > MAX_REMAINING_LENGTH {
        return Err(CodecError::LengthOutOfRange(value));
    }

    let mut remaining = value;
    loop {
        let mut byte = (remaining % 128) as u8;
        remaining /= 128;
        if remaining > 0 {
            byte |= 0x80;
        }
        buf.put_u8(byte);
        if remaining == 0 {
            return Ok(());
        }
    }
}

/// Decodes a length from the start of `bytes`.
///
/// Returns `Ok(None)` when `bytes` ends before the terminating byte, and the
/// decoded value with the number of bytes consumed otherwise. Four bytes that
/// all carry the continuation bit are rejected without waiting for a fifth.
pub fn decode(bytes: &[u8]) -> Result<Option<(usize, usize)>, CodecError> {
    let mut value = 0usize;

    for index in 0..MAX_ENCODED_LEN {
        let Some(&byte) = bytes.get(index) else {
            return Ok(None);
        };
        value |= usize::from(byte & 0x7F) << (7 * index);
        if byte & 0x80 == 0 {
            return Ok(Some((value, index + 1)));
        }
    }

    Err(CodecError::malformed("remaining length exceeds four bytes"))
}
