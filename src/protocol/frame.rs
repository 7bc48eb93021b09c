use bytes::{Bytes, BytesMut};

use super::{CodecError, PacketType, remaining_length};

/// One packet split off the byte stream, body not yet interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Fixed header byte: packet type in the high nibble, flags in the low.
    pub header: u8,
    pub body: Bytes,
}

/// Largest packet the wire format can describe: one header byte, four
/// length bytes and the maximum remaining length.
pub const MAX_PACKET_SIZE: usize =
    1 + remaining_length::MAX_ENCODED_LEN + remaining_length::MAX_REMAINING_LENGTH;

impl Frame {
    /// Splits the next complete packet off the front of `buffer`.
    ///
    /// Returns `Ok(None)` and leaves `buffer` untouched while the packet is
    /// still incomplete, so the caller can read more and try again.
    pub fn parse(buffer: &mut BytesMut) -> Result<Option<Frame>, CodecError> {
        Self::parse_limited(buffer, MAX_PACKET_SIZE)
    }

    /// Like [`Frame::parse`], but rejects a packet whose declared size is
    /// over `max_packet_size` as soon as its fixed header is readable.
    ///
    /// Only bytes that already arrived are buffered; the declared length is
    /// never used to grow `buffer`.
    pub fn parse_limited(
        buffer: &mut BytesMut,
        max_packet_size: usize,
    ) -> Result<Option<Frame>, CodecError> {
        if buffer.is_empty() {
            return Ok(None);
        }

        let Some((body_len, len_bytes)) = remaining_length::decode(&buffer[1..])? else {
            return Ok(None);
        };

        let header_len = 1 + len_bytes;
        let total_len = header_len + body_len;
        if total_len > max_packet_size {
            return Err(CodecError::PacketTooLarge {
                size: total_len,
                limit: max_packet_size,
            });
        }
        if buffer.len() < total_len {
            return Ok(None);
        }

        let mut packet = buffer.split_to(total_len).freeze();
        let header = packet[0];
        let body = packet.split_off(header_len);
        Ok(Some(Frame { header, body }))
    }

    pub fn packet_type(&self) -> Option<PacketType> {
        PacketType::from_header(self.header)
    }

    pub fn flags(&self) -> u8 {
        self.header & 0x0F
    }
}

/// Builds a complete packet: fixed header, remaining length, then `body`.
pub fn encode_frame(packet_type: PacketType, flags: u8, body: &[u8]) -> Result<Bytes, CodecError> {
    let mut buf =
        BytesMut::with_capacity(1 + remaining_length::encoded_len(body.len()) + body.len());
    buf.extend_from_slice(&[((packet_type as u8) << 4) | (flags & 0x0F)]);
    remaining_length::encode(&mut buf, body.len())?;
    buf.extend_from_slice(body);
    Ok(buf.freeze())
}
