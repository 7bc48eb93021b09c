use thiserror::Error;

/// Errors raised while splitting, decoding or encoding packets.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The bytes on the wire do not form a valid packet.
    #[error("malformed packet: {0}")]
    MalformedPacket(String),

    /// A value is too large for the field it has to be written into.
    #[error("value {0} does not fit in its length field")]
    LengthOutOfRange(usize),

    /// A declared packet is bigger than the connection accepts.
    #[error("packet of {size} bytes exceeds the {limit} byte limit")]
    PacketTooLarge { size: usize, limit: usize },
}

impl CodecError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        CodecError::MalformedPacket(reason.into())
    }
}
