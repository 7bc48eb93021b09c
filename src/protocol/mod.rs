//! The `protocol` module implements the binary wire format spoken between
//! clients and the broker.
//!
//! Every packet starts with a one byte fixed header (packet type in the high
//! nibble, flags in the low nibble) followed by a variable-length
//! "remaining length" and the packet body. Framing lives in [`frame`], the
//! length integer in [`remaining_length`], and typed bodies in [`packet`].

pub mod error;
pub mod frame;
pub mod packet;
pub mod packet_type;
pub mod remaining_length;

pub use error::CodecError;
pub use frame::{Frame, MAX_PACKET_SIZE, encode_frame};
pub use packet::{Connect, Packet, Publish, SubAck, Subscribe, Unsubscribe};
pub use packet_type::PacketType;
