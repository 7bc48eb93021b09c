/// Control packet types understood by the broker, keyed by the high nibble of
/// the fixed header.
#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum PacketType {
    /// Client request to connect. Client to broker.
    Connect = 1,
    /// Connect acknowledgment. Broker to client.
    ConnAck = 2,
    /// Application message. Both directions.
    Publish = 3,
    /// Subscription request. Client to broker.
    Subscribe = 8,
    /// Subscription acknowledgment. Broker to client.
    SubAck = 9,
    /// Unsubscription request. Client to broker.
    Unsubscribe = 10,
    /// Unsubscription acknowledgment. Broker to client.
    UnsubAck = 11,
    /// Keep-alive ping. Client to broker.
    PingReq = 12,
    /// Keep-alive answer. Broker to client.
    PingResp = 13,
    /// Orderly end of session. Client to broker.
    Disconnect = 14,
}

impl PacketType {
    /// Maps a fixed header byte to its packet type.
    ///
    /// Types the broker does not handle (the QoS 1/2 acknowledgements and the
    /// reserved values) yield `None` and are ignored by the caller.
    pub const fn from_header(header: u8) -> Option<Self> {
        match header >> 4 {
            1 => Some(PacketType::Connect),
            2 => Some(PacketType::ConnAck),
            3 => Some(PacketType::Publish),
            8 => Some(PacketType::Subscribe),
            9 => Some(PacketType::SubAck),
            10 => Some(PacketType::Unsubscribe),
            11 => Some(PacketType::UnsubAck),
            12 => Some(PacketType::PingReq),
            13 => Some(PacketType::PingResp),
            14 => Some(PacketType::Disconnect),
            _ => None,
        }
    }

    /// Upper-case protocol name, used in log lines.
    pub const fn name(self) -> &'static str {
        match self {
            PacketType::Connect => "CONNECT",
            PacketType::ConnAck => "CONNACK",
            PacketType::Publish => "PUBLISH",
            PacketType::Subscribe => "SUBSCRIBE",
            PacketType::SubAck => "SUBACK",
            PacketType::Unsubscribe => "UNSUBSCRIBE",
            PacketType::UnsubAck => "UNSUBACK",
            PacketType::PingReq => "PINGREQ",
            PacketType::PingResp => "PINGRESP",
            PacketType::Disconnect => "DISCONNECT",
        }
    }
}
