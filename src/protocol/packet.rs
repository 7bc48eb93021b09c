//! Typed packet bodies.
//!
//! Decoding works on a [`Frame`] already split off the stream; encoding goes
//! through [`encode_frame`] so every outbound packet gets a correct fixed
//! header and remaining length.

use bytes::{BufMut, Bytes, BytesMut};

use super::{CodecError, Frame, PacketType, encode_frame};

/// Granted QoS the broker returns for every subscription.
pub const GRANTED_QOS_0: u8 = 0x00;

/// CONNACK return code for an accepted connection.
pub const CONNECTION_ACCEPTED: u8 = 0x00;

/// Fixed-header flags SUBSCRIBE and UNSUBSCRIBE carry on the wire.
const SUBSCRIPTION_FLAGS: u8 = 0x02;

/// Fields the broker can read out of a CONNECT body.
///
/// CONNECT is never rejected, so a body that cannot be parsed simply leaves
/// these at their defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Connect {
    pub protocol_name: String,
    pub protocol_level: u8,
    pub keep_alive: u16,
    pub client_id: String,
}

impl Connect {
    fn inspect(body: Bytes) -> Connect {
        Self::parse(body).unwrap_or_default()
    }

    fn parse(body: Bytes) -> Result<Connect, CodecError> {
        let mut reader = BodyReader::new(body);
        let protocol_name = reader.read_string("protocol name")?;
        let protocol_level = reader.read_u8("protocol level")?;
        let _connect_flags = reader.read_u8("connect flags")?;
        let keep_alive = reader.read_u16("keep alive")?;
        let client_id = reader.read_string("client identifier")?;
        Ok(Connect {
            protocol_name,
            protocol_level,
            keep_alive,
            client_id,
        })
    }

    fn encode_body(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        put_string(buf, &self.protocol_name)?;
        buf.put_u8(self.protocol_level);
        // clean session, no will, no credentials
        buf.put_u8(0x02);
        buf.put_u16(self.keep_alive);
        put_string(buf, &self.client_id)
    }
}

/// An application message travelling in either direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Publish {
    pub topic: String,
    pub payload: Bytes,
    /// QoS requested by the sender. Outbound packets are always QoS 0.
    pub qos: u8,
}

impl Publish {
    fn decode(flags: u8, body: Bytes) -> Result<Publish, CodecError> {
        let qos = (flags >> 1) & 0x03;
        if qos == 3 {
            return Err(CodecError::malformed("PUBLISH with QoS 3"));
        }

        let mut reader = BodyReader::new(body);
        let topic = reader.read_string("PUBLISH topic")?;
        if qos > 0 {
            reader.read_u16("PUBLISH packet identifier")?;
        }
        Ok(Publish {
            topic,
            payload: reader.into_rest(),
            qos,
        })
    }

    fn encode_body(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        put_string(buf, &self.topic)?;
        buf.extend_from_slice(&self.payload);
        Ok(())
    }
}

/// A subscription request: one packet identifier, one or more topics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscribe {
    pub packet_id: u16,
    /// Topic names paired with the QoS the client asked for.
    pub topics: Vec<(String, u8)>,
}

impl Subscribe {
    fn decode(body: Bytes) -> Result<Subscribe, CodecError> {
        let mut reader = BodyReader::new(body);
        let packet_id = reader.read_u16("SUBSCRIBE packet identifier")?;

        let mut topics = Vec::new();
        while reader.remaining() > 0 {
            let topic = reader.read_string("SUBSCRIBE topic")?;
            let qos = reader.read_u8("SUBSCRIBE requested QoS")?;
            topics.push((topic, qos));
        }
        if topics.is_empty() {
            return Err(CodecError::malformed("SUBSCRIBE without topics"));
        }

        Ok(Subscribe { packet_id, topics })
    }

    fn encode_body(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        buf.put_u16(self.packet_id);
        for (topic, qos) in &self.topics {
            put_string(buf, topic)?;
            buf.put_u8(*qos);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubAck {
    pub packet_id: u16,
    /// One granted QoS per requested topic, in request order.
    pub return_codes: Vec<u8>,
}

impl SubAck {
    /// Acknowledges `request`, granting QoS 0 to every topic in it.
    pub fn granting_qos0(request: &Subscribe) -> SubAck {
        SubAck {
            packet_id: request.packet_id,
            return_codes: vec![GRANTED_QOS_0; request.topics.len()],
        }
    }

    fn decode(body: Bytes) -> Result<SubAck, CodecError> {
        let mut reader = BodyReader::new(body);
        let packet_id = reader.read_u16("SUBACK packet identifier")?;
        Ok(SubAck {
            packet_id,
            return_codes: reader.into_rest().to_vec(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unsubscribe {
    pub packet_id: u16,
    pub topics: Vec<String>,
}

impl Unsubscribe {
    fn decode(body: Bytes) -> Result<Unsubscribe, CodecError> {
        let mut reader = BodyReader::new(body);
        let packet_id = reader.read_u16("UNSUBSCRIBE packet identifier")?;

        let mut topics = Vec::new();
        while reader.remaining() > 0 {
            topics.push(reader.read_string("UNSUBSCRIBE topic")?);
        }
        if topics.is_empty() {
            return Err(CodecError::malformed("UNSUBSCRIBE without topics"));
        }

        Ok(Unsubscribe { packet_id, topics })
    }
}

/// Every packet type the broker reads or writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    Connect(Connect),
    ConnAck {
        session_present: bool,
        return_code: u8,
    },
    Publish(Publish),
    Subscribe(Subscribe),
    SubAck(SubAck),
    Unsubscribe(Unsubscribe),
    UnsubAck {
        packet_id: u16,
    },
    PingReq,
    PingResp,
    Disconnect,
}

impl Packet {
    /// The acknowledgement sent for every CONNECT.
    pub const fn connack_accepted() -> Packet {
        Packet::ConnAck {
            session_present: false,
            return_code: CONNECTION_ACCEPTED,
        }
    }

    pub fn packet_type(&self) -> PacketType {
        match self {
            Packet::Connect(_) => PacketType::Connect,
            Packet::ConnAck { .. } => PacketType::ConnAck,
            Packet::Publish(_) => PacketType::Publish,
            Packet::Subscribe(_) => PacketType::Subscribe,
            Packet::SubAck(_) => PacketType::SubAck,
            Packet::Unsubscribe(_) => PacketType::Unsubscribe,
            Packet::UnsubAck { .. } => PacketType::UnsubAck,
            Packet::PingReq => PacketType::PingReq,
            Packet::PingResp => PacketType::PingResp,
            Packet::Disconnect => PacketType::Disconnect,
        }
    }

    /// Interprets the body of `frame`.
    ///
    /// Returns `Ok(None)` for packet types the broker does not handle.
    pub fn decode(frame: &Frame) -> Result<Option<Packet>, CodecError> {
        let Some(packet_type) = frame.packet_type() else {
            return Ok(None);
        };
        let body = frame.body.clone();

        let packet = match packet_type {
            PacketType::Connect => Packet::Connect(Connect::inspect(body)),
            PacketType::ConnAck => {
                let mut reader = BodyReader::new(body);
                let ack_flags = reader.read_u8("CONNACK flags")?;
                let return_code = reader.read_u8("CONNACK return code")?;
                Packet::ConnAck {
                    session_present: ack_flags & 0x01 == 0x01,
                    return_code,
                }
            }
            PacketType::Publish => Packet::Publish(Publish::decode(frame.flags(), body)?),
            PacketType::Subscribe => Packet::Subscribe(Subscribe::decode(body)?),
            PacketType::SubAck => Packet::SubAck(SubAck::decode(body)?),
            PacketType::Unsubscribe => Packet::Unsubscribe(Unsubscribe::decode(body)?),
            PacketType::UnsubAck => Packet::UnsubAck {
                packet_id: BodyReader::new(body).read_u16("UNSUBACK packet identifier")?,
            },
            PacketType::PingReq => Packet::PingReq,
            PacketType::PingResp => Packet::PingResp,
            PacketType::Disconnect => Packet::Disconnect,
        };
        Ok(Some(packet))
    }

    /// Serializes the packet, fixed header included.
    pub fn encode(&self) -> Result<Bytes, CodecError> {
        let mut body = BytesMut::new();
        let mut flags = 0;

        match self {
            Packet::Connect(connect) => connect.encode_body(&mut body)?,
            Packet::ConnAck {
                session_present,
                return_code,
            } => {
                body.put_u8(u8::from(*session_present));
                body.put_u8(*return_code);
            }
            Packet::Publish(publish) => publish.encode_body(&mut body)?,
            Packet::Subscribe(subscribe) => {
                flags = SUBSCRIPTION_FLAGS;
                subscribe.encode_body(&mut body)?;
            }
            Packet::SubAck(suback) => {
                body.put_u16(suback.packet_id);
                body.extend_from_slice(&suback.return_codes);
            }
            Packet::Unsubscribe(unsubscribe) => {
                flags = SUBSCRIPTION_FLAGS;
                body.put_u16(unsubscribe.packet_id);
                for topic in &unsubscribe.topics {
                    put_string(&mut body, topic)?;
                }
            }
            Packet::UnsubAck { packet_id } => body.put_u16(*packet_id),
            Packet::PingReq | Packet::PingResp | Packet::Disconnect => {}
        }

        encode_frame(self.packet_type(), flags, &body)
    }
}

fn put_string(buf: &mut BytesMut, value: &str) -> Result<(), CodecError> {
    let len = u16::try_from(value.len()).map_err(|_| CodecError::LengthOutOfRange(value.len()))?;
    buf.put_u16(len);
    buf.extend_from_slice(value.as_bytes());
    Ok(())
}

/// Bounds-checked cursor over a packet body.
struct BodyReader {
    body: Bytes,
    pos: usize,
}

impl BodyReader {
    fn new(body: Bytes) -> Self {
        Self { body, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.body.len() - self.pos
    }

    fn take(&mut self, len: usize, field: &str) -> Result<Bytes, CodecError> {
        if self.remaining() < len {
            return Err(CodecError::malformed(format!(
                "{field} needs {len} bytes, {} left",
                self.remaining()
            )));
        }
        let bytes = self.body.slice(self.pos..self.pos + len);
        self.pos += len;
        Ok(bytes)
    }

    fn read_u8(&mut self, field: &str) -> Result<u8, CodecError> {
        Ok(self.take(1, field)?[0])
    }

    fn read_u16(&mut self, field: &str) -> Result<u16, CodecError> {
        let bytes = self.take(2, field)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    fn read_string(&mut self, field: &str) -> Result<String, CodecError> {
        let len = usize::from(self.read_u16(field)?);
        let bytes = self.take(len, field)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|_| CodecError::malformed(format!("{field} is not valid UTF-8")))
    }

    fn into_rest(self) -> Bytes {
        self.body.slice(self.pos..)
    }
}
