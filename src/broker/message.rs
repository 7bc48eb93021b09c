use bytes::Bytes;

use crate::protocol::Publish;

/// Represents a message in flight through the broker.
///
/// A message is built from an incoming PUBLISH, handed to fan-out and
/// dropped once every subscriber has been offered a copy. It is never
/// stored.
///
/// # Fields
///
/// - `topic` - Exact-match topic name the message is routed by.
/// - `payload` - Raw payload bytes, forwarded untouched.
/// - `qos` - QoS the publisher asked for. Delivery is always QoS 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub topic: String,
    pub payload: Bytes,
    pub qos: u8,
}

impl Message {
    pub fn new(topic: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
            qos: 0,
        }
    }

    /// The PUBLISH packet delivered to subscribers.
    pub fn to_publish(&self) -> Publish {
        Publish {
            topic: self.topic.clone(),
            payload: self.payload.clone(),
            qos: 0,
        }
    }
}

impl From<Publish> for Message {
    fn from(publish: Publish) -> Self {
        Self {
            topic: publish.topic,
            payload: publish.payload,
            qos: publish.qos,
        }
    }
}
