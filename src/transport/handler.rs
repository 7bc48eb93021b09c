//! Connection handler
//!
//! One `ConnectionHandler` owns the read side of one accepted connection. It
//! decodes packets and turns each into exactly one broker operation:
//! - CONNECT: reply CONNACK
//! - PUBLISH: fan the message out to the topic's subscribers
//! - SUBSCRIBE / UNSUBSCRIBE: update the subscription registry, then acknowledge
//! - PINGREQ: reply PINGRESP
//! - DISCONNECT: close
//!
//! Anything else is ignored. Whatever ends the connection (DISCONNECT, read
//! error, framing error, idle timeout, or the broker closing the client after
//! a failed delivery), the handler deregisters the client exactly once on
//! the way out.

use std::sync::Arc;
use std::time::Duration;

use bytes::BytesMut;
use tokio::io::AsyncRead;
use tracing::{debug, info, warn};

use crate::broker::{Broker, Message};
use crate::client::Client;
use crate::protocol::{Connect, Frame, Packet, Publish, SubAck, Subscribe, Unsubscribe};
use crate::transport::io::read_frame;
use crate::utils::BrokerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connected,
    Closed,
}

pub struct ConnectionHandler {
    client: Arc<Client>,
    broker: Arc<Broker>,
    state: ConnectionState,
}

impl ConnectionHandler {
    /// Creates a handler for a client that is already registered.
    pub fn new(client: Arc<Client>, broker: Arc<Broker>) -> Self {
        Self {
            client,
            broker,
            state: ConnectionState::Connected,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn client(&self) -> &Arc<Client> {
        &self.client
    }

    /// Reads and dispatches packets until the connection ends, then cleans
    /// up. Returns the final state, which is always `Closed`.
    pub async fn run<R>(mut self, mut reader: R) -> ConnectionState
    where
        R: AsyncRead + Unpin,
    {
        let shutdown = self.client.shutdown_token();
        let settings = self.broker.settings();
        let idle_limit = match settings.read_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        let max_packet_size = settings.max_packet_size;
        let mut buffer = BytesMut::with_capacity(4096);
        let mut closed_by_broker = false;

        while self.state == ConnectionState::Connected {
            let next = tokio::select! {
                _ = shutdown.cancelled() => {
                    debug!("Client {} closed by the broker", self.client.id);
                    closed_by_broker = true;
                    break;
                }
                next = next_frame(&mut reader, &mut buffer, max_packet_size, idle_limit) => next,
            };

            match next {
                Ok(Some(frame)) => {
                    self.handle_frame(frame);
                }
                Ok(None) => {
                    info!("Client {} closed the connection", self.client.id);
                    break;
                }
                Err(e) => {
                    warn!("Error reading from client {}: {e}", self.client.id);
                    break;
                }
            }
        }

        if !closed_by_broker {
            // replies already queued still go out
            self.client.request_flush();
        }
        self.close();
        self.state
    }

    /// Decodes one frame and dispatches it.
    ///
    /// A malformed body drops the packet, or closes the connection when the
    /// broker is configured with `close_on_malformed`.
    pub fn handle_frame(&mut self, frame: Frame) -> ConnectionState {
        match Packet::decode(&frame) {
            Ok(Some(packet)) => self.dispatch(packet),
            Ok(None) => {
                debug!(
                    "Ignoring packet type {} from client {}",
                    frame.header >> 4,
                    self.client.id
                );
                self.state
            }
            Err(e) if self.broker.settings().close_on_malformed => {
                warn!("Closing client {} after malformed packet: {e}", self.client.id);
                self.state = ConnectionState::Closed;
                self.state
            }
            Err(e) => {
                warn!("Dropping malformed packet from client {}: {e}", self.client.id);
                self.state
            }
        }
    }

    pub fn dispatch(&mut self, packet: Packet) -> ConnectionState {
        let result = match packet {
            Packet::Connect(connect) => self.on_connect(connect),
            Packet::Publish(publish) => {
                self.on_publish(publish);
                Ok(())
            }
            Packet::Subscribe(subscribe) => self.on_subscribe(subscribe),
            Packet::Unsubscribe(unsubscribe) => self.on_unsubscribe(unsubscribe),
            Packet::PingReq => self.reply(Packet::PingResp),
            Packet::Disconnect => {
                info!("Client {} disconnecting", self.client.id);
                self.state = ConnectionState::Closed;
                Ok(())
            }
            other => {
                debug!(
                    "Ignoring {} from client {}",
                    other.packet_type().name(),
                    self.client.id
                );
                Ok(())
            }
        };

        if let Err(e) = result {
            warn!("Closing client {}: {e}", self.client.id);
            self.state = ConnectionState::Closed;
        }
        self.state
    }

    fn on_connect(&self, connect: Connect) -> Result<(), BrokerError> {
        info!(
            "Client {} sent CONNECT (client id {:?}, keep-alive {}s)",
            self.client.id, connect.client_id, connect.keep_alive
        );
        self.reply(Packet::connack_accepted())?;
        debug!("Sent CONNACK to client {}", self.client.id);
        Ok(())
    }

    fn on_publish(&self, publish: Publish) {
        let message = Message::from(publish);
        match self.broker.publish(&message) {
            Ok(delivered) => debug!(
                "Client {} published to {}, {delivered} delivery(ies)",
                self.client.id, message.topic
            ),
            Err(e) => warn!(
                "Publish from client {} to {} failed: {e}",
                self.client.id, message.topic
            ),
        }
    }

    fn on_subscribe(&self, subscribe: Subscribe) -> Result<(), BrokerError> {
        for (topic, _requested_qos) in &subscribe.topics {
            self.broker.subscribe(topic, &self.client)?;
        }
        self.reply(Packet::SubAck(SubAck::granting_qos0(&subscribe)))
    }

    fn on_unsubscribe(&self, unsubscribe: Unsubscribe) -> Result<(), BrokerError> {
        for topic in &unsubscribe.topics {
            self.broker.unsubscribe(topic, &self.client);
        }
        self.reply(Packet::UnsubAck {
            packet_id: unsubscribe.packet_id,
        })
    }

    fn reply(&self, packet: Packet) -> Result<(), BrokerError> {
        self.client.send(packet.encode()?)
    }

    fn close(&mut self) {
        self.state = ConnectionState::Closed;
        self.broker.deregister_client(&self.client.id);
    }
}

async fn next_frame<R>(
    reader: &mut R,
    buffer: &mut BytesMut,
    max_packet_size: usize,
    idle_limit: Option<Duration>,
) -> Result<Option<Frame>, BrokerError>
where
    R: AsyncRead + Unpin,
{
    let read = read_frame(reader, buffer, max_packet_size);
    match idle_limit {
        Some(limit) => tokio::time::timeout(limit, read)
            .await
            .map_err(|_| BrokerError::IdleTimeout(limit.as_secs()))?,
        None => read.await,
    }
}
