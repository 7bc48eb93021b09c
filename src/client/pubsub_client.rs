use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::utils::BrokerError;

pub type ClientId = String;

/// Represents one accepted connection in the broker.
///
/// Outbound packets are pushed onto `sender`; the connection's writer task
/// owns the socket's write half and drains the channel in order. The topic
/// set mirrors the connection's entries in the subscription registry and is
/// only changed while the registry's write lock is held.
#[derive(Debug)]
pub struct Client {
    /// Unique identifier assigned by the broker at accept time.
    pub id: ClientId,

    sender: UnboundedSender<Bytes>,
    topics: Mutex<HashSet<String>>,
    closed: AtomicBool,
    flush_on_close: AtomicBool,
    shutdown: CancellationToken,
}

impl Client {
    /// Create a new client around the sending side of its outbound channel.
    pub fn new(sender: UnboundedSender<Bytes>) -> Self {
        Self {
            id: format!("client-{}", Uuid::new_v4()),
            sender,
            topics: Mutex::new(HashSet::new()),
            closed: AtomicBool::new(false),
            flush_on_close: AtomicBool::new(false),
            shutdown: CancellationToken::new(),
        }
    }

    /// Queues an encoded packet for this client's socket.
    ///
    /// Fails once the client is closed or its writer task has gone away.
    pub fn send(&self, packet: Bytes) -> Result<(), BrokerError> {
        if self.is_closed() {
            return Err(BrokerError::ClientClosed(self.id.clone()));
        }
        self.sender
            .send(packet)
            .map_err(|_| BrokerError::ClientClosed(self.id.clone()))
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Marks the client closed and signals its reader and writer tasks to
    /// stop. Returns `true` only for the call that actually closed it.
    pub fn close(&self) -> bool {
        if self.closed.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.shutdown.cancel();
        true
    }

    /// Asks the writer task to flush what is already queued once the client
    /// closes. Must be called before the close for the writer to see it.
    ///
    /// Without it a close drops queued packets, so a peer that stopped
    /// reading cannot hold the connection open.
    pub fn request_flush(&self) {
        self.flush_on_close.store(true, Ordering::SeqCst);
    }

    pub fn flush_requested(&self) -> bool {
        self.flush_on_close.load(Ordering::SeqCst)
    }

    /// Token cancelled when the client is closed.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Snapshot of the topics this client is subscribed to, sorted.
    pub fn topics(&self) -> Vec<String> {
        let mut topics: Vec<String> = self.topic_set().iter().cloned().collect();
        topics.sort();
        topics
    }

    pub(crate) fn track_topic(&self, topic: &str) {
        self.topic_set().insert(topic.to_string());
    }

    pub(crate) fn untrack_topic(&self, topic: &str) -> bool {
        self.topic_set().remove(topic)
    }

    pub(crate) fn take_topics(&self) -> HashSet<String> {
        std::mem::take(&mut *self.topic_set())
    }

    fn topic_set(&self) -> MutexGuard<'_, HashSet<String>> {
        self.topics.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
