//! Broker engine
//!
//! This module contains the in-memory broker responsible for:
//! - tracking live connections by identifier (the client registry)
//! - mapping topic names to subscribers and back (the subscription registry)
//! - fanning a published message out to every subscriber of its topic
//!
//! Concurrency and usage notes:
//! - `Broker` is shared as `Arc<Broker>`. The client registry and the
//!   subscription registry sit behind independent `RwLock`s; fan-out only
//!   takes read locks, every mutation takes the write lock.
//! - Lock order is fixed: client registry, then subscription registry, then
//!   a client's own topic set. No lock is held while a packet is queued for
//!   a socket.
//! - A client that cannot accept a delivery is deregistered on the spot; the
//!   failure never reaches the publisher.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, info, warn};

use crate::broker::message::Message;
use crate::broker::topic::Topic;
use crate::client::{Client, ClientId};
use crate::config::BrokerSettings;
use crate::protocol::Packet;
use crate::utils::BrokerError;

#[derive(Debug, Default)]
pub struct Broker {
    clients: RwLock<HashMap<ClientId, Arc<Client>>>,
    topics: RwLock<HashMap<String, Topic>>,
    settings: BrokerSettings,
}

impl Broker {
    pub fn new() -> Self {
        Self::with_settings(BrokerSettings::default())
    }

    pub fn with_settings(settings: BrokerSettings) -> Self {
        Self {
            clients: RwLock::new(HashMap::new()),
            topics: RwLock::new(HashMap::new()),
            settings,
        }
    }

    pub fn settings(&self) -> &BrokerSettings {
        &self.settings
    }

    /// Adds a freshly accepted client to the live set.
    pub fn register_client(&self, client: Arc<Client>) -> Result<(), BrokerError> {
        let mut clients = write(&self.clients);
        if clients.contains_key(&client.id) {
            return Err(BrokerError::DuplicateClient(client.id.clone()));
        }
        if clients.len() >= self.settings.max_connections {
            return Err(BrokerError::TooManyConnections(self.settings.max_connections));
        }

        info!("Client {} connected", client.id);
        clients.insert(client.id.clone(), client);
        Ok(())
    }

    /// Removes a client from the live set, drops all its subscriptions and
    /// closes it.
    ///
    /// Safe to call from any task, any number of times: only the first call
    /// for a given id does anything, later ones return `false`.
    pub fn deregister_client(&self, client_id: &str) -> bool {
        let mut clients = write(&self.clients);
        let Some(client) = clients.remove(client_id) else {
            return false;
        };

        let removed = {
            let mut topics = write(&self.topics);
            Self::unsubscribe_all_locked(&mut topics, &client)
        };
        drop(clients);

        client.close();
        info!("Client {client_id} disconnected, dropped {removed} subscription(s)");
        true
    }

    /// Subscribes a client to a topic, creating the topic on first use.
    ///
    /// Returns `Ok(false)` when the client was already subscribed and
    /// duplicates are not allowed.
    pub fn subscribe(&self, topic: &str, client: &Arc<Client>) -> Result<bool, BrokerError> {
        // Holding the client registry read lock keeps a concurrent
        // deregistration from leaving this entry behind.
        let clients = read(&self.clients);
        if !clients.contains_key(&client.id) {
            return Err(BrokerError::UnknownClient(client.id.clone()));
        }

        let mut topics = write(&self.topics);
        let entry = topics
            .entry(topic.to_string())
            .or_insert_with(|| Topic::new(topic));

        if !self.settings.allow_duplicate_subscriptions && entry.contains(&client.id) {
            debug!("Client {} already subscribed to {topic}", client.id);
            return Ok(false);
        }

        entry.subscribe(client.clone());
        client.track_topic(topic);
        info!("Client {} subscribed to topic: {topic}", client.id);
        Ok(true)
    }

    /// Unsubscribes a client from one topic, pruning the topic if it empties.
    pub fn unsubscribe(&self, topic: &str, client: &Client) -> bool {
        let mut topics = write(&self.topics);
        let Some(entry) = topics.get_mut(topic) else {
            return false;
        };

        let removed = entry.unsubscribe(&client.id) > 0;
        if entry.is_empty() {
            topics.remove(topic);
        }
        client.untrack_topic(topic);

        if removed {
            info!("Client {} unsubscribed from topic: {topic}", client.id);
        }
        removed
    }

    /// Removes `client` from every topic it is subscribed to and prunes the
    /// topics left without subscribers. Returns how many topics the client
    /// was removed from.
    pub fn unsubscribe_all(&self, client: &Client) -> usize {
        let mut topics = write(&self.topics);
        Self::unsubscribe_all_locked(&mut topics, client)
    }

    fn unsubscribe_all_locked(topics: &mut HashMap<String, Topic>, client: &Client) -> usize {
        let subscribed = client.take_topics();
        for name in &subscribed {
            if let Some(entry) = topics.get_mut(name) {
                entry.unsubscribe(&client.id);
                if entry.is_empty() {
                    topics.remove(name);
                }
            }
        }
        subscribed.len()
    }

    /// Snapshot of the clients subscribed to `topic`, in subscription order.
    pub fn subscribers_of(&self, topic: &str) -> Vec<Arc<Client>> {
        read(&self.topics)
            .get(topic)
            .map(Topic::subscribers)
            .unwrap_or_default()
    }

    /// Delivers `message` to every current subscriber of its topic.
    ///
    /// The PUBLISH packet is encoded once and the same bytes are queued for
    /// each subscriber. A subscriber that cannot take it is deregistered and
    /// skipped; the others are unaffected. Returns the number of deliveries.
    pub fn publish(&self, message: &Message) -> Result<usize, BrokerError> {
        let subscribers = self.subscribers_of(&message.topic);
        if subscribers.is_empty() {
            info!("No subscribers for topic: {}", message.topic);
            return Ok(0);
        }

        let packet = Packet::Publish(message.to_publish()).encode()?;
        debug!(
            "Publishing {} byte(s) to topic {} for {} subscriber(s)",
            message.payload.len(),
            message.topic,
            subscribers.len()
        );

        let mut delivered = 0;
        for subscriber in subscribers {
            match subscriber.send(packet.clone()) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    warn!("Failed to send message to client {}: {e}", subscriber.id);
                    self.deregister_client(&subscriber.id);
                }
            }
        }
        Ok(delivered)
    }

    pub fn is_registered(&self, client_id: &str) -> bool {
        read(&self.clients).contains_key(client_id)
    }

    pub fn client_count(&self) -> usize {
        read(&self.clients).len()
    }

    pub fn topic_count(&self) -> usize {
        read(&self.topics).len()
    }
}

// Every critical section leaves both registries consistent, so a poisoned
// lock is still usable.
fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
