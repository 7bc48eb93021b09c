//! Topic management
//!
//! A `Topic` holds the subscribers of one exact-match topic name in the order
//! they subscribed, which is also the order fan-out enumerates them in.
//!
//! Concurrency note: callers must hold the broker's subscription lock when
//! modifying a `Topic`.

use std::sync::Arc;

use crate::client::{Client, ClientId};

#[derive(Debug, Default)]
pub struct Topic {
    pub name: String,
    subscribers: Vec<Arc<Client>>,
}

impl Topic {
    /// Create a new topic with the given name.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            subscribers: Vec::new(),
        }
    }

    /// Append a subscriber. Callers that want deduplication check
    /// [`Topic::contains`] first.
    pub fn subscribe(&mut self, client: Arc<Client>) {
        self.subscribers.push(client);
    }

    /// Remove every entry for `id`. Returns how many were removed.
    pub fn unsubscribe(&mut self, id: &ClientId) -> usize {
        let before = self.subscribers.len();
        self.subscribers.retain(|client| &client.id != id);
        before - self.subscribers.len()
    }

    pub fn contains(&self, id: &ClientId) -> bool {
        self.subscribers.iter().any(|client| &client.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    /// Copy of the current subscriber list, safe to iterate without the lock.
    pub fn subscribers(&self) -> Vec<Arc<Client>> {
        self.subscribers.clone()
    }
}
