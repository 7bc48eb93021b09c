//! The `client` module defines the representation of a connected client.
//!
//! It provides the `Client` struct, which encapsulates the state of a single
//! accepted connection: its broker-assigned identifier, the channel its writer
//! task drains onto the socket, and the set of topics it is subscribed to.

pub mod pubsub_client;
pub use pubsub_client::{Client, ClientId};
