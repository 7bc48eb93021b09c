//! # PopMQ
//!
//! `popmq` is a minimal, in-memory MQTT-style publish/subscribe broker built
//! with Rust. Clients connect over plain TCP, speak a QoS 0 subset of the
//! MQTT 3.1.1 wire format, and receive every message published to the topics
//! they subscribed to.
//!
//! ## Core Modules
//!
//! - `protocol`: packet framing, the remaining-length varint, and typed packets.
//! - `broker`: the client registry, the subscription registry, and fan-out.
//! - `client`: one accepted connection as seen by the broker.
//! - `config`: loading server, broker and logging settings.
//! - `transport`: the TCP accept loop and the per-connection handler.
//! - `utils`: the shared error type and logging setup.

pub mod broker;
pub mod client;
pub mod config;
pub mod protocol;
pub mod transport;
pub mod utils;
