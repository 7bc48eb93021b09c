//! The `broker` module holds the shared state of the broker: the client
//! registry, the subscription registry and publish fan-out.

pub mod engine;
pub mod message;
pub mod topic;

pub use engine::Broker;
pub use message::Message;
