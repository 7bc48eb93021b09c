//! The `error` module defines the error type returned across the `popmq`
//! broker.
//!
//! Transport, codec and configuration failures are wrapped into a single
//! `BrokerError` so callers can propagate them with `?`. None of these ever
//! cross a connection boundary: the task that hits one logs it and cleans up
//! its own connection.

use thiserror::Error;

use crate::client::ClientId;
use crate::protocol::CodecError;

#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("cannot listen on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("client {0} is closed")]
    ClientClosed(ClientId),

    #[error("client {0} is not registered")]
    UnknownClient(ClientId),

    #[error("client {0} is already registered")]
    DuplicateClient(ClientId),

    #[error("connection limit of {0} reached")]
    TooManyConnections(usize),

    #[error("no packet received within {0} seconds")]
    IdleTimeout(u64),

    #[error("queued packets not flushed within {0} seconds")]
    FlushTimeout(u64),
}
