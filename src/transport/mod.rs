//! The `transport` module is responsible for handling network communication
//! with clients over TCP.
//!
//! It runs the accept loop, gives every accepted connection a reader task
//! (the connection handler) and a writer task, and turns decoded packets into
//! broker operations.

pub mod handler;
pub mod io;
pub mod tcp;

pub use handler::{ConnectionHandler, ConnectionState};
pub use tcp::{serve_connection, start_tcp_server};
