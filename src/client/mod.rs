//! The `client` module defines the broker-side representation of a connection.
//!
//! It provides the `Client` struct, which encapsulates the state of a single
//! admitted connection, including its unique identifier and the channel for
//! queueing packets to it.

pub mod pubsub_client;
pub use pubsub_client::{Client, ConnectionId};

#[cfg(test)]
mod tests;
