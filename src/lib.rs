//! # TinyMQ
//!
//! `tinymq` is a small, in-memory publish/subscribe broker that speaks a
//! six-packet subset of MQTT 3.1.1 over TCP, together with the publisher and
//! subscriber clients that talk to it.
//!
//! ## Core Modules
//!
//! - `protocol`: Encodes and decodes CONNECT, CONNACK, PUBLISH, SUBSCRIBE, SUBACK and DISCONNECT.
//! - `broker`: The subscription table, the retained-value store and message routing.
//! - `client`: The broker's handle on one admitted connection.
//! - `transport`: The TCP accept loop and per-connection tasks.
//! - `peer`: Client side of the protocol, used by the `pub` and `sub` commands.
//! - `config`: Loads server configuration from a file and the environment.
//! - `utils`: Error type and logging setup.

pub mod broker;
pub mod client;
pub mod config;
pub mod peer;
pub mod protocol;
pub mod transport;
pub mod utils;

pub use broker::{Broker, SharedBroker};
pub use config::{Settings, load_config};
pub use protocol::Packet;
pub use utils::{Error, Result};

#[cfg(test)]
mod tests;
