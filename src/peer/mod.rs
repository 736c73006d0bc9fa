//! The `peer` module is the client side of the protocol: a connection type
//! plus the publisher and subscriber loops behind the `pub` and `sub`
//! commands.
//!
//! A publisher sends CONNECT, waits for CONNACK, publishes one value per
//! input line and sends DISCONNECT at end of input. A subscriber sends
//! CONNECT, waits for CONNACK, subscribes once and prints what it receives.

pub mod runner;
pub mod session;

pub use runner::{SUBSCRIBE_PACKET_ID, run_publisher, run_subscriber};
pub use session::Peer;
