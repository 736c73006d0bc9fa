//! The `transport` module is responsible for network communication with
//! clients over TCP.
//!
//! It reads packets off the wire one at a time, implements the accept loop
//! and the per-connection tasks, and forwards every packet to the broker.

pub mod frame;
pub mod tcp;

pub use frame::read_frame;
pub use tcp::{bind, serve, start_tcp_server};
