//! The `protocol` module implements the wire format: a six-packet subset of
//! MQTT 3.1.1 with QoS 0 only and a single-byte remaining length.
//!
//! Encoding and decoding are pure functions over byte buffers; reading packets
//! off a socket lives in `transport::frame`.

pub mod packet;

pub use packet::{
    Connect, FixedHeader, Packet, PacketKind, Publish, SubAck, Subscribe, decode_header,
};

pub const CONNECT: u8 = 0x10;
pub const CONNACK: u8 = 0x20;
pub const PUBLISH: u8 = 0x30;
pub const RETAIN_FLAG: u8 = 0x01;
pub const SUBSCRIBE: u8 = 0x82;
pub const SUBACK: u8 = 0x90;
pub const DISCONNECT: u8 = 0xE0;

/// Largest body a packet can carry with a one-byte remaining length.
pub const MAX_REMAINING_LENGTH: usize = 255;

pub const PROTOCOL_NAME: &str = "MQTT";
pub const PROTOCOL_LEVEL: u8 = 4;
pub const CLEAN_SESSION: u8 = 0x02;
pub const KEEP_ALIVE_SECS: u16 = 60;
/// QoS asked for in SUBSCRIBE.
pub const REQUESTED_QOS: u8 = 0;
/// QoS returned in SUBACK.
pub const GRANTED_QOS: u8 = 0;

#[cfg(test)]
mod tests;
