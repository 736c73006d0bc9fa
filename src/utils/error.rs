//! The `error` module defines the error type shared by every part of `tinymq`.
//!
//! Codec failures (`TruncatedPacket`, `MalformedPacket`, `PayloadTooLarge`,
//! `UnsupportedPacket`) are produced by `protocol`; the broker contains them
//! per connection. `ListenerFailure` is the only error that stops the server.

use std::io;

/// Result type alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The buffer is shorter than the fixed header or than the length it declares.
    #[error("truncated packet: needed {needed} bytes, got {available}")]
    TruncatedPacket { needed: usize, available: usize },

    /// Inconsistent length fields, missing fields or non-ASCII text.
    #[error("malformed packet: {0}")]
    MalformedPacket(String),

    /// The encoded remaining length would not fit the single length byte.
    #[error("payload too large: remaining length {remaining_length} exceeds 255")]
    PayloadTooLarge { remaining_length: usize },

    /// First byte outside the supported packet subset.
    #[error("unsupported packet type 0x{0:02x}")]
    UnsupportedPacket(u8),

    #[error("connection closed")]
    ConnectionClosed,

    /// The connection's outbound buffer is full: the peer stopped reading.
    #[error("slow consumer: outbound buffer of {capacity} packets is full")]
    SlowConsumer { capacity: usize },

    #[error("failed to listen on {addr}: {source}")]
    ListenerFailure {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("connection limit of {0} reached")]
    TooManyConnections(usize),

    #[error("unexpected packet: expected {expected}, got {got}")]
    UnexpectedPacket { expected: String, got: String },

    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("config error: {0}")]
    Config(#[from] config::ConfigError),
}

impl Error {
    /// Whether this error came out of the packet codec.
    pub fn is_codec(&self) -> bool {
        matches!(
            self,
            Error::TruncatedPacket { .. }
                | Error::MalformedPacket(_)
                | Error::PayloadTooLarge { .. }
                | Error::UnsupportedPacket(_)
        )
    }
}
