//! Client representation
//!
//! `Client` models an admitted connection and holds the sending side of the
//! connection's outbound buffer. The transport drains the buffer onto the
//! socket from a dedicated writer task, so the broker never blocks on a slow
//! peer. The buffer is bounded: a peer that stops reading fills it, and the
//! next send fails so the broker can drop the connection. Dropping the
//! `Client` closes the buffer, which ends the writer task and shuts down the
//! socket's write half.

use std::net::SocketAddr;

use bytes::Bytes;
use tokio::sync::mpsc::Sender;
use tokio::sync::mpsc::error::TrySendError;
use uuid::Uuid;

use crate::utils::error::{Error, Result};

/// Opaque handle naming one connection inside the broker.
pub type ConnectionId = String;

#[derive(Debug)]
pub struct Client {
    pub id: ConnectionId,
    /// Identifier announced by the peer in its CONNECT packet.
    pub client_id: String,
    pub peer: Option<SocketAddr>,
    pub sender: Sender<Bytes>,
}

impl Client {
    /// Create a new client with a sender channel. The `id` is a UUID used
    /// to identify the connection across broker operations; `client_id` is
    /// not unique across connections.
    pub fn new(client_id: impl Into<String>, sender: Sender<Bytes>) -> Self {
        Self {
            id: format!("conn-{}", Uuid::new_v4()),
            client_id: client_id.into(),
            peer: None,
            sender,
        }
    }

    pub fn with_peer(mut self, peer: SocketAddr) -> Self {
        self.peer = Some(peer);
        self
    }

    /// Queues raw packet bytes for this connection without waiting.
    ///
    /// Fails with `SlowConsumer` when the buffer is full and with
    /// `ConnectionClosed` once the writer side is gone.
    pub fn send(&self, bytes: Bytes) -> Result<()> {
        self.sender.try_send(bytes).map_err(|e| match e {
            TrySendError::Full(_) => Error::SlowConsumer {
                capacity: self.sender.max_capacity(),
            },
            TrySendError::Closed(_) => Error::ConnectionClosed,
        })
    }
}
