//! Broker engine
//!
//! This module contains the in-memory broker responsible for:
//! - admitting connections that opened with a CONNECT packet
//! - keeping the subscription table and the retained-value store
//! - routing PUBLISH packets to every subscriber of the exact topic
//!
//! Concurrency and usage notes:
//! - The API is synchronous and designed to be held behind a lock
//!   (`SharedBroker`) by the transport layer. Nothing here touches a socket:
//!   outgoing packets are queued on each `Client`'s outbound buffer, so the
//!   lock is never held across network I/O.
//! - A connection whose buffer is closed or full is removed the next time the
//!   broker fails to queue a packet for it.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::broker::retained::RetainedStore;
use crate::broker::subscription::SubscriptionTable;
use crate::client::{Client, ConnectionId};
use crate::config::BrokerSettings;
use crate::protocol::{Packet, Publish, Subscribe};
use crate::utils::error::{Error, Result};

/// Broker shared between connection tasks.
pub type SharedBroker = Arc<Mutex<Broker>>;

/// What the transport should do with a connection after a frame was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Continue,
    Close,
}

#[derive(Debug, Default)]
pub struct Broker {
    pub(crate) clients: HashMap<ConnectionId, Client>,
    pub(crate) subscriptions: SubscriptionTable,
    pub(crate) retained: RetainedStore,
    settings: BrokerSettings,
}

impl Broker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: BrokerSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    pub fn into_shared(self) -> SharedBroker {
        Arc::new(Mutex::new(self))
    }

    pub fn settings(&self) -> &BrokerSettings {
        &self.settings
    }

    /// Registers a connection that opened with a valid CONNECT and queues its
    /// CONNACK. Nothing is sent when the connection limit is reached.
    pub fn admit(&mut self, client: Client) -> Result<()> {
        if self.clients.len() >= self.settings.max_connections {
            return Err(Error::TooManyConnections(self.settings.max_connections));
        }

        client.send(Packet::ConnAck.encode()?)?;

        match client.peer {
            Some(peer) => info!("new client {} from {} ({})", client.client_id, peer, client.id),
            None => info!("new client {} ({})", client.client_id, client.id),
        }
        self.clients.insert(client.id.clone(), client);
        Ok(())
    }

    pub fn is_admitted(&self, connection: &ConnectionId) -> bool {
        self.clients.contains_key(connection)
    }

    pub fn connection_count(&self) -> usize {
        self.clients.len()
    }

    pub fn subscriptions(&self) -> &SubscriptionTable {
        &self.subscriptions
    }

    pub fn retained(&self) -> &RetainedStore {
        &self.retained
    }

    /// Decodes one frame read from `connection` and applies it.
    ///
    /// Frames from connections that are not admitted are refused. Codec
    /// errors remove the connection, except for packet kinds outside the
    /// supported subset, which are ignored.
    pub fn handle_frame(&mut self, connection: &ConnectionId, frame: Bytes) -> Dispatch {
        if !self.is_admitted(connection) {
            return Dispatch::Close;
        }

        match Packet::decode(&frame) {
            Ok(None) | Ok(Some(Packet::Disconnect)) => {
                self.cleanup_client(connection);
                Dispatch::Close
            }
            Ok(Some(Packet::Publish(publish))) => {
                self.publish(frame, &publish);
                Dispatch::Continue
            }
            Ok(Some(Packet::Subscribe(subscribe))) => match self.subscribe(connection, &subscribe) {
                Ok(()) => Dispatch::Continue,
                Err(e) => {
                    warn!("failed to answer SUBSCRIBE from {connection}: {e}");
                    self.cleanup_client(connection);
                    Dispatch::Close
                }
            },
            Ok(Some(other)) => {
                debug!("ignoring {} from {connection}", other.kind());
                Dispatch::Continue
            }
            Err(Error::UnsupportedPacket(byte)) => {
                debug!("ignoring unsupported packet 0x{byte:02x} from {connection}");
                Dispatch::Continue
            }
            Err(e) => {
                warn!("dropping {connection}: {e}");
                self.cleanup_client(connection);
                Dispatch::Close
            }
        }
    }

    /// Stores the value if the publish is retained, then forwards `raw`
    /// unchanged to every subscriber of the topic. Returns the number of
    /// deliveries.
    pub fn publish(&mut self, raw: Bytes, publish: &Publish) -> usize {
        if publish.retain && self.settings.retain {
            self.retained.store(&publish.topic, &publish.value);
            debug!("retained value updated for {}", publish.topic);
        }

        let mut delivered = 0;
        let mut closed = Vec::new();
        for connection in self.subscriptions.subscribers(&publish.topic) {
            let Some(client) = self.clients.get(connection) else {
                warn!("no client registered with id {connection}");
                continue;
            };
            match client.send(raw.clone()) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    warn!("dropping subscriber {}: {e}", client.client_id);
                    closed.push(connection.clone());
                }
            }
        }

        info!(
            "publish on {}: delivered to {} subscriber(s)",
            publish.topic, delivered
        );

        for connection in closed {
            self.cleanup_client(&connection);
        }
        delivered
    }

    /// Records the subscription, acknowledges it and replays the retained
    /// value for the topic, if any, as a non-retained publish.
    pub fn subscribe(&mut self, connection: &ConnectionId, subscribe: &Subscribe) -> Result<()> {
        let client = self.clients.get(connection).ok_or(Error::ConnectionClosed)?;

        let mut outgoing = vec![Packet::suback(subscribe.packet_id).encode()?];
        if let Some(entry) = self.retained.get(&subscribe.topic) {
            let replay = Packet::publish(subscribe.topic.as_str(), entry.value.as_str(), false);
            outgoing.push(replay.encode()?);
        }

        info!("{} subscribed to {}", client.client_id, subscribe.topic);
        self.subscriptions.add(connection.clone(), subscribe.topic.as_str());

        for bytes in outgoing {
            client.send(bytes)?;
        }
        Ok(())
    }

    /// Removes a connection together with every subscription it owns.
    /// Returns the number of subscriptions removed; calling it again for the
    /// same connection is a no-op.
    pub fn cleanup_client(&mut self, connection: &ConnectionId) -> usize {
        let removed = self.subscriptions.remove_connection(connection);
        if let Some(client) = self.clients.remove(connection) {
            info!(
                "client {} disconnected, removed {} subscription(s)",
                client.client_id, removed
            );
        }
        removed
    }
}
