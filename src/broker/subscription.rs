//! Subscription management
//!
//! The table is a flat list of `(connection, topic)` pairs kept in insertion
//! order, which is also the delivery order for a publish. Topics match by
//! exact string equality. Subscribing the same connection to the same topic
//! twice keeps both entries, so such a connection receives every matching
//! publish twice.
//!
//! Concurrency note: callers must synchronize access to the table (for
//! example via the broker lock) when modifying subscriptions.

use crate::client::ConnectionId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub connection: ConnectionId,
    pub topic: String,
}

#[derive(Debug, Default)]
pub struct SubscriptionTable {
    entries: Vec<Subscription>,
}

impl SubscriptionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a subscription. Duplicates are kept.
    pub fn add(&mut self, connection: ConnectionId, topic: impl Into<String>) {
        self.entries.push(Subscription {
            connection,
            topic: topic.into(),
        });
    }

    /// Connections subscribed to exactly `topic`, in insertion order.
    pub fn subscribers<'a>(
        &'a self,
        topic: &'a str,
    ) -> impl Iterator<Item = &'a ConnectionId> + 'a {
        self.entries
            .iter()
            .filter(move |s| s.topic == topic)
            .map(|s| &s.connection)
    }

    /// Removes every subscription owned by `connection` and returns how many
    /// were dropped.
    pub fn remove_connection(&mut self, connection: &ConnectionId) -> usize {
        let before = self.entries.len();
        self.entries.retain(|s| &s.connection != connection);
        before - self.entries.len()
    }

    pub fn topics_for<'a>(
        &'a self,
        connection: &'a ConnectionId,
    ) -> impl Iterator<Item = &'a str> + 'a {
        self.entries
            .iter()
            .filter(move |s| &s.connection == connection)
            .map(|s| s.topic.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Subscription> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
