//! Last-value store backing retained publishes.
//!
//! Entries live in memory only and are lost when the broker stops.

use std::collections::HashMap;

use chrono::Utc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetainedEntry {
    pub value: String,
    /// Milliseconds since the UNIX epoch at which the value was stored.
    pub updated_at: i64,
}

/// At most one entry per topic; a newer retained value replaces the old one.
#[derive(Debug, Default)]
pub struct RetainedStore {
    entries: HashMap<String, RetainedEntry>,
}

impl RetainedStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` for `topic`, returning the entry it replaced. An empty
    /// value is stored like any other.
    pub fn store(&mut self, topic: &str, value: &str) -> Option<RetainedEntry> {
        self.entries.insert(
            topic.to_string(),
            RetainedEntry {
                value: value.to_string(),
                updated_at: Utc::now().timestamp_millis(),
            },
        )
    }

    pub fn get(&self, topic: &str) -> Option<&RetainedEntry> {
        self.entries.get(topic)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
