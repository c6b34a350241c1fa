//! Client configuration.

use std::time::Duration;

/// Which edge of the activities sequence new activities are inserted at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InsertEdge {
    /// Prepend (newest first feeds).
    #[default]
    Start,
    /// Append (oldest first feeds).
    End,
}

/// Configuration for a [`crate::FeedsClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the feed service.
    pub base_url: String,
    /// API key, sent as a query parameter on every request.
    pub api_key: String,
    /// Fixed client-identification string sent with every request.
    pub client_id: String,
    /// Where reconciliation inserts newly added activities.
    pub insert_edge: InsertEdge,
    /// Throttle window for the batched own-fields query.
    pub own_fields_window: Duration,
}

impl ClientConfig {
    /// Creates a configuration with defaults.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            client_id: concat!("feedsync-rust-", env!("CARGO_PKG_VERSION")).to_owned(),
            insert_edge: InsertEdge::Start,
            own_fields_window: Duration::from_millis(50),
        }
    }

    /// Sets the activity insertion edge.
    pub fn with_insert_edge(mut self, edge: InsertEdge) -> Self {
        self.insert_edge = edge;
        self
    }

    /// Sets the own-fields throttle window.
    pub fn with_own_fields_window(mut self, window: Duration) -> Self {
        self.own_fields_window = window;
        self
    }

    /// Overrides the client-identification string.
    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = client_id.into();
        self
    }
}
