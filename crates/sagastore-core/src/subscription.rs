//! Topic subscription contract

use crate::errors::Result;
use serde::{Deserialize, Serialize};

/// One registered subscriber of a topic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscriber {
    pub address: String,
}

/// Persistence contract for publish/subscribe routing tables.
pub trait SubscriptionStorage {
    /// Whether every party reads and writes the same store.
    ///
    /// A centralized store lets a subscriber register itself directly
    /// instead of asking the topic owner with a subscribe request.
    fn is_centralized(&self) -> bool;

    /// Add `address` to `topic`. Repeated calls add repeated entries.
    ///
    /// # Errors
    ///
    /// - `InvalidInput`: empty topic or address
    fn register_subscriber(&self, topic: &str, address: &str) -> Result<()>;

    /// Remove every entry for `address` from `topic`.
    ///
    /// # Errors
    ///
    /// - `InvalidInput`: empty topic or address
    /// - `NotFound`: nothing was removed
    fn unregister_subscriber(&self, topic: &str, address: &str) -> Result<()>;

    /// All addresses registered for `topic`, duplicates included.
    ///
    /// # Errors
    ///
    /// - `InvalidInput`: empty topic
    fn get_subscriber_addresses(&self, topic: &str) -> Result<Vec<String>>;
}
