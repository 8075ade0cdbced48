//! The message-broker capability trait.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::BrokerResult;

/// A message leased from the queue for exclusive processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedMessage {
    /// Raw message body.
    pub body: String,
    /// Handle used to acknowledge (delete) this delivery.
    pub receipt_handle: String,
}

/// One entry of a batch submission. The id doubles as the broker-side
/// dedup key and as the handle that maps a reported failure back to its
/// payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchEntry {
    /// Content-derived entry id.
    pub id: String,
    /// Message body.
    pub body: String,
}

/// Capability interface over the work queue. An implementation is scoped
/// to a single configured queue.
///
/// Uses `#[async_trait]` because the engine holds implementations as
/// `Arc<dyn MessageBroker>`.
#[async_trait]
pub trait MessageBroker: Send + Sync + std::fmt::Debug {
    /// Lease at most one message, granting `visibility` of exclusive
    /// processing time and long-polling up to `wait` for one to arrive.
    async fn receive_one(
        &self,
        visibility: Duration,
        wait: Duration,
    ) -> BrokerResult<Option<ReceivedMessage>>;

    /// Acknowledge a leased message, removing it from the queue.
    async fn delete_message(&self, receipt_handle: &str) -> BrokerResult<()>;

    /// Submit a batch of entries. Returns the ids of entries the broker
    /// rejected; an empty list means the whole batch was accepted.
    async fn send_batch(&self, entries: &[BatchEntry]) -> BrokerResult<Vec<String>>;
}
