//! Batch submission with id-matched partial-failure retry.

use std::time::Duration;

use md5::{Digest, Md5};
use tracing::{debug, error, warn};

use crate::broker::{BatchEntry, MessageBroker};
use crate::error::BrokerError;

/// Default number of submission attempts before giving up.
pub const DEFAULT_RETRY_BUDGET: u32 = 5;

/// Fixed backoff between submission attempts.
const RETRY_BACKOFF: Duration = Duration::from_secs(1);

/// Errors from [`submit_batch`].
#[derive(Debug, thiserror::Error)]
pub enum BatchSubmitError {
    /// The retry budget ran out with messages still rejected.
    #[error("retry budget exhausted with {undelivered} undelivered message(s)")]
    RetriesExhausted {
        /// Number of messages never accepted by the broker.
        undelivered: usize,
    },

    /// The broker call itself failed.
    #[error(transparent)]
    Broker(#[from] BrokerError),
}

/// Content-derived id for a message body (hex MD5), used both as the
/// broker's per-entry dedup key and to map reported failures back to
/// their payloads.
#[must_use]
pub fn entry_id(body: &str) -> String {
    hex::encode(Md5::digest(body.as_bytes()))
}

/// Submit `bodies` to the broker, resubmitting the failed subset until it
/// is accepted or `retry_budget` attempts have been spent.
///
/// Each round resubmits the full still-failing subset after a fixed
/// backoff; there is no partial-success reporting.
///
/// # Errors
///
/// Returns [`BatchSubmitError::RetriesExhausted`] when the budget runs out
/// with entries still rejected, or [`BatchSubmitError::Broker`] when a
/// submission call fails outright.
pub async fn submit_batch(
    broker: &dyn MessageBroker,
    bodies: &[String],
    retry_budget: u32,
) -> Result<(), BatchSubmitError> {
    let mut remaining: Vec<BatchEntry> = bodies
        .iter()
        .map(|body| BatchEntry {
            id: entry_id(body),
            body: body.clone(),
        })
        .collect();

    let mut budget = retry_budget;
    while budget > 0 && !remaining.is_empty() {
        for entry in &remaining {
            debug!(id = %entry.id, "enqueuing message");
        }
        let failed = broker.send_batch(&remaining).await?;
        if failed.is_empty() {
            return Ok(());
        }

        warn!(
            failed = failed.len(),
            submitted = remaining.len(),
            "broker rejected part of the batch, re-enqueuing"
        );
        remaining.retain(|entry| failed.contains(&entry.id));
        budget -= 1;
        if budget > 0 {
            tokio::time::sleep(RETRY_BACKOFF).await;
        }
    }

    if remaining.is_empty() {
        return Ok(());
    }
    for entry in &remaining {
        error!(id = %entry.id, "failed to enqueue message");
    }
    Err(BatchSubmitError::RetriesExhausted {
        undelivered: remaining.len(),
    })
}
