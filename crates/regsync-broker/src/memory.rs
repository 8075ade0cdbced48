//! In-memory work queue.
//!
//! Models the broker semantics the engine relies on: FIFO delivery of
//! visible messages, per-delivery receipt handles, a visibility window
//! during which a leased message is hidden, and batch submission with
//! per-entry failure injection for tests.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::trace;
use uuid::Uuid;

use crate::broker::{BatchEntry, MessageBroker, ReceivedMessage};
use crate::error::{BrokerError, BrokerResult};

#[derive(Debug)]
struct StoredMessage {
    body: String,
    receipt_handle: Option<String>,
    invisible_until: Option<Instant>,
}

impl StoredMessage {
    fn is_visible(&self, now: Instant) -> bool {
        self.invisible_until.is_none_or(|until| until <= now)
    }
}

/// Thread-safe in-memory [`MessageBroker`] scoped to one queue.
///
/// Batch submissions are recorded (entry ids per call) so tests can assert
/// exact retry traffic, and individual entry ids can be set up to fail a
/// given number of times.
#[derive(Debug, Default)]
pub struct MemoryBroker {
    messages: Mutex<VecDeque<StoredMessage>>,
    send_batch_calls: Mutex<Vec<Vec<String>>>,
    failing_ids: DashMap<String, u32>,
}

impl MemoryBroker {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a message directly onto the queue, bypassing batch submission.
    pub fn push_message(&self, body: impl Into<String>) {
        self.messages.lock().push_back(StoredMessage {
            body: body.into(),
            receipt_handle: None,
            invisible_until: None,
        });
    }

    /// Total number of messages still on the queue, leased or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.lock().len()
    }

    /// Whether the queue holds no messages at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.lock().is_empty()
    }

    /// Number of messages currently leased (invisible).
    #[must_use]
    pub fn in_flight(&self) -> usize {
        let now = Instant::now();
        self.messages
            .lock()
            .iter()
            .filter(|m| !m.is_visible(now))
            .count()
    }

    /// Entry ids submitted per [`MessageBroker::send_batch`] call, in call
    /// order.
    #[must_use]
    pub fn send_batch_calls(&self) -> Vec<Vec<String>> {
        self.send_batch_calls.lock().clone()
    }

    /// Reject the next `times` submissions of the entry with this id.
    pub fn fail_next_sends(&self, id: &str, times: u32) {
        self.failing_ids.insert(id.to_owned(), times);
    }
}

#[async_trait]
impl MessageBroker for MemoryBroker {
    async fn receive_one(
        &self,
        visibility: Duration,
        _wait: Duration,
    ) -> BrokerResult<Option<ReceivedMessage>> {
        let now = Instant::now();
        let mut messages = self.messages.lock();
        let Some(message) = messages.iter_mut().find(|m| m.is_visible(now)) else {
            return Ok(None);
        };

        let receipt_handle = Uuid::new_v4().to_string();
        message.receipt_handle = Some(receipt_handle.clone());
        message.invisible_until = Some(now + visibility);
        trace!(receipt_handle = %receipt_handle, "leased message");
        Ok(Some(ReceivedMessage {
            body: message.body.clone(),
            receipt_handle,
        }))
    }

    async fn delete_message(&self, receipt_handle: &str) -> BrokerResult<()> {
        let mut messages = self.messages.lock();
        let before = messages.len();
        messages.retain(|m| m.receipt_handle.as_deref() != Some(receipt_handle));
        if messages.len() == before {
            return Err(BrokerError::InvalidReceiptHandle(receipt_handle.to_owned()));
        }
        Ok(())
    }

    async fn send_batch(&self, entries: &[BatchEntry]) -> BrokerResult<Vec<String>> {
        self.send_batch_calls
            .lock()
            .push(entries.iter().map(|e| e.id.clone()).collect());

        let mut failed = Vec::new();
        for entry in entries {
            let reject = match self.failing_ids.get_mut(&entry.id) {
                Some(mut remaining) if *remaining > 0 => {
                    *remaining = remaining.saturating_sub(1);
                    true
                }
                _ => false,
            };
            if reject {
                failed.push(entry.id.clone());
            } else {
                self.push_message(entry.body.clone());
            }
        }
        Ok(failed)
    }
}
