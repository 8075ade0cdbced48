//! SQS implementation of the message-broker capability.

use std::time::Duration;

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_sqs::Client;
use aws_sdk_sqs::types::SendMessageBatchRequestEntry;
use tracing::trace;

use regsync_broker::{BatchEntry, BrokerError, BrokerResult, MessageBroker, ReceivedMessage};
use regsync_core::QueueConfig;

/// Work queue backed by SQS, scoped to one queue URL.
#[derive(Debug)]
pub struct AwsMessageBroker {
    client: Client,
    queue_url: String,
}

impl AwsMessageBroker {
    /// Create a broker for the configured queue.
    #[must_use]
    pub fn new(base: &SdkConfig, queue: &QueueConfig) -> Self {
        let config = aws_sdk_sqs::config::Builder::from(base)
            .region(aws_sdk_sqs::config::Region::new(queue.region.to_string()))
            .build();
        Self {
            client: Client::from_conf(config),
            queue_url: queue.url.clone(),
        }
    }
}

/// Clamp a duration to the whole-second i32 range SQS expects.
fn whole_seconds(duration: Duration) -> i32 {
    i32::try_from(duration.as_secs()).unwrap_or(i32::MAX)
}

#[async_trait]
impl MessageBroker for AwsMessageBroker {
    async fn receive_one(
        &self,
        visibility: Duration,
        wait: Duration,
    ) -> BrokerResult<Option<ReceivedMessage>> {
        let output = self
            .client
            .receive_message()
            .queue_url(&self.queue_url)
            .max_number_of_messages(1)
            .visibility_timeout(whole_seconds(visibility))
            .wait_time_seconds(whole_seconds(wait))
            .send()
            .await
            .map_err(|err| {
                BrokerError::Internal(anyhow::Error::new(err).context("receive message"))
            })?;

        let Some(message) = output.messages.unwrap_or_default().into_iter().next() else {
            return Ok(None);
        };
        trace!(message_id = ?message.message_id, "leased message");
        match (message.body, message.receipt_handle) {
            (Some(body), Some(receipt_handle)) => Ok(Some(ReceivedMessage {
                body,
                receipt_handle,
            })),
            _ => Err(BrokerError::Internal(anyhow::anyhow!(
                "received message without body or receipt handle"
            ))),
        }
    }

    async fn delete_message(&self, receipt_handle: &str) -> BrokerResult<()> {
        self.client
            .delete_message()
            .queue_url(&self.queue_url)
            .receipt_handle(receipt_handle)
            .send()
            .await
            .map_err(|err| {
                BrokerError::Internal(anyhow::Error::new(err).context("delete message"))
            })?;
        Ok(())
    }

    async fn send_batch(&self, entries: &[BatchEntry]) -> BrokerResult<Vec<String>> {
        let mut batch = Vec::with_capacity(entries.len());
        for entry in entries {
            let built = SendMessageBatchRequestEntry::builder()
                .id(&entry.id)
                .message_body(&entry.body)
                .build()
                .map_err(|err| {
                    BrokerError::Internal(
                        anyhow::Error::new(err).context("build batch entry"),
                    )
                })?;
            batch.push(built);
        }

        let output = self
            .client
            .send_message_batch()
            .queue_url(&self.queue_url)
            .set_entries(Some(batch))
            .send()
            .await
            .map_err(|err| {
                BrokerError::Internal(anyhow::Error::new(err).context("send message batch"))
            })?;

        Ok(output.failed.into_iter().map(|failed| failed.id).collect())
    }
}
