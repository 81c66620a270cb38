//! SQS FIFO analysis queues.

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_sqs::Client;
use tracing::debug;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// One received message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueMessage {
    pub receipt_handle: String,
    pub body: String,
}

/// Queue operations used by the pipeline and its consumers.
#[async_trait]
pub trait MessageQueue: Send + Sync {
    /// Send a message to a FIFO queue under the configured message group.
    async fn enqueue(&self, queue_url: &str, group_id: &str, body: &str) -> AppResult<()>;

    /// Long-poll for up to `max_messages` messages.
    async fn receive(
        &self,
        queue_url: &str,
        max_messages: i32,
        wait_secs: i32,
    ) -> AppResult<Vec<QueueMessage>>;

    /// Remove a processed message from the queue.
    async fn ack(&self, queue_url: &str, receipt_handle: &str) -> AppResult<()>;
}

/// SQS client wrapper.
#[derive(Clone)]
pub struct SqsQueue {
    client: Client,
}

impl SqsQueue {
    pub fn new(sdk_config: &SdkConfig) -> Self {
        Self {
            client: Client::new(sdk_config),
        }
    }
}

#[async_trait]
impl MessageQueue for SqsQueue {
    async fn enqueue(&self, queue_url: &str, group_id: &str, body: &str) -> AppResult<()> {
        let output = self
            .client
            .send_message()
            .queue_url(queue_url)
            .message_body(body)
            .message_group_id(group_id)
            .message_deduplication_id(Uuid::new_v4().to_string())
            .send()
            .await
            .map_err(|e| {
                AppError::Queue(format!(
                    "Failed to send message to {}: {}",
                    queue_url,
                    e.into_service_error()
                ))
            })?;

        debug!(
            "Queued message {} to {}",
            output.message_id().unwrap_or("unknown"),
            queue_url
        );
        Ok(())
    }

    async fn receive(
        &self,
        queue_url: &str,
        max_messages: i32,
        wait_secs: i32,
    ) -> AppResult<Vec<QueueMessage>> {
        let output = self
            .client
            .receive_message()
            .queue_url(queue_url)
            .max_number_of_messages(max_messages)
            .wait_time_seconds(wait_secs)
            .send()
            .await
            .map_err(|e| {
                AppError::Queue(format!(
                    "Failed to receive messages from {}: {}",
                    queue_url,
                    e.into_service_error()
                ))
            })?;

        let messages = output
            .messages
            .unwrap_or_default()
            .into_iter()
            .filter_map(|m| match (m.receipt_handle, m.body) {
                (Some(receipt_handle), Some(body)) => Some(QueueMessage {
                    receipt_handle,
                    body,
                }),
                _ => None,
            })
            .collect();

        Ok(messages)
    }

    async fn ack(&self, queue_url: &str, receipt_handle: &str) -> AppResult<()> {
        self.client
            .delete_message()
            .queue_url(queue_url)
            .receipt_handle(receipt_handle)
            .send()
            .await
            .map_err(|e| {
                AppError::Queue(format!(
                    "Failed to delete message from {}: {}",
                    queue_url,
                    e.into_service_error()
                ))
            })?;

        Ok(())
    }
}
