//! Long-poll loop feeding SQS batches to the job processor

use super::QueueError;
use crate::config::QueueConfig;
use crate::processor::{BatchSummary, JobProcessor};
use aws_sdk_sqs::Client;
use aws_sdk_sqs::error::DisplayErrorContext;
use aws_sdk_sqs::types::Message;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

pub struct SqsPoller {
    client: Client,
    queue_url: String,
    batch_size: i32,
    wait_time_secs: i32,
    idle_backoff: Duration,
    processor: Arc<JobProcessor>,
}

impl SqsPoller {
    pub fn new(
        client: Client,
        config: &QueueConfig,
        processor: Arc<JobProcessor>,
    ) -> Result<Self, QueueError> {
        let queue_url = config
            .inbound_url
            .clone()
            .ok_or(QueueError::MissingQueueUrl("inbound_url"))?;

        Ok(Self {
            client,
            queue_url,
            batch_size: config.batch_size,
            wait_time_secs: config.wait_time_secs,
            idle_backoff: Duration::from_millis(config.idle_backoff_ms),
            processor,
        })
    }

    /// Poll until `shutdown` resolves.
    ///
    /// Shutdown interrupts a pending receive or a back-off pause; a batch that
    /// was already received is processed and acknowledged first.
    pub async fn run<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        info!(queue_url = %self.queue_url, "Polling inbound queue");
        tokio::pin!(shutdown);

        loop {
            let received = tokio::select! {
                biased;
                _ = &mut shutdown => break,
                received = self.receive() => received,
            };

            match received {
                Ok(messages) if messages.is_empty() => debug!("No messages"),
                Ok(messages) => {
                    self.handle(messages).await;
                }
                Err(e) => {
                    error!(error = %e, "Failed to receive from inbound queue");
                    tokio::select! {
                        biased;
                        _ = &mut shutdown => break,
                        _ = tokio::time::sleep(self.idle_backoff) => {}
                    }
                }
            }
        }

        info!("Poller stopped");
    }

    async fn receive(&self) -> Result<Vec<Message>, QueueError> {
        let output = self
            .client
            .receive_message()
            .queue_url(&self.queue_url)
            .max_number_of_messages(self.batch_size)
            .wait_time_seconds(self.wait_time_secs)
            .send()
            .await
            .map_err(|e| QueueError::ReceiveFailed(DisplayErrorContext(&e).to_string()))?;

        Ok(output.messages.unwrap_or_default())
    }

    /// Process a received batch, then delete every message in it.
    ///
    /// Messages that failed to decode are deleted too: they would never
    /// decode on redelivery either.
    async fn handle(&self, messages: Vec<Message>) -> BatchSummary {
        let bodies = messages.iter().map(|m| m.body().unwrap_or_default());
        let summary = self.processor.process_batch(bodies).await;

        debug!(
            received = summary.received,
            skipped = summary.skipped,
            "Acknowledging batch"
        );

        for message in &messages {
            if let Err(e) = self.delete(message).await {
                warn!(
                    message_id = message.message_id().unwrap_or_default(),
                    error = %e,
                    "Failed to delete message, it will be redelivered"
                );
            }
        }

        summary
    }

    async fn delete(&self, message: &Message) -> Result<(), QueueError> {
        let Some(receipt_handle) = message.receipt_handle() else {
            return Err(QueueError::DeleteFailed("message has no receipt handle".to_string()));
        };

        self.client
            .delete_message()
            .queue_url(&self.queue_url)
            .receipt_handle(receipt_handle)
            .send()
            .await
            .map_err(|e| QueueError::DeleteFailed(DisplayErrorContext(&e).to_string()))?;

        Ok(())
    }
}
