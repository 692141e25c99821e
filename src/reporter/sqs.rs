//! SQS-backed result sink

use super::{Result, ResultSink, SinkError};
use crate::job::OutcomeRecord;
use async_trait::async_trait;
use aws_sdk_sqs::Client;
use aws_sdk_sqs::error::DisplayErrorContext;
use tracing::debug;

pub struct SqsResultSink {
    client: Client,
    queue_url: String,
}

impl SqsResultSink {
    pub fn new(client: Client, queue_url: impl Into<String>) -> Self {
        Self {
            client,
            queue_url: queue_url.into(),
        }
    }

    pub fn queue_url(&self) -> &str {
        &self.queue_url
    }
}

#[async_trait]
impl ResultSink for SqsResultSink {
    async fn send(&self, record: &OutcomeRecord) -> Result<()> {
        let body = record.to_json()?;

        let output = self
            .client
            .send_message()
            .queue_url(&self.queue_url)
            .message_body(body)
            .send()
            .await
            .map_err(|e| SinkError::PublishFailed(DisplayErrorContext(&e).to_string()))?;

        debug!(
            job_id = record.job_id,
            message_id = output.message_id().unwrap_or_default(),
            "Outcome enqueued"
        );

        Ok(())
    }
}
