//! Outcome reporting to the result queue
//!
//! Reporting is best effort. A failed enqueue is logged and counted but never
//! surfaces to the caller, since the delivery POST may already have happened.

pub mod sqs;

pub use sqs::SqsResultSink;

use crate::job::OutcomeRecord;
use crate::observability::Metrics;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{error, info};

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Failed to serialize outcome: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Publish failed: {0}")]
    PublishFailed(String),
}

pub type Result<T> = std::result::Result<T, SinkError>;

/// Destination for outcome records
#[async_trait]
pub trait ResultSink: Send + Sync {
    async fn send(&self, record: &OutcomeRecord) -> Result<()>;
}

/// Collects records in memory (tests and dry runs)
#[derive(Debug, Default)]
pub struct InMemorySink {
    records: Mutex<Vec<OutcomeRecord>>,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn records(&self) -> Vec<OutcomeRecord> {
        self.records.lock().await.clone()
    }
}

#[async_trait]
impl ResultSink for InMemorySink {
    async fn send(&self, record: &OutcomeRecord) -> Result<()> {
        self.records.lock().await.push(record.clone());
        Ok(())
    }
}

/// Writes each record as a log line instead of enqueueing it
#[derive(Debug, Clone, Default)]
pub struct LogSink;

#[async_trait]
impl ResultSink for LogSink {
    async fn send(&self, record: &OutcomeRecord) -> Result<()> {
        let payload = record.to_json()?;
        info!(job_id = record.job_id, status = record.status.code(), %payload, "Outcome");
        Ok(())
    }
}

/// Best-effort front for a [`ResultSink`]
#[derive(Clone)]
pub struct Reporter {
    sink: Arc<dyn ResultSink>,
    metrics: Arc<Metrics>,
}

impl Reporter {
    pub fn new(sink: Arc<dyn ResultSink>, metrics: Arc<Metrics>) -> Self {
        Self { sink, metrics }
    }

    /// Submit `record`; failures are logged and swallowed.
    pub async fn report(&self, record: &OutcomeRecord) {
        if let Err(e) = self.sink.send(record).await {
            self.metrics.report_failed();
            error!(job_id = record.job_id, error = %e, "Failed to report outcome");
        }
    }
}
