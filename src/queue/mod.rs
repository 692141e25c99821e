//! SQS plumbing: client construction and the inbound poll loop

pub mod poller;

pub use poller::SqsPoller;

use crate::config::QueueConfig;
use aws_config::BehaviorVersion;
use aws_sdk_sqs::Client;
use aws_sdk_sqs::config::Region;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("queue.{0} is not configured")]
    MissingQueueUrl(&'static str),

    #[error("Receive failed: {0}")]
    ReceiveFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),
}

/// Build an SQS client from the ambient AWS environment.
pub async fn sqs_client(config: &QueueConfig) -> Client {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());
    if let Some(region) = &config.region {
        loader = loader.region(Region::new(region.clone()));
    }

    let sdk_config = loader.load().await;
    Client::new(&sdk_config)
}
