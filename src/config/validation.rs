use super::models::Config;
use thiserror::Error;

const SQS_MAX_BATCH: i32 = 10;
const SQS_MAX_WAIT_SECS: i32 = 20;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("provider.host_marker must not be empty")]
    EmptyHostMarker,

    #[error("provider.upload_base_url must be an http(s) URL, got '{0}'")]
    InvalidUploadBaseUrl(String),

    #[error("http timeout must be positive: {field} = 0")]
    ZeroTimeout { field: &'static str },

    #[error("queue.batch_size must be within 1..=10, got {0}")]
    InvalidBatchSize(i32),

    #[error("queue.wait_time_secs must be within 0..=20, got {0}")]
    InvalidWaitTime(i32),

    #[error("worker.max_concurrent_jobs must be positive")]
    ZeroConcurrency,
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_provider(config)?;
    validate_http(config)?;
    validate_queue(config)?;
    validate_worker(config)?;
    Ok(())
}

fn validate_provider(config: &Config) -> Result<(), ValidationError> {
    if config.provider.host_marker.trim().is_empty() {
        return Err(ValidationError::EmptyHostMarker);
    }

    let base = &config.provider.upload_base_url;
    let parsed = reqwest::Url::parse(base)
        .map_err(|_| ValidationError::InvalidUploadBaseUrl(base.clone()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ValidationError::InvalidUploadBaseUrl(base.clone()));
    }

    Ok(())
}

fn validate_http(config: &Config) -> Result<(), ValidationError> {
    if config.http.connect_timeout_secs == 0 {
        return Err(ValidationError::ZeroTimeout {
            field: "connect_timeout_secs",
        });
    }
    if config.http.request_timeout_secs == 0 {
        return Err(ValidationError::ZeroTimeout {
            field: "request_timeout_secs",
        });
    }
    Ok(())
}

fn validate_queue(config: &Config) -> Result<(), ValidationError> {
    let queue = &config.queue;
    if !(1..=SQS_MAX_BATCH).contains(&queue.batch_size) {
        return Err(ValidationError::InvalidBatchSize(queue.batch_size));
    }
    if !(0..=SQS_MAX_WAIT_SECS).contains(&queue.wait_time_secs) {
        return Err(ValidationError::InvalidWaitTime(queue.wait_time_secs));
    }
    Ok(())
}

fn validate_worker(config: &Config) -> Result<(), ValidationError> {
    if config.worker.max_concurrent_jobs == 0 {
        return Err(ValidationError::ZeroConcurrency);
    }
    Ok(())
}
