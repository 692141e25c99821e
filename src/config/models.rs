use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub http: HttpSettings,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub worker: WorkerConfig,
}

/// Media-upload-capable provider
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderConfig {
    /// Substring of a job URL that marks the provider
    #[serde(default = "default_host_marker")]
    pub host_marker: String,
    /// Scheme and host the upload path is appended to
    #[serde(default = "default_upload_base_url")]
    pub upload_base_url: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            host_marker: default_host_marker(),
            upload_base_url: default_upload_base_url(),
        }
    }
}

fn default_host_marker() -> String {
    "chakrahq.com".to_string()
}

fn default_upload_base_url() -> String {
    "https://api.chakrahq.com".to_string()
}

/// Shared HTTP client settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpSettings {
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_user_agent() -> String {
    "dispatchbox/0.1.0".to_string()
}

/// SQS queues
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QueueConfig {
    /// Queue the worker polls for jobs
    pub inbound_url: Option<String>,
    /// Queue outcome records are sent to
    pub result_url: Option<String>,
    pub region: Option<String>,
    /// Messages per receive call (SQS allows 1..=10)
    #[serde(default = "default_batch_size")]
    pub batch_size: i32,
    /// Long-poll wait (SQS allows 0..=20)
    #[serde(default = "default_wait_time_secs")]
    pub wait_time_secs: i32,
    /// Pause after a failed receive
    #[serde(default = "default_idle_backoff_ms")]
    pub idle_backoff_ms: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            inbound_url: None,
            result_url: None,
            region: None,
            batch_size: default_batch_size(),
            wait_time_secs: default_wait_time_secs(),
            idle_backoff_ms: default_idle_backoff_ms(),
        }
    }
}

fn default_batch_size() -> i32 {
    10
}

fn default_wait_time_secs() -> i32 {
    20
}

fn default_idle_backoff_ms() -> u64 {
    1000
}

/// Worker process settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkerConfig {
    #[serde(default = "default_max_concurrent_jobs")]
    pub max_concurrent_jobs: usize,
    #[serde(default = "default_health_addr")]
    pub health_addr: SocketAddr,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: default_max_concurrent_jobs(),
            health_addr: default_health_addr(),
        }
    }
}

fn default_max_concurrent_jobs() -> usize {
    8
}

fn default_health_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}
