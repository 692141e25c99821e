//! Shared HTTP client for media download, media upload and final delivery

use crate::config::HttpSettings;
use bytes::Bytes;
use reqwest::header::{CONTENT_TYPE, HeaderMap};
use reqwest::multipart::Form;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("HTTP {status}: {reason}")]
    Status { status: u16, reason: String },

    #[error("Failed to build HTTP client: {0}")]
    Build(String),
}

impl From<reqwest::Error> for HttpError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            HttpError::Timeout(error_chain(&e))
        } else {
            HttpError::RequestFailed(error_chain(&e))
        }
    }
}

/// Error message followed by every source, joined with ": ".
fn error_chain(e: &dyn std::error::Error) -> String {
    let mut message = e.to_string();
    let mut source = e.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

pub type Result<T> = std::result::Result<T, HttpError>;

/// Status and full text of a response, whatever the status
#[derive(Debug, Clone)]
pub struct HttpReply {
    pub status: StatusCode,
    pub body: String,
}

impl HttpReply {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Long-lived client shared by every job
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new(settings: &HttpSettings) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(settings.connect_timeout_secs))
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .user_agent(&settings.user_agent)
            .build()
            .map_err(|e| HttpError::Build(e.to_string()))?;

        Ok(Self { client })
    }

    /// GET a resource as raw bytes; a non-success status is an error.
    pub async fn download(&self, url: &str) -> Result<Bytes> {
        debug!(url, "Starting download");

        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(HttpError::Status {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        let bytes = response.bytes().await?;
        debug!(url, size = bytes.len(), "Download completed");

        Ok(bytes)
    }

    /// POST a JSON string body with the given extra headers.
    pub async fn post_json(&self, url: &str, headers: HeaderMap, body: String) -> Result<HttpReply> {
        let response = self
            .client
            .post(url)
            .headers(headers)
            .header(CONTENT_TYPE, mime::APPLICATION_JSON.as_ref())
            .body(body)
            .send()
            .await?;

        read_reply(response).await
    }

    /// POST a multipart form with the given extra headers.
    pub async fn post_multipart(&self, url: &str, headers: HeaderMap, form: Form) -> Result<HttpReply> {
        let response = self
            .client
            .post(url)
            .headers(headers)
            .multipart(form)
            .send()
            .await?;

        read_reply(response).await
    }
}

async fn read_reply(response: reqwest::Response) -> Result<HttpReply> {
    let status = response.status();
    let body = response.text().await?;
    debug!(status = status.as_u16(), size = body.len(), "Response received");
    Ok(HttpReply { status, body })
}
