//! Media relay: re-host remote media on the provider before delivery
//!
//! Some provider endpoints only accept media they host themselves. When a
//! message body points at an external `link`, the relay downloads the file,
//! uploads it to the provider's public-media endpoint and swaps the link for
//! the returned public URL.
//!
//! Every step returns a [`RelayFallback`] on failure and the relay then hands
//! back the body it was given. A relay problem never fails the job; the
//! delivery is attempted with the original payload instead.

pub mod media;
pub mod policy;

pub use media::MediaReference;
pub use policy::MediaPolicy;

use crate::headers::HeaderSet;
use crate::http::HttpClient;
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Why a body was left unchanged
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelayFallback {
    #[error("body is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("body has no media type")]
    MissingType,

    #[error("media link is missing or not an http(s) URL")]
    NotRemote,

    #[error("no plugin id after 'whatsapp/' in target URL")]
    NoPluginId,

    #[error("media download failed: {0}")]
    Download(String),

    #[error("media upload failed: {0}")]
    Upload(String),

    #[error("upload rejected with HTTP {status}: {body}")]
    UploadRejected { status: u16, body: String },

    #[error("upload response is not valid JSON: {0}")]
    InvalidUploadResponse(String),

    #[error("upload response has no _data.publicMediaUrl")]
    MissingPublicUrl,

    #[error("media node '{0}' has no object to hold the new link")]
    LinkNotReplaced(String),

    #[error("failed to serialize rewritten body: {0}")]
    Serialize(String),
}

/// Result of one relay attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome {
    Rewritten { body: String, public_url: String },
    Unchanged { body: String, reason: RelayFallback },
}

impl RelayOutcome {
    pub fn into_body(self) -> String {
        match self {
            RelayOutcome::Rewritten { body, .. } | RelayOutcome::Unchanged { body, .. } => body,
        }
    }

    pub fn is_rewritten(&self) -> bool {
        matches!(self, RelayOutcome::Rewritten { .. })
    }
}

#[derive(Debug, Clone)]
pub struct MediaRelay {
    http: HttpClient,
    upload_base_url: String,
}

impl MediaRelay {
    pub fn new(http: HttpClient, upload_base_url: impl Into<String>) -> Self {
        let upload_base_url = upload_base_url.into().trim_end_matches('/').to_string();
        Self {
            http,
            upload_base_url,
        }
    }

    pub fn upload_url(&self, plugin_id: &str) -> String {
        format!(
            "{}/v1/ext/plugin/whatsapp/{}/upload-public-media",
            self.upload_base_url, plugin_id
        )
    }

    /// Try to re-host the media `body` references. Never fails.
    pub async fn relay(&self, target_url: &str, headers: &HeaderSet, body: &str) -> RelayOutcome {
        match self.try_relay(target_url, headers, body).await {
            Ok((body, public_url)) => {
                info!(public_url = %public_url, "Media re-hosted on provider");
                RelayOutcome::Rewritten { body, public_url }
            }
            Err(reason) => {
                match &reason {
                    RelayFallback::MissingType | RelayFallback::NotRemote => {
                        debug!(reason = %reason, "Body is not a relay candidate")
                    }
                    _ => warn!(reason = %reason, "Media relay skipped, keeping original body"),
                }
                RelayOutcome::Unchanged {
                    body: body.to_string(),
                    reason,
                }
            }
        }
    }

    async fn try_relay(
        &self,
        target_url: &str,
        headers: &HeaderSet,
        body: &str,
    ) -> Result<(String, String), RelayFallback> {
        let doc: Value =
            serde_json::from_str(body).map_err(|e| RelayFallback::InvalidJson(e.to_string()))?;

        let media = MediaReference::extract(&doc)?;
        let plugin_id = media::plugin_id(target_url).ok_or(RelayFallback::NoPluginId)?;

        let bytes = self
            .http
            .download(&media.link)
            .await
            .map_err(|e| RelayFallback::Download(e.to_string()))?;

        let filename = media.upload_filename().to_string();
        debug!(
            link = %media.link,
            size = bytes.len(),
            filename = %filename,
            "Origin media downloaded"
        );

        let file = Part::bytes(bytes.to_vec())
            .file_name(filename.clone())
            .mime_str(mime::APPLICATION_OCTET_STREAM.as_ref())
            .map_err(|e| RelayFallback::Upload(e.to_string()))?;
        let form = Form::new().part("file", file).text("filename", filename);

        let reply = self
            .http
            .post_multipart(&self.upload_url(plugin_id), headers.to_header_map(), form)
            .await
            .map_err(|e| RelayFallback::Upload(e.to_string()))?;

        if !reply.is_success() {
            return Err(RelayFallback::UploadRejected {
                status: reply.status.as_u16(),
                body: reply.body,
            });
        }

        let response: Value = serde_json::from_str(&reply.body)
            .map_err(|e| RelayFallback::InvalidUploadResponse(e.to_string()))?;

        let public_url = media::get_path(&response, &["_data", "publicMediaUrl"])
            .and_then(Value::as_str)
            .ok_or(RelayFallback::MissingPublicUrl)?
            .to_string();

        let rewritten = rewrite_link(doc, &media, &public_url)?;

        Ok((rewritten, public_url))
    }
}

/// Point the media node at `public_url` and serialize the document.
fn rewrite_link(
    mut doc: Value,
    media: &MediaReference,
    public_url: &str,
) -> Result<String, RelayFallback> {
    if !media::set_path(&mut doc, &media.link_path(), Value::String(public_url.to_string())) {
        return Err(RelayFallback::LinkNotReplaced(media.kind.clone()));
    }

    serde_json::to_string(&doc).map_err(|e| RelayFallback::Serialize(e.to_string()))
}
