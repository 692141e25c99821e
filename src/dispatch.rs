//! Final delivery of a job to its target URL

use crate::headers::HeaderSet;
use crate::http::HttpClient;
use crate::job::{OutcomeRecord, OutcomeStatus};
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct Dispatcher {
    http: HttpClient,
}

impl Dispatcher {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    /// POST `body` to `url` and classify the result.
    ///
    /// 2xx is [`OutcomeStatus::Delivered`]; any other status or a transport
    /// error is [`OutcomeStatus::Failed`]. The response text (or the error
    /// message) is kept either way.
    pub async fn dispatch(
        &self,
        job_id: i64,
        url: &str,
        headers: &HeaderSet,
        body: String,
    ) -> OutcomeRecord {
        match self.http.post_json(url, headers.to_header_map(), body).await {
            Ok(reply) => {
                let status = OutcomeStatus::from_http_success(reply.is_success());
                if status == OutcomeStatus::Delivered {
                    info!(job_id, http_status = reply.status.as_u16(), "Message delivered");
                } else {
                    warn!(job_id, http_status = reply.status.as_u16(), "Provider rejected message");
                }

                OutcomeRecord {
                    job_id,
                    status,
                    response_content: reply.body,
                }
            }
            Err(e) => {
                warn!(job_id, url, error = %e, "Delivery request failed");
                OutcomeRecord::failed(job_id, e.to_string())
            }
        }
    }
}
