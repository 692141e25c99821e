//! Job processor: decode, relay, dispatch and report each queue message
//!
//! Per job the flow is `Decoded -> (Relay?) -> Dispatched -> Reported`.
//! Messages that fail to decode are logged and dropped with no outcome, since
//! there is no job id to report against. Every decoded job produces exactly
//! one [`OutcomeRecord`].

use crate::config::Config;
use crate::dispatch::Dispatcher;
use crate::headers::HeaderSet;
use crate::http::{HttpClient, HttpError};
use crate::job::{OutboundJob, OutcomeRecord, OutcomeStatus};
use crate::observability::Metrics;
use crate::relay::{MediaPolicy, MediaRelay, RelayOutcome};
use crate::reporter::{Reporter, ResultSink};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

/// Counts for one processed batch
#[derive(Debug, Clone, Default)]
pub struct BatchSummary {
    pub received: usize,
    pub skipped: usize,
    pub delivered: usize,
    pub failed: usize,
    /// Outcomes of decoded jobs, in completion order
    pub records: Vec<OutcomeRecord>,
}

pub struct JobProcessor {
    policy: MediaPolicy,
    relay: MediaRelay,
    dispatcher: Dispatcher,
    reporter: Reporter,
    metrics: Arc<Metrics>,
    max_concurrent_jobs: usize,
}

impl JobProcessor {
    /// Build the processor and its shared HTTP client.
    pub fn new(
        config: &Config,
        sink: Arc<dyn ResultSink>,
        metrics: Arc<Metrics>,
    ) -> Result<Self, HttpError> {
        let http = HttpClient::new(&config.http)?;

        Ok(Self {
            policy: MediaPolicy::new(config.provider.host_marker.clone()),
            relay: MediaRelay::new(http.clone(), config.provider.upload_base_url.clone()),
            dispatcher: Dispatcher::new(http),
            reporter: Reporter::new(sink, metrics.clone()),
            metrics,
            max_concurrent_jobs: config.worker.max_concurrent_jobs.max(1),
        })
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// Process every message of a batch independently.
    ///
    /// Up to `worker.max_concurrent_jobs` jobs run at once. One job's failure
    /// never stops the others.
    pub async fn process_batch<I, S>(&self, messages: I) -> BatchSummary
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let batch_id = Uuid::new_v4();
        let span = info_span!("batch", %batch_id);

        async {
            let outcomes: Vec<Option<OutcomeRecord>> = stream::iter(messages)
                .map(|message| async move { self.process_message(message.as_ref()).await })
                .buffer_unordered(self.max_concurrent_jobs)
                .collect()
                .await;

            let mut summary = BatchSummary {
                received: outcomes.len(),
                ..Default::default()
            };

            for outcome in outcomes {
                match outcome {
                    None => summary.skipped += 1,
                    Some(record) => {
                        match record.status {
                            OutcomeStatus::Delivered => summary.delivered += 1,
                            OutcomeStatus::Failed => summary.failed += 1,
                        }
                        summary.records.push(record);
                    }
                }
            }

            info!(
                received = summary.received,
                delivered = summary.delivered,
                failed = summary.failed,
                skipped = summary.skipped,
                "Batch processed"
            );

            summary
        }
        .instrument(span)
        .await
    }

    /// Decode and process one raw message.
    ///
    /// Returns `None` when the message does not decode.
    pub async fn process_message(&self, raw: &str) -> Option<OutcomeRecord> {
        self.metrics.job_received();

        if raw.trim().is_empty() {
            debug!("Skipping empty message");
            self.metrics.job_skipped();
            return None;
        }

        let job = match OutboundJob::decode(raw) {
            Ok(job) => job,
            Err(e) => {
                warn!(error = %e, "Failed to decode message, dropping it");
                self.metrics.job_skipped();
                return None;
            }
        };

        let span = info_span!("job", job_id = job.id);
        let record = async {
            let record = self.process_job(job).await;
            self.reporter.report(&record).await;
            record
        }
        .instrument(span)
        .await;

        Some(record)
    }

    /// Relay media if needed, then deliver. Reporting is left to the caller.
    pub async fn process_job(&self, mut job: OutboundJob) -> OutcomeRecord {
        let headers = HeaderSet::from_optional(job.header.as_deref());

        if self.policy.should_relay(&job.url, job.body.as_deref()) {
            if let Some(body) = job.body.as_deref() {
                info!("Media detected for provider, relaying before delivery");
                let outcome = self.relay.relay(&job.url, &headers, body).await;

                match &outcome {
                    RelayOutcome::Rewritten { .. } => self.metrics.media_relayed(),
                    RelayOutcome::Unchanged { .. } => self.metrics.relay_fallback(),
                }
                job.body = Some(outcome.into_body());
            }
        }

        let record = self
            .dispatcher
            .dispatch(job.id, &job.url, &headers, job.body_or_empty().to_string())
            .await;

        match record.status {
            OutcomeStatus::Delivered => self.metrics.job_delivered(),
            OutcomeStatus::Failed => self.metrics.job_failed(),
        }

        record
    }
}
