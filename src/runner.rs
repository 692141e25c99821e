//! Entry points wiring config, clients and the processor together

use crate::config::Config;
use crate::observability::Metrics;
use crate::processor::{BatchSummary, JobProcessor};
use crate::queue::{self, QueueError, SqsPoller};
use crate::reporter::{LogSink, ResultSink, SqsResultSink};
use crate::server;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Poll the inbound queue and serve `/health` until a shutdown signal.
pub async fn run_worker(config: Config) -> Result<(), AnyError> {
    let result_url = config
        .queue
        .result_url
        .clone()
        .ok_or(QueueError::MissingQueueUrl("result_url"))?;

    let client = queue::sqs_client(&config.queue).await;
    let metrics = Arc::new(Metrics::new());
    let sink: Arc<dyn ResultSink> = Arc::new(SqsResultSink::new(client.clone(), result_url));
    let processor = Arc::new(JobProcessor::new(&config, sink, metrics.clone())?);
    let poller = SqsPoller::new(client, &config.queue, processor)?;

    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        server::shutdown_signal().await;
        let _ = stop_tx.send(true);
    });

    let health = tokio::spawn(server::run(
        config.worker.health_addr,
        stopped(stop_rx.clone()),
    ));

    poller.run(stopped(stop_rx)).await;

    match health.await {
        Ok(Err(e)) => warn!(error = %e, "Health server exited with error"),
        Err(e) => warn!(error = %e, "Health server task failed"),
        Ok(Ok(())) => {}
    }

    info!(metrics = ?metrics.snapshot(), "Worker stopped");
    Ok(())
}

/// Process a file of queue messages, one per line, as a single batch.
///
/// Outcomes go to the result queue when one is configured, otherwise (or
/// with `dry_run`) they are logged.
pub async fn run_replay(config: Config, input: &Path, dry_run: bool) -> Result<BatchSummary, AnyError> {
    let contents = tokio::fs::read_to_string(input).await?;

    let sink: Arc<dyn ResultSink> = match (&config.queue.result_url, dry_run) {
        (Some(result_url), false) => {
            let client = queue::sqs_client(&config.queue).await;
            Arc::new(SqsResultSink::new(client, result_url.clone()))
        }
        _ => Arc::new(LogSink),
    };

    let processor = JobProcessor::new(&config, sink, Arc::new(Metrics::new()))?;
    let summary = processor.process_batch(contents.lines()).await;

    info!(
        input = %input.display(),
        received = summary.received,
        delivered = summary.delivered,
        failed = summary.failed,
        skipped = summary.skipped,
        "Replay finished"
    );

    Ok(summary)
}

async fn stopped(mut rx: watch::Receiver<bool>) {
    let _ = rx.wait_for(|stop| *stop).await;
}
