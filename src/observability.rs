//! Pipeline counters

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics handle shared by the processor and reporter
#[derive(Debug, Default)]
pub struct Metrics {
    jobs_received: AtomicU64,
    jobs_skipped: AtomicU64,
    jobs_delivered: AtomicU64,
    jobs_failed: AtomicU64,
    media_relayed: AtomicU64,
    relay_fallbacks: AtomicU64,
    report_failures: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn job_received(&self) {
        self.bump(&self.jobs_received, "jobs_received");
    }

    pub fn job_skipped(&self) {
        self.bump(&self.jobs_skipped, "jobs_skipped");
    }

    pub fn job_delivered(&self) {
        self.bump(&self.jobs_delivered, "jobs_delivered");
    }

    pub fn job_failed(&self) {
        self.bump(&self.jobs_failed, "jobs_failed");
    }

    pub fn media_relayed(&self) {
        self.bump(&self.media_relayed, "media_relayed");
    }

    pub fn relay_fallback(&self) {
        self.bump(&self.relay_fallbacks, "relay_fallbacks");
    }

    pub fn report_failed(&self) {
        self.bump(&self.report_failures, "report_failures");
    }

    fn bump(&self, counter: &AtomicU64, name: &'static str) {
        counter.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(counter = name, "Metric incremented");
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            jobs_received: self.jobs_received.load(Ordering::Relaxed),
            jobs_skipped: self.jobs_skipped.load(Ordering::Relaxed),
            jobs_delivered: self.jobs_delivered.load(Ordering::Relaxed),
            jobs_failed: self.jobs_failed.load(Ordering::Relaxed),
            media_relayed: self.media_relayed.load(Ordering::Relaxed),
            relay_fallbacks: self.relay_fallbacks.load(Ordering::Relaxed),
            report_failures: self.report_failures.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub jobs_received: u64,
    pub jobs_skipped: u64,
    pub jobs_delivered: u64,
    pub jobs_failed: u64,
    pub media_relayed: u64,
    pub relay_fallbacks: u64,
    pub report_failures: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let metrics = Metrics::new();
        metrics.job_received();
        metrics.job_received();
        metrics.job_delivered();
        metrics.relay_fallback();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.jobs_received, 2);
        assert_eq!(snapshot.jobs_delivered, 1);
        assert_eq!(snapshot.relay_fallbacks, 1);
        assert_eq!(snapshot.jobs_failed, 0);
    }
}
