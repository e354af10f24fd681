//! Logging setup and fulfillment counters

use std::sync::atomic::{AtomicU64, Ordering};
use tracing::Subscriber;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::util::SubscriberInitExt;

/// Filter used before configuration is available
pub const BOOTSTRAP_FILTER: &str = "info";

/// Install the global `tracing` subscriber. `RUST_LOG` wins over `default_filter`.
pub fn init_tracing(default_filter: &str) {
    // A subscriber may already be installed (tests, embedding applications)
    let _ = subscriber(env_filter(default_filter)).try_init();
}

/// Subscriber to scope over configuration loading, before `init_tracing`
/// can be called with the configured filter.
pub fn bootstrap_subscriber() -> impl Subscriber + Send + Sync + 'static {
    subscriber(env_filter(BOOTSTRAP_FILTER))
}

fn env_filter(default_filter: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter))
}

fn subscriber(filter: EnvFilter) -> impl Subscriber + Send + Sync + 'static {
    tracing_subscriber::fmt().with_env_filter(filter).finish()
}

/// Counters shared by every fulfillment attempt of a process
#[derive(Debug, Default)]
pub struct Metrics {
    attempts_started: AtomicU64,
    succeeded: AtomicU64,
    succeeded_early: AtomicU64,
    cancelled: AtomicU64,
    failed: AtomicU64,
    resolution_failures: AtomicU64,
    paths_rejected: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    fn bump(counter: &AtomicU64, name: &'static str) {
        counter.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = name, "Metric incremented");
    }

    pub fn attempt_started(&self) {
        Self::bump(&self.attempts_started, "attempts_started");
    }

    pub fn attempt_succeeded(&self) {
        Self::bump(&self.succeeded, "succeeded");
    }

    pub fn attempt_succeeded_early(&self) {
        Self::bump(&self.succeeded_early, "succeeded_early");
    }

    pub fn attempt_cancelled(&self) {
        Self::bump(&self.cancelled, "cancelled");
    }

    pub fn attempt_failed(&self) {
        Self::bump(&self.failed, "failed");
    }

    pub fn resolution_failed(&self) {
        Self::bump(&self.resolution_failures, "resolution_failures");
    }

    pub fn paths_rejected(&self, count: usize) {
        if count > 0 {
            self.paths_rejected.fetch_add(count as u64, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            attempts_started: self.attempts_started.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            succeeded_early: self.succeeded_early.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            resolution_failures: self.resolution_failures.load(Ordering::Relaxed),
            paths_rejected: self.paths_rejected.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub attempts_started: u64,
    pub succeeded: u64,
    pub succeeded_early: u64,
    pub cancelled: u64,
    pub failed: u64,
    pub resolution_failures: u64,
    pub paths_rejected: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_reflects_counters() {
        let metrics = Metrics::new();
        metrics.attempt_started();
        metrics.attempt_started();
        metrics.attempt_cancelled();
        metrics.paths_rejected(3);
        metrics.paths_rejected(0);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.attempts_started, 2);
        assert_eq!(snapshot.cancelled, 1);
        assert_eq!(snapshot.paths_rejected, 3);
        assert_eq!(snapshot.failed, 0);
    }

    #[test]
    fn test_subscriber_applies_filter() {
        let (info, debug) =
            tracing::subscriber::with_default(subscriber(EnvFilter::new("info")), || {
                (
                    tracing::enabled!(tracing::Level::INFO),
                    tracing::enabled!(tracing::Level::DEBUG),
                )
            });
        assert!(info);
        assert!(!debug);
    }
}
