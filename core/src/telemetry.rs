// Telemetry: tracing setup and poll counters
use crate::diagram::{DiagramEvent, DiagramEventType};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Install a `fmt` subscriber filtered by `RUST_LOG`, falling back to
/// `default_filter`. Safe to call more than once; later calls are no-ops.
pub fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}

/// Refresh counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollMetrics {
    pub snapshots_applied: u64,
    pub aggregates_applied: u64,
    pub poll_failures: u64,
    pub aggregate_failures: u64,
    pub stale_discarded: u64,
    pub selection_changes: u64,
}

impl PollMetrics {
    pub fn record(&mut self, event: &DiagramEvent) {
        match event.event_type {
            DiagramEventType::SnapshotUpdated => self.snapshots_applied += 1,
            DiagramEventType::AggregateUpdated | DiagramEventType::AggregateEmpty => {
                self.aggregates_applied += 1
            }
            DiagramEventType::PollFailed => self.poll_failures += 1,
            DiagramEventType::AggregateFailed => self.aggregate_failures += 1,
            DiagramEventType::StaleResponseDiscarded => self.stale_discarded += 1,
            DiagramEventType::SelectionChanged => self.selection_changes += 1,
        }
    }
}

/// Collects PollMetrics from a diagram event stream
#[derive(Clone, Default)]
pub struct MetricsCollector {
    metrics: Arc<RwLock<PollMetrics>>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record every event from `rx` until the sender side closes
    pub fn spawn_recorder(&self, mut rx: broadcast::Receiver<DiagramEvent>) -> JoinHandle<()> {
        let metrics = Arc::clone(&self.metrics);
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => metrics.write().await.record(&event),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(target: "telemetry", skipped, "Metrics recorder lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    pub async fn get_metrics(&self) -> PollMetrics {
        self.metrics.read().await.clone()
    }

    /// Print metrics to log
    pub async fn print_metrics(&self) {
        let metrics = self.get_metrics().await;
        info!("=== Refresh Metrics ===");
        info!("Snapshots applied: {}", metrics.snapshots_applied);
        info!("Aggregates applied: {}", metrics.aggregates_applied);
        info!("Poll failures: {}", metrics.poll_failures);
        info!("Aggregate failures: {}", metrics.aggregate_failures);
        info!("Stale responses discarded: {}", metrics.stale_discarded);
        info!("Selection changes: {}", metrics.selection_changes);
    }
}
