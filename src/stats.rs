// Periodic "app stats" log line and snapshot housekeeping.

use crate::reporter::LiveReporter;
use crate::snapshot_registry::SnapshotRegistry;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Prunes expired snapshots and logs counters every `interval`. The first pass
/// runs immediately.
pub fn spawn_stats_logger(
    registry: Arc<SnapshotRegistry>,
    reporter: Arc<LiveReporter>,
    alerts_sent_total: Arc<AtomicU64>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(interval);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tick.tick().await;
            let pruned = registry.prune_expired().await;
            let status_streams = reporter.active().await;
            let snapshots = registry.len().await;
            tracing::info!(
                status_streams,
                snapshots,
                snapshots_pruned = pruned,
                alerts_sent_total = alerts_sent_total.load(Ordering::Relaxed),
                "app stats"
            );
        }
    })
}
