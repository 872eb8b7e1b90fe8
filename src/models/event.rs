// Events emitted by the watchdog and the live reporter

use serde::{Deserialize, Serialize};

use super::Ranking;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertEvent {
    pub timestamp: u64,
    pub total_cpu_pct: f64,
    pub total_mem_pct: f64,
    pub top: Ranking,
}

/// One periodic update of a live status stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusEvent {
    pub timestamp: u64,
    /// 1-based position in the stream.
    pub seq: u64,
    pub total_cpu_pct: f64,
    pub total_mem_pct: f64,
    pub top: Ranking,
    /// Highest host CPU over the rolling history window.
    pub peak_cpu_pct: f64,
    /// Mean host CPU over the rolling history window.
    pub avg_cpu_pct: f64,
    pub uptime_secs: u64,
}
