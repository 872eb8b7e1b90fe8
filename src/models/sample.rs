// One point-in-time host + per-process measurement

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessSample {
    pub pid: u32,
    pub name: String,
    /// Percent of one core; may exceed 100 on multi-core hosts.
    pub raw_cpu_pct: f64,
    pub mem_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sample {
    /// Capture time, ms since the Unix epoch.
    pub timestamp: u64,
    pub total_cpu_pct: f64,
    pub total_mem_pct: f64,
    pub logical_cores: u32,
    pub processes: Vec<ProcessSample>,
}

/// Wall-clock ms since the Unix epoch; 0 if the clock is before the epoch.
pub fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, operation = "get_timestamp", "system time error");
            0
        })
}
