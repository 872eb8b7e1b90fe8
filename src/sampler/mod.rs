// Host and per-process CPU/memory sampling via sysinfo

use crate::error::SamplingError;
use crate::models::{ProcessSample, Sample, now_millis};
use std::sync::Arc;
use std::time::Duration;
use sysinfo::{ProcessesToUpdate, System};
use tracing::instrument;

const MAX_NAME_LEN: usize = 64;

/// Produces one fresh [`Sample`] per call. Implementations may block.
pub trait Sampler: Send + Sync {
    fn capture(&self) -> Result<Sample, SamplingError>;
}

/// Runs `sampler.capture()` on the blocking pool so slow OS queries never stall async tasks.
pub async fn capture(sampler: Arc<dyn Sampler>) -> Result<Sample, SamplingError> {
    tokio::task::spawn_blocking(move || sampler.capture())
        .await
        .map_err(|e| SamplingError::Task(e.to_string()))?
}

/// Samples the real host. Every capture uses its own `System` and measures over
/// `window`, so concurrent captures never share refresh state.
pub struct SysinfoSampler {
    window: Duration,
}

impl Default for SysinfoSampler {
    fn default() -> Self {
        Self::new(Duration::from_millis(500))
    }
}

impl SysinfoSampler {
    pub fn new(window: Duration) -> Self {
        Self {
            window: window.max(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}

impl Sampler for SysinfoSampler {
    #[instrument(skip(self), fields(sampler = "sysinfo", operation = "capture"))]
    fn capture(&self) -> Result<Sample, SamplingError> {
        let mut sys = System::new();
        // CPU usage is a delta between two refreshes; prime, wait, measure.
        sys.refresh_cpu_all();
        sys.refresh_processes(ProcessesToUpdate::All, true);
        std::thread::sleep(self.window);
        sys.refresh_cpu_all();
        sys.refresh_memory();
        sys.refresh_processes(ProcessesToUpdate::All, true);

        let logical_cores = sys.cpus().len() as u32;
        if logical_cores == 0 {
            return Err(SamplingError::Unavailable("no CPUs visible".into()));
        }
        if sys.processes().is_empty() {
            return Err(SamplingError::Unavailable(
                "process table is empty or unreadable".into(),
            ));
        }

        let total_memory = sys.total_memory();
        let used_memory = total_memory.saturating_sub(sys.available_memory());
        let total_mem_pct = percent_of(used_memory, total_memory);

        // Processes that exited between the two refreshes were dropped by
        // remove_dead; unreadable ones never made it into the table.
        let mut processes: Vec<ProcessSample> = sys
            .processes()
            .iter()
            .filter(|(_, p)| p.thread_kind().is_none())
            .map(|(pid, p)| {
                let pid = pid.as_u32();
                ProcessSample {
                    pid,
                    name: display_name(&p.name().to_string_lossy(), pid),
                    raw_cpu_pct: p.cpu_usage() as f64,
                    mem_pct: percent_of(p.memory(), total_memory),
                }
            })
            .collect();
        processes.sort_by_key(|p| p.pid);

        Ok(Sample {
            timestamp: now_millis(),
            total_cpu_pct: (sys.global_cpu_usage() as f64).clamp(0.0, 100.0),
            total_mem_pct,
            logical_cores,
            processes,
        })
    }
}

fn percent_of(part: u64, total: u64) -> f64 {
    if total > 0 {
        (part as f64 / total as f64) * 100.0
    } else {
        0.0
    }
}

/// Name shown to users: truncated, with a `pid-N` fallback for nameless entries.
pub(crate) fn display_name(raw: &str, pid: u32) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return format!("pid-{}", pid);
    }
    trimmed.chars().take(MAX_NAME_LEN).collect()
}
