// Sample -> normalized top-N ranking.
// Per-process CPU arrives as percent of one core; dividing by the logical core
// count turns it into a share of the whole host, so the shares sum to roughly
// the host-wide total.

use crate::models::{RankedProcess, Ranking, Sample};
use std::cmp::Ordering;

/// Normalizes, sorts (cpu desc, pid asc) and truncates to `n` entries.
pub fn rank(sample: &Sample, n: usize) -> Ranking {
    let cores = sample.logical_cores.max(1) as f64;
    let mut entries: Vec<RankedProcess> = sample
        .processes
        .iter()
        .map(|p| RankedProcess {
            pid: p.pid,
            name: p.name.clone(),
            cpu_pct: normalize(p.raw_cpu_pct, cores),
        })
        .collect();
    entries.sort_by(compare);
    entries.truncate(n);
    Ranking { entries }
}

fn normalize(raw_cpu_pct: f64, cores: f64) -> f64 {
    if raw_cpu_pct.is_finite() {
        (raw_cpu_pct.max(0.0) / cores).min(100.0)
    } else {
        0.0
    }
}

fn compare(a: &RankedProcess, b: &RankedProcess) -> Ordering {
    b.cpu_pct
        .total_cmp(&a.cpu_pct)
        .then_with(|| a.pid.cmp(&b.pid))
}
