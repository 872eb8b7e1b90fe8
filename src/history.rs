// Rolling host CPU history: fed by the watchdog tick, read by status streams.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// Bounded ring of recent host CPU readings, oldest first.
#[derive(Debug)]
pub struct CpuHistory {
    readings: Mutex<VecDeque<f64>>,
    capacity: usize,
}

/// Peak and mean over the history window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CpuSummary {
    pub peak_cpu_pct: f64,
    pub avg_cpu_pct: f64,
}

impl CpuHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            readings: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Enough slots to cover `window` at one reading per `every`.
    pub fn for_window(window: Duration, every: Duration) -> Self {
        let every_ms = every.as_millis().max(1);
        let slots = window.as_millis().div_ceil(every_ms);
        Self::new(usize::try_from(slots).unwrap_or(usize::MAX))
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Appends a reading, evicting the oldest once full. Non-finite readings are ignored.
    pub fn push(&self, total_cpu_pct: f64) {
        if !total_cpu_pct.is_finite() {
            return;
        }
        let mut readings = self.lock();
        if readings.len() == self.capacity {
            readings.pop_front();
        }
        readings.push_back(total_cpu_pct);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Peak and mean of the window; `current` stands in while the window is still empty.
    pub fn summary_or(&self, current: f64) -> CpuSummary {
        let readings = self.lock();
        if readings.is_empty() {
            return CpuSummary {
                peak_cpu_pct: current,
                avg_cpu_pct: current,
            };
        }
        let peak_cpu_pct = readings.iter().copied().fold(f64::MIN, f64::max);
        let avg_cpu_pct = readings.iter().sum::<f64>() / readings.len() as f64;
        CpuSummary {
            peak_cpu_pct,
            avg_cpu_pct,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<f64>> {
        // Readings are plain floats; a poisoned lock still holds a usable ring.
        self.readings
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
