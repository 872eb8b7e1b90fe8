// Normalized top-N process view

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedProcess {
    pub pid: u32,
    pub name: String,
    /// Share of total host CPU, 0..=100.
    pub cpu_pct: f64,
}

/// Entries sorted by `cpu_pct` descending, ties by ascending pid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ranking {
    pub entries: Vec<RankedProcess>,
}

impl Ranking {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry at a 1-based position, as shown to users.
    pub fn get(&self, index: usize) -> Option<&RankedProcess> {
        index.checked_sub(1).and_then(|i| self.entries.get(i))
    }

    pub fn total_cpu_pct(&self) -> f64 {
        self.entries.iter().map(|e| e.cpu_pct).sum()
    }
}

/// A process as referenced by a remediation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessRef {
    pub pid: u32,
    pub name: String,
}

impl From<&RankedProcess> for ProcessRef {
    fn from(p: &RankedProcess) -> Self {
        Self {
            pid: p.pid,
            name: p.name.clone(),
        }
    }
}
