// Protected-entity policy for remediation requests

use crate::config::ProtectionConfig;
use crate::error::TerminateError;
use crate::models::ProcessRef;
use std::collections::HashSet;

/// PIDs and process names (case-insensitive) that may never be terminated.
#[derive(Debug, Clone, Default)]
pub struct ProtectedSet {
    pids: HashSet<u32>,
    names: HashSet<String>,
}

impl ProtectedSet {
    pub fn new<I, S>(pids: impl IntoIterator<Item = u32>, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            pids: pids.into_iter().collect(),
            names: names
                .into_iter()
                .map(|n| n.as_ref().trim().to_lowercase())
                .filter(|n| !n.is_empty())
                .collect(),
        }
    }

    /// Builds the set from config, adding the agent's own PID when `protect_self` is on.
    pub fn from_config(config: &ProtectionConfig) -> Self {
        let mut set = Self::new(config.pids.iter().copied(), &config.names);
        if config.protect_self {
            set.pids.insert(std::process::id());
        }
        set
    }

    pub fn contains_pid(&self, pid: u32) -> bool {
        self.pids.contains(&pid)
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.names.contains(&name.trim().to_lowercase())
    }

    pub fn pid_count(&self) -> usize {
        self.pids.len()
    }

    pub fn name_count(&self) -> usize {
        self.names.len()
    }
}

/// Pure allow/deny decision; never signals anything itself.
#[derive(Debug, Clone)]
pub struct TerminationGuard {
    protected: ProtectedSet,
}

impl TerminationGuard {
    pub fn new(protected: ProtectedSet) -> Self {
        Self { protected }
    }

    pub fn authorize(&self, target: &ProcessRef) -> Result<(), TerminateError> {
        if self.protected.contains_pid(target.pid) || self.protected.contains_name(&target.name) {
            return Err(TerminateError::Protected {
                pid: target.pid,
                name: target.name.clone(),
            });
        }
        Ok(())
    }

    pub fn protected(&self) -> &ProtectedSet {
        &self.protected
    }
}
