// Shared test helpers: scripted sampler, fake host, service builder

#![allow(dead_code)]

use hostguard::commands::{CommandDeps, CommandService, CommandSettings};
use hostguard::config::AppConfig;
use hostguard::error::{HostError, SamplingError};
use hostguard::guard::{ProtectedSet, TerminationGuard};
use hostguard::history::CpuHistory;
use hostguard::host::HostControl;
use hostguard::models::{ProcessSample, Sample};
use hostguard::reporter::LiveReporter;
use hostguard::sampler::Sampler;
use hostguard::snapshot_registry::SnapshotRegistry;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const CORES: u32 = 4;

/// Sample on a 4-core host; `procs` are `(pid, name, raw_cpu_pct)` with raw in percent of one core.
pub fn sample(total_cpu_pct: f64, procs: &[(u32, &str, f64)]) -> Sample {
    Sample {
        timestamp: 1_700_000_000_000,
        total_cpu_pct,
        total_mem_pct: 50.0,
        logical_cores: CORES,
        processes: procs
            .iter()
            .map(|&(pid, name, raw)| ProcessSample {
                pid,
                name: name.to_string(),
                raw_cpu_pct: raw,
                mem_pct: 2.0,
            })
            .collect(),
    }
}

/// Sample whose host total is exactly the normalized sum of its processes.
pub fn consistent_sample(procs: &[(u32, &str, f64)]) -> Sample {
    let total = procs.iter().map(|p| p.2).sum::<f64>() / CORES as f64;
    sample(total, procs)
}

/// Replays a fixed script; afterwards repeats `fallback` or fails.
pub struct ScriptedSampler {
    script: Mutex<VecDeque<Result<Sample, SamplingError>>>,
    fallback: Option<Sample>,
    calls: AtomicUsize,
}

impl ScriptedSampler {
    pub fn new(script: Vec<Result<Sample, SamplingError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn repeating(sample: Sample) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: Some(sample),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Sampler for ScriptedSampler {
    fn capture(&self) -> Result<Sample, SamplingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(next) = self.script.lock().unwrap().pop_front() {
            return next;
        }
        match &self.fallback {
            Some(s) => Ok(s.clone()),
            None => Err(SamplingError::Unavailable("script exhausted".into())),
        }
    }
}

pub fn totals(readings: &[f64]) -> Vec<Result<Sample, SamplingError>> {
    readings
        .iter()
        .map(|&t| Ok(sample(t, &[(100, "worker", t * CORES as f64)])))
        .collect()
}

/// In-memory process table. Signaled processes disappear, like a real exit,
/// unless marked with `ignore_term`.
#[derive(Default)]
pub struct FakeHost {
    names: Mutex<HashMap<u32, String>>,
    denied: Mutex<HashSet<u32>>,
    stubborn: Mutex<HashSet<u32>>,
    term_unsupported: AtomicBool,
    signaled: Mutex<Vec<u32>>,
    killed: Mutex<Vec<u32>>,
}

impl FakeHost {
    pub fn with_processes(procs: &[(u32, &str)]) -> Self {
        let host = Self::default();
        {
            let mut names = host.names.lock().unwrap();
            for &(pid, name) in procs {
                names.insert(pid, name.to_string());
            }
        }
        host
    }

    pub fn deny(&self, pid: u32) {
        self.denied.lock().unwrap().insert(pid);
    }

    pub fn exit(&self, pid: u32) {
        self.names.lock().unwrap().remove(&pid);
    }

    pub fn rename(&self, pid: u32, name: &str) {
        self.names.lock().unwrap().insert(pid, name.to_string());
    }

    /// SIGTERM is recorded but the process keeps running.
    pub fn ignore_term(&self, pid: u32) {
        self.stubborn.lock().unwrap().insert(pid);
    }

    /// Behave like a platform without a polite termination request.
    pub fn no_polite_term(&self) {
        self.term_unsupported.store(true, Ordering::SeqCst);
    }

    pub fn signaled(&self) -> Vec<u32> {
        self.signaled.lock().unwrap().clone()
    }

    pub fn killed(&self) -> Vec<u32> {
        self.killed.lock().unwrap().clone()
    }
}

impl HostControl for FakeHost {
    fn process_name(&self, pid: u32) -> Option<String> {
        self.names.lock().unwrap().get(&pid).cloned()
    }

    fn signal_terminate(&self, pid: u32) -> Result<(), HostError> {
        if self.term_unsupported.load(Ordering::SeqCst) {
            return Err(HostError::Unsupported);
        }
        if self.denied.lock().unwrap().contains(&pid) {
            return Err(HostError::PermissionDenied { pid });
        }
        let mut names = self.names.lock().unwrap();
        if !names.contains_key(&pid) {
            return Err(HostError::NotFound { pid });
        }
        self.signaled.lock().unwrap().push(pid);
        if !self.stubborn.lock().unwrap().contains(&pid) {
            names.remove(&pid);
        }
        Ok(())
    }

    fn signal_kill(&self, pid: u32) -> Result<(), HostError> {
        if self.denied.lock().unwrap().contains(&pid) {
            return Err(HostError::PermissionDenied { pid });
        }
        if self.names.lock().unwrap().remove(&pid).is_none() {
            return Err(HostError::NotFound { pid });
        }
        self.killed.lock().unwrap().push(pid);
        Ok(())
    }
}

pub fn protected() -> ProtectedSet {
    ProtectedSet::new([0, 1], ["systemd", "sshd"])
}

pub fn service(sampler: Arc<dyn Sampler>, host: Arc<FakeHost>) -> CommandService {
    let config = AppConfig::default();
    CommandService::new(
        CommandDeps {
            sampler: sampler.clone(),
            registry: Arc::new(SnapshotRegistry::new()),
            guard: TerminationGuard::new(protected()),
            host,
            reporter: Arc::new(LiveReporter::new(
                sampler,
                config.reporter.top_n,
                Arc::new(CpuHistory::new(60)),
            )),
        },
        CommandSettings::from(&config),
    )
}

/// Twelve processes on 4 cores, two of them idle. Ranked order:
/// 1 stress(200), 2 ffmpeg(201), 3 rustc(202), 4 systemd(1), 5 node(203), ...,
/// 10 bash(208), 11 idle-a(209), 12 idle-b(210). Host total is 89.5%.
pub fn busy_host() -> (Sample, Vec<(u32, &'static str)>) {
    let procs: Vec<(u32, &str, f64)> = vec![
        (1, "systemd", 40.0),
        (200, "stress", 90.0),
        (201, "ffmpeg", 70.0),
        (202, "rustc", 50.0),
        (203, "node", 40.0),
        (204, "postgres", 30.0),
        (205, "nginx", 20.0),
        (206, "redis", 10.0),
        (207, "cron", 6.0),
        (208, "bash", 2.0),
        (209, "idle-a", 0.0),
        (210, "idle-b", 0.0),
    ];
    let table = procs.iter().map(|&(pid, name, _)| (pid, name)).collect();
    (consistent_sample(&procs), table)
}
