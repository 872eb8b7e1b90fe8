// Command surface: top-N listing, terminate-by-index and live status streams.
// Transports (HTTP/WS routes, chat bots) call into this; it owns no transport details.

use crate::config::AppConfig;
use crate::error::{CommandError, HostError, TerminateError};
use crate::guard::TerminationGuard;
use crate::host::HostControl;
use crate::models::{ProcessRef, Ranking, SessionKey};
use crate::ranker::rank;
use crate::reporter::{LiveReporter, StatusStream};
use crate::sampler::{self, Sampler};
use crate::snapshot_registry::SnapshotRegistry;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

#[derive(Debug, Clone)]
pub struct CommandSettings {
    pub top_n_query: usize,
    pub max_top_n: usize,
    pub snapshot_ttl: Duration,
    pub terminate_grace: Duration,
    pub status_interval: Duration,
    pub status_duration: Duration,
    pub min_status_interval: Duration,
    pub max_status_duration: Duration,
}

impl From<&AppConfig> for CommandSettings {
    fn from(c: &AppConfig) -> Self {
        Self {
            top_n_query: c.commands.top_n_query,
            max_top_n: c.commands.max_top_n,
            snapshot_ttl: Duration::from_secs(c.commands.snapshot_ttl_secs),
            terminate_grace: Duration::from_millis(c.commands.terminate_grace_ms),
            status_interval: c.reporter.interval(),
            status_duration: c.reporter.duration(),
            min_status_interval: Duration::from_millis(c.reporter.min_interval_ms),
            max_status_duration: Duration::from_secs(c.reporter.max_duration_secs),
        }
    }
}

/// Collaborators the command service is built from.
pub struct CommandDeps {
    pub sampler: Arc<dyn Sampler>,
    pub registry: Arc<SnapshotRegistry>,
    pub guard: TerminationGuard,
    pub host: Arc<dyn HostControl>,
    pub reporter: Arc<LiveReporter>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopReport {
    pub total_cpu_pct: f64,
    pub total_mem_pct: f64,
    pub ranking: Ranking,
    pub expires_in_secs: u64,
}

/// Outcome of a successful terminate request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Termination {
    #[serde(flatten)]
    pub process: ProcessRef,
    /// SIGKILL was needed: the process outlived the grace period, or the
    /// platform has no polite termination request.
    pub forced: bool,
}

pub struct CommandService {
    sampler: Arc<dyn Sampler>,
    registry: Arc<SnapshotRegistry>,
    guard: TerminationGuard,
    host: Arc<dyn HostControl>,
    reporter: Arc<LiveReporter>,
    settings: CommandSettings,
}

impl CommandService {
    pub fn new(deps: CommandDeps, settings: CommandSettings) -> Self {
        let CommandDeps {
            sampler,
            registry,
            guard,
            host,
            reporter,
        } = deps;
        Self {
            sampler,
            registry,
            guard,
            host,
            reporter,
            settings,
        }
    }

    pub fn settings(&self) -> &CommandSettings {
        &self.settings
    }

    pub fn registry(&self) -> &Arc<SnapshotRegistry> {
        &self.registry
    }

    pub fn reporter(&self) -> &Arc<LiveReporter> {
        &self.reporter
    }

    /// Samples, ranks and records the list as the session's terminate-by-index snapshot.
    #[instrument(skip(self), fields(operation = "request_top_n", session = %session_key))]
    pub async fn request_top_n(
        &self,
        session_key: SessionKey,
        n: Option<usize>,
    ) -> Result<TopReport, CommandError> {
        let n = n.unwrap_or(self.settings.top_n_query);
        if n == 0 || n > self.settings.max_top_n {
            return Err(CommandError::InvalidArgument(format!(
                "n must be in 1..={}, got {}",
                self.settings.max_top_n, n
            )));
        }
        let sample = sampler::capture(self.sampler.clone()).await?;
        let ranking = rank(&sample, n);
        let snapshot = self
            .registry
            .record(session_key, ranking, self.settings.snapshot_ttl)
            .await;
        tracing::debug!(entries = snapshot.ranking.len(), "top-N snapshot recorded");
        Ok(TopReport {
            total_cpu_pct: sample.total_cpu_pct,
            total_mem_pct: sample.total_mem_pct,
            ranking: snapshot.ranking,
            expires_in_secs: self.settings.snapshot_ttl.as_secs(),
        })
    }

    /// Terminates the process at 1-based `index` of the session's latest top-N list.
    /// The pid is re-checked against the live process table before signaling so a
    /// recycled pid is never hit. Failures are reported, never retried.
    #[instrument(skip(self), fields(operation = "request_terminate", session = %session_key))]
    pub async fn request_terminate(
        &self,
        session_key: &SessionKey,
        index: usize,
    ) -> Result<Termination, CommandError> {
        let target = self.registry.lookup(session_key, index).await?;
        if let Err(e) = self.guard.authorize(&target) {
            tracing::warn!(pid = target.pid, name = %target.name, "refused to terminate protected process");
            return Err(e.into());
        }

        match terminate_process(self.host.clone(), &target, self.settings.terminate_grace).await {
            Ok(forced) => {
                tracing::info!(pid = target.pid, name = %target.name, index, forced, "process terminated");
                Ok(Termination {
                    process: target,
                    forced,
                })
            }
            Err(e) => {
                tracing::warn!(pid = target.pid, index, kind = e.kind(), error = %e, "terminate failed");
                Err(e.into())
            }
        }
    }

    /// Starts (or restarts) the session's live status stream.
    #[instrument(skip(self), fields(operation = "request_status_stream", session = %session_key))]
    pub async fn request_status_stream(
        &self,
        session_key: SessionKey,
        interval: Option<Duration>,
        duration: Option<Duration>,
    ) -> Result<StatusStream, CommandError> {
        let interval = interval.unwrap_or(self.settings.status_interval);
        let duration = duration.unwrap_or(self.settings.status_duration);
        if interval < self.settings.min_status_interval {
            return Err(CommandError::InvalidArgument(format!(
                "interval must be at least {} ms",
                self.settings.min_status_interval.as_millis()
            )));
        }
        if duration.is_zero() || duration > self.settings.max_status_duration {
            return Err(CommandError::InvalidArgument(format!(
                "duration must be in 1..={} s",
                self.settings.max_status_duration.as_secs()
            )));
        }
        Ok(self.reporter.run(session_key, interval, duration).await)
    }

    pub async fn stop_status_stream(&self, session_key: &SessionKey) -> bool {
        self.reporter.stop(session_key).await
    }
}

const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// SIGTERM, then SIGKILL if `target` is still running once `grace` has passed.
/// Returns whether the kill was needed. The live name must match `target.name`
/// before the first signal; after it, a pid showing another name counts as exited.
pub async fn terminate_process(
    host: Arc<dyn HostControl>,
    target: &ProcessRef,
    grace: Duration,
) -> Result<bool, TerminateError> {
    let checked = target.clone();
    let requested = blocking(&host, target.pid, move |host| request_exit(host, &checked)).await??;

    if requested {
        if wait_for_exit(&host, target, grace).await? {
            return Ok(false);
        }
        tracing::warn!(pid = target.pid, name = %target.name, grace_ms = grace.as_millis() as u64, "process ignored SIGTERM; sending SIGKILL");
    } else {
        tracing::debug!(pid = target.pid, "no polite termination on this platform; killing");
    }
    let pid = target.pid;
    match blocking(&host, pid, move |host| host.signal_kill(pid)).await? {
        Ok(()) => Ok(true),
        // Exited between the last poll and the kill.
        Err(HostError::NotFound { .. }) => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Verifies the pid still names `target`, then asks it to exit. `Ok(false)` when
/// the platform cannot ask politely.
fn request_exit(host: &dyn HostControl, target: &ProcessRef) -> Result<bool, TerminateError> {
    let live_name = host
        .process_name(target.pid)
        .ok_or(HostError::NotFound { pid: target.pid })?;
    if live_name != target.name {
        return Err(TerminateError::PidReused {
            pid: target.pid,
            expected: target.name.clone(),
            found: live_name,
        });
    }
    match host.signal_terminate(target.pid) {
        Ok(()) => Ok(true),
        Err(HostError::Unsupported) => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Polls until `target` is gone or `grace` runs out; true if it exited.
async fn wait_for_exit(
    host: &Arc<dyn HostControl>,
    target: &ProcessRef,
    grace: Duration,
) -> Result<bool, TerminateError> {
    let deadline = tokio::time::Instant::now() + grace;
    loop {
        let pid = target.pid;
        let live = blocking(host, pid, move |host| host.process_name(pid)).await?;
        if live.as_deref() != Some(target.name.as_str()) {
            return Ok(true);
        }
        if tokio::time::Instant::now() >= deadline {
            return Ok(false);
        }
        tokio::time::sleep(EXIT_POLL_INTERVAL).await;
    }
}

/// Runs a host call on the blocking pool.
async fn blocking<T, F>(host: &Arc<dyn HostControl>, pid: u32, f: F) -> Result<T, TerminateError>
where
    T: Send + 'static,
    F: FnOnce(&dyn HostControl) -> T + Send + 'static,
{
    let host = host.clone();
    tokio::task::spawn_blocking(move || f(host.as_ref()))
        .await
        .map_err(|e| {
            TerminateError::Host(HostError::Io {
                pid,
                source: std::io::Error::other(e.to_string()),
            })
        })
}
