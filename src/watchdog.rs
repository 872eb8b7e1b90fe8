// Threshold watchdog: samples on a fixed interval, debounces breaches, enforces a
// cooldown between alerts and hands alert events to the dispatcher.

use crate::config::WatchdogConfig;
use crate::history::CpuHistory;
use crate::models::AlertEvent;
use crate::ranker::rank;
use crate::sampler::{self, Sampler};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Duration, Instant, interval};
use tracing::Instrument;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogPhase {
    Normal,
    /// Counting consecutive breaches toward confirmation.
    Breaching,
    /// Recently alerted; further alerts suppressed until the cooldown ends.
    Cooling,
}

#[derive(Debug, Clone, Copy)]
pub struct AlertPolicy {
    pub threshold_pct: f64,
    pub confirmation_count: u32,
    pub cooldown: Duration,
}

impl From<&WatchdogConfig> for AlertPolicy {
    fn from(c: &WatchdogConfig) -> Self {
        Self {
            threshold_pct: c.threshold_pct,
            confirmation_count: c.confirmation_count,
            cooldown: c.cooldown(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Quiet,
    Alert,
}

/// Debounce and cooldown memory. Owned by the watchdog task alone.
#[derive(Debug, Clone, Default)]
pub struct AlertState {
    consecutive_breaches: u32,
    cooldown_until: Option<Instant>,
}

impl AlertState {
    /// Feeds one tick's host CPU reading. Breaches must be consecutive: any
    /// reading at or below the threshold clears the counter. Cooldown is tracked
    /// independently of the counter.
    pub fn observe(&mut self, total_cpu_pct: f64, now: Instant, policy: &AlertPolicy) -> Verdict {
        if total_cpu_pct.is_nan() || total_cpu_pct <= policy.threshold_pct {
            self.consecutive_breaches = 0;
            return Verdict::Quiet;
        }
        self.consecutive_breaches = self.consecutive_breaches.saturating_add(1);
        let cooled = self.cooldown_until.is_none_or(|until| now >= until);
        if self.consecutive_breaches >= policy.confirmation_count && cooled {
            self.cooldown_until = Some(now + policy.cooldown);
            self.consecutive_breaches = 0;
            return Verdict::Alert;
        }
        Verdict::Quiet
    }

    pub fn phase(&self, now: Instant) -> WatchdogPhase {
        if self.cooldown_until.is_some_and(|until| now < until) {
            WatchdogPhase::Cooling
        } else if self.consecutive_breaches > 0 {
            WatchdogPhase::Breaching
        } else {
            WatchdogPhase::Normal
        }
    }

    pub fn consecutive_breaches(&self) -> u32 {
        self.consecutive_breaches
    }

    pub fn cooldown_until(&self) -> Option<Instant> {
        self.cooldown_until
    }
}

pub struct WatchdogDeps {
    pub sampler: Arc<dyn Sampler>,
    pub alert_tx: mpsc::Sender<AlertEvent>,
    /// Receives every successful reading.
    pub history: Arc<CpuHistory>,
    pub shutdown_rx: oneshot::Receiver<()>,
}

/// Spawns the standing watchdog loop. A failed sample skips the tick without touching state.
pub fn spawn(deps: WatchdogDeps, config: &WatchdogConfig) -> tokio::task::JoinHandle<()> {
    let WatchdogDeps {
        sampler,
        alert_tx,
        history,
        mut shutdown_rx,
    } = deps;
    let policy = AlertPolicy::from(config);
    let sampling_interval = config.sampling_interval();
    let top_n = config.top_n_alert;

    let span = tracing::span!(
        tracing::Level::DEBUG,
        "watchdog",
        threshold_pct = policy.threshold_pct,
        confirmation_count = policy.confirmation_count
    );

    tokio::spawn(
        async move {
            let mut tick = interval(sampling_interval);
            tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            let mut state = AlertState::default();

            loop {
                tokio::select! {
                    _ = tick.tick() => {
                        let sample = match sampler::capture(sampler.clone()).await {
                            Ok(s) => s,
                            Err(e) => {
                                tracing::warn!(error = %e, operation = "capture", "watchdog sample failed; skipping tick");
                                continue;
                            }
                        };
                        history.push(sample.total_cpu_pct);
                        let now = Instant::now();
                        let verdict = state.observe(sample.total_cpu_pct, now, &policy);
                        tracing::debug!(
                            total_cpu_pct = sample.total_cpu_pct,
                            consecutive_breaches = state.consecutive_breaches(),
                            phase = ?state.phase(now),
                            "watchdog tick"
                        );
                        if verdict == Verdict::Alert {
                            let event = AlertEvent {
                                timestamp: sample.timestamp,
                                total_cpu_pct: sample.total_cpu_pct,
                                total_mem_pct: sample.total_mem_pct,
                                top: rank(&sample, top_n),
                            };
                            tracing::info!(
                                total_cpu_pct = event.total_cpu_pct,
                                cooldown_secs = policy.cooldown.as_secs(),
                                "CPU threshold alert raised"
                            );
                            if alert_tx.send(event).await.is_err() {
                                tracing::debug!("alert channel closed");
                            }
                        }
                    }
                    _ = &mut shutdown_rx => {
                        tracing::debug!("Watchdog shutting down");
                        break;
                    }
                }
            }
        }
        .instrument(span),
    )
}
