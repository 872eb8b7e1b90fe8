// Watchdog task: debounce, cooldown and sampling-failure tolerance end to end

mod common;

use common::{ScriptedSampler, sample, totals};
use hostguard::config::WatchdogConfig;
use hostguard::error::SamplingError;
use hostguard::history::CpuHistory;
use hostguard::models::AlertEvent;
use hostguard::watchdog::{self, WatchdogDeps};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Duration, sleep, timeout};

fn config() -> WatchdogConfig {
    WatchdogConfig {
        threshold_pct: 90.0,
        confirmation_count: 2,
        cooldown_secs: 300,
        sampling_interval_ms: 5000,
        top_n_alert: 3,
        alert_channel_capacity: 8,
        history_window_secs: 300,
    }
}

struct Running {
    alerts: mpsc::Receiver<AlertEvent>,
    shutdown: oneshot::Sender<()>,
    handle: tokio::task::JoinHandle<()>,
    history: Arc<CpuHistory>,
}

fn start(sampler: Arc<ScriptedSampler>) -> Running {
    let (alert_tx, alerts) = mpsc::channel(8);
    let (shutdown, shutdown_rx) = oneshot::channel();
    let history = Arc::new(CpuHistory::for_window(
        config().history_window(),
        config().sampling_interval(),
    ));
    let handle = watchdog::spawn(
        WatchdogDeps {
            sampler,
            alert_tx,
            history: history.clone(),
            shutdown_rx,
        },
        &config(),
    );
    Running {
        alerts,
        shutdown,
        handle,
        history,
    }
}

impl Running {
    async fn stop(mut self) -> Vec<AlertEvent> {
        let _ = self.shutdown.send(());
        self.handle.await.unwrap();
        let mut rest = Vec::new();
        while let Ok(a) = self.alerts.try_recv() {
            rest.push(a);
        }
        rest
    }
}

#[tokio::test(start_paused = true)]
async fn alert_fires_on_second_breach_with_that_ticks_top3() {
    let first = sample(95.0, &[(10, "warmup", 380.0)]);
    let second = sample(
        96.0,
        &[
            (21, "b", 40.0),
            (20, "hog", 300.0),
            (23, "d", 4.0),
            (22, "c", 20.0),
        ],
    );
    let sampler = Arc::new(ScriptedSampler::new(vec![Ok(first), Ok(second)]));
    let mut running = start(sampler);

    let alert = timeout(Duration::from_secs(60), running.alerts.recv())
        .await
        .expect("alert within a minute")
        .expect("channel open");
    assert_eq!(alert.total_cpu_pct, 96.0);
    assert_eq!(alert.total_mem_pct, 50.0);
    let pids: Vec<u32> = alert.top.entries.iter().map(|e| e.pid).collect();
    assert_eq!(pids, vec![20, 21, 22]);
    assert_eq!(alert.top.entries[0].cpu_pct, 75.0);

    assert!(running.stop().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn dip_below_threshold_resets_the_counter() {
    let sampler = Arc::new(ScriptedSampler::new(totals(&[95.0, 85.0, 96.0, 97.0])));
    let mut running = start(sampler.clone());

    let alert = timeout(Duration::from_secs(60), running.alerts.recv())
        .await
        .expect("alert")
        .expect("channel open");
    assert_eq!(alert.total_cpu_pct, 97.0, "fires on the 4th tick, not the 3rd");
    assert!(sampler.calls() >= 4);

    sleep(Duration::from_secs(30)).await;
    assert!(running.stop().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn sampling_failure_skips_tick_without_resetting_state() {
    let mut script = totals(&[95.0]);
    script.push(Err(SamplingError::Unavailable("proc table busy".into())));
    script.extend(totals(&[96.0]));
    let sampler = Arc::new(ScriptedSampler::new(script));
    let mut running = start(sampler);

    let alert = timeout(Duration::from_secs(60), running.alerts.recv())
        .await
        .expect("watchdog keeps running after a failed sample")
        .expect("channel open");
    assert_eq!(alert.total_cpu_pct, 96.0);
    running.stop().await;
}

#[tokio::test(start_paused = true)]
async fn continuous_breach_alerts_once_per_cooldown() {
    let sampler = Arc::new(ScriptedSampler::repeating(sample(99.0, &[(1, "spin", 396.0)])));
    let mut running = start(sampler);

    sleep(Duration::from_secs(200)).await;
    let mut seen = Vec::new();
    while let Ok(a) = running.alerts.try_recv() {
        seen.push(a);
    }
    assert_eq!(seen.len(), 1, "one alert inside the cooldown window");

    // Cooldown ends at t=305s; the next breaching tick fires again.
    sleep(Duration::from_secs(150)).await;
    let rest = running.stop().await;
    assert_eq!(rest.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn below_threshold_never_alerts() {
    let sampler = Arc::new(ScriptedSampler::repeating(sample(90.0, &[(1, "busy", 360.0)])));
    let running = start(sampler.clone());
    sleep(Duration::from_secs(120)).await;
    assert!(sampler.calls() > 10);
    assert!(running.stop().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn every_successful_reading_feeds_the_history() {
    let mut script = totals(&[30.0]);
    script.push(Err(SamplingError::Unavailable("transient".into())));
    script.extend(totals(&[40.0]));
    let sampler = Arc::new(ScriptedSampler::new(script));
    let running = start(sampler.clone());

    sleep(Duration::from_secs(60)).await;
    assert!(sampler.calls() > 3, "later ticks fail once the script is exhausted");
    let history = running.history.clone();
    assert_eq!(history.capacity(), 60);
    assert_eq!(history.len(), 2, "failed samples are not recorded");
    let summary = history.summary_or(0.0);
    assert_eq!(summary.peak_cpu_pct, 40.0);
    assert_eq!(summary.avg_cpu_pct, 35.0);
    running.stop().await;
}
