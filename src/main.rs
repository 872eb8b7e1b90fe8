use anyhow::Result;
use hostguard::*;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .init();

    let app_config = config::AppConfig::load()?;

    let sampler: Arc<dyn sampler::Sampler> = Arc::new(sampler::SysinfoSampler::new(
        Duration::from_millis(app_config.sampler.sample_window_ms),
    ));
    let protected = guard::ProtectedSet::from_config(&app_config.protection);
    tracing::info!(
        protected_pids = protected.pid_count(),
        protected_names = protected.name_count(),
        "protection policy loaded"
    );
    let registry = Arc::new(snapshot_registry::SnapshotRegistry::new());
    let history = Arc::new(history::CpuHistory::for_window(
        app_config.watchdog.history_window(),
        app_config.watchdog.sampling_interval(),
    ));
    let reporter = Arc::new(reporter::LiveReporter::new(
        sampler.clone(),
        app_config.reporter.top_n,
        history.clone(),
    ));
    let commands = Arc::new(commands::CommandService::new(
        commands::CommandDeps {
            sampler: sampler.clone(),
            registry: registry.clone(),
            guard: guard::TerminationGuard::new(protected),
            host: Arc::new(host::SystemHost),
            reporter: reporter.clone(),
        },
        commands::CommandSettings::from(&app_config),
    ));

    let alerts_sent_total = Arc::new(AtomicU64::new(0));
    let (alert_tx, alert_rx) = mpsc::channel(app_config.watchdog.alert_channel_capacity);
    let dispatcher_handle = alerts::spawn_dispatcher(
        alert_rx,
        alerts::AlertDispatcherConfig::from(&app_config.alerts),
        alerts_sent_total.clone(),
    )?;

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let watchdog_handle = watchdog::spawn(
        watchdog::WatchdogDeps {
            sampler: sampler.clone(),
            alert_tx,
            history,
            shutdown_rx,
        },
        &app_config.watchdog,
    );

    let stats_handle = stats::spawn_stats_logger(
        registry,
        reporter,
        alerts_sent_total,
        Duration::from_secs(app_config.monitoring.stats_log_interval_secs),
    );

    let app = routes::app(commands);
    let addr = format!("{}:{}", app_config.server.host, app_config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(
        threshold_pct = app_config.watchdog.threshold_pct,
        "Listening on http://{}",
        addr
    );

    tokio::select! {
        result = axum::serve(listener, app) => {
            result?;
        }
        _ = async {
            #[cfg(unix)]
            {
                let mut sigterm = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                    Ok(s) => s,
                    Err(_) => {
                        let _ = tokio::signal::ctrl_c().await;
                        return;
                    }
                };
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
            }
            #[cfg(not(unix))]
            {
                let _ = tokio::signal::ctrl_c().await;
            }
        } => {
            tracing::info!("Received shutdown signal");
            let _ = shutdown_tx.send(());
            let _ = watchdog_handle.await;
            let _ = dispatcher_handle.await;
            stats_handle.abort();
        }
    }

    Ok(())
}
