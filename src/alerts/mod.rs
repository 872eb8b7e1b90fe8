// Alert delivery: the watchdog hands AlertEvents over a channel; this task logs
// each one and, when configured, posts it to a webhook. Delivery failures are
// logged and dropped.

pub mod format;
mod webhook;

pub use webhook::WebhookNotifier;

use crate::config::AlertsConfig;
use crate::models::AlertEvent;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Debug, Clone)]
pub struct AlertDispatcherConfig {
    pub webhook_url: Option<String>,
    pub webhook_timeout: Duration,
    pub footer: String,
}

impl From<&AlertsConfig> for AlertDispatcherConfig {
    fn from(c: &AlertsConfig) -> Self {
        Self {
            webhook_url: c.webhook_url.clone(),
            webhook_timeout: Duration::from_secs(c.webhook_timeout_secs),
            footer: c.footer.clone(),
        }
    }
}

/// Spawns the dispatcher. Exits once every sender is dropped and the queue is drained.
pub fn spawn_dispatcher(
    mut alert_rx: mpsc::Receiver<AlertEvent>,
    config: AlertDispatcherConfig,
    alerts_sent_total: Arc<AtomicU64>,
) -> anyhow::Result<tokio::task::JoinHandle<()>> {
    let webhook = match config.webhook_url.as_deref() {
        Some(url) => Some(WebhookNotifier::new(
            url,
            config.webhook_timeout,
            config.footer.clone(),
        )?),
        None => {
            tracing::info!("no alert webhook configured; alerts are logged only");
            None
        }
    };

    Ok(tokio::spawn(async move {
        while let Some(event) = alert_rx.recv().await {
            tracing::warn!(
                total_cpu_pct = event.total_cpu_pct,
                total_mem_pct = event.total_mem_pct,
                top = %format::top_summary(&event.top),
                "High CPU detected"
            );
            if let Some(webhook) = &webhook {
                if let Err(e) = webhook.send(&event).await {
                    tracing::warn!(error = %e, operation = "send_webhook", "alert webhook delivery failed");
                    continue;
                }
                tracing::debug!(operation = "send_webhook", "alert webhook delivered");
            }
            alerts_sent_total.fetch_add(1, Ordering::Relaxed);
        }
        tracing::debug!("Alert dispatcher shutting down");
    }))
}
