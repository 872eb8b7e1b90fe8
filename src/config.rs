use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub watchdog: WatchdogConfig,
    pub sampler: SamplerConfig,
    pub commands: CommandsConfig,
    pub reporter: ReporterConfig,
    pub protection: ProtectionConfig,
    pub alerts: AlertsConfig,
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8090,
            host: "127.0.0.1".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WatchdogConfig {
    /// Host CPU percent that counts as a breach when exceeded.
    pub threshold_pct: f64,
    /// Consecutive breaching ticks required before alerting.
    pub confirmation_count: u32,
    /// Minimum time between two alerts.
    pub cooldown_secs: u64,
    pub sampling_interval_ms: u64,
    /// Number of processes attached to an alert.
    pub top_n_alert: usize,
    /// Buffered alerts between the watchdog and the dispatcher.
    pub alert_channel_capacity: usize,
    /// Span of host CPU history kept for status peak/average.
    pub history_window_secs: u64,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            threshold_pct: 90.0,
            confirmation_count: 2,
            cooldown_secs: 300,
            sampling_interval_ms: 5000,
            top_n_alert: 3,
            alert_channel_capacity: 16,
            history_window_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    /// Measurement window of one capture (CPU usage is a delta over this window).
    pub sample_window_ms: u64,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            sample_window_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CommandsConfig {
    /// Default list length for a top-N request.
    pub top_n_query: usize,
    /// Upper bound a caller may ask for.
    pub max_top_n: usize,
    /// How long a top-N list stays valid for terminate-by-index.
    pub snapshot_ttl_secs: u64,
    /// Time a process gets to exit after SIGTERM before it is killed.
    pub terminate_grace_ms: u64,
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            top_n_query: 10,
            max_top_n: 50,
            snapshot_ttl_secs: 600,
            terminate_grace_ms: 3000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReporterConfig {
    pub interval_ms: u64,
    pub duration_secs: u64,
    pub min_interval_ms: u64,
    pub max_duration_secs: u64,
    /// Processes listed per status update.
    pub top_n: usize,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            interval_ms: 2000,
            duration_secs: 300,
            min_interval_ms: 1000,
            max_duration_secs: 3600,
            top_n: 3,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProtectionConfig {
    pub pids: Vec<u32>,
    /// Matched case-insensitively against the process name.
    pub names: Vec<String>,
    /// Also protect the agent's own PID.
    pub protect_self: bool,
}

impl Default for ProtectionConfig {
    fn default() -> Self {
        Self {
            pids: vec![0, 1],
            names: [
                "systemd",
                "init",
                "kthreadd",
                "launchd",
                "kernel_task",
                "sshd",
                "dbus-daemon",
                "System",
                "System Idle Process",
                "Registry",
                "MemCompression",
                "smss.exe",
                "csrss.exe",
                "wininit.exe",
                "winlogon.exe",
                "services.exe",
                "lsass.exe",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            protect_self: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AlertsConfig {
    /// Discord-compatible webhook; alerts are only logged when unset.
    pub webhook_url: Option<String>,
    pub webhook_timeout_secs: u64,
    pub footer: String,
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            webhook_timeout_secs: 10,
            footer: "Host Guardian".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    /// How often to log app stats (active streams, snapshots, alerts) at INFO level.
    pub stats_log_interval_secs: u64,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            stats_log_interval_secs: 300,
        }
    }
}

impl WatchdogConfig {
    pub fn sampling_interval(&self) -> Duration {
        Duration::from_millis(self.sampling_interval_ms)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }

    pub fn history_window(&self) -> Duration {
        Duration::from_secs(self.history_window_secs)
    }
}

impl ReporterConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.duration_secs)
    }
}

impl AppConfig {
    /// Reads `$CONFIG_FILE` (default `config.toml`); a missing file means all defaults.
    /// `CPU_ALERT_WEBHOOK` and `HOSTGUARD_PORT` override the file.
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let mut config: AppConfig = match std::fs::read_to_string(&path) {
            Ok(s) => toml::from_str(&s)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path, "config file not found; using defaults");
                AppConfig::default()
            }
            Err(e) => return Err(anyhow::anyhow!("reading {}: {}", path, e)),
        };
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> anyhow::Result<()> {
        if let Ok(url) = std::env::var("CPU_ALERT_WEBHOOK") {
            self.alerts.webhook_url = Some(url).filter(|u| !u.trim().is_empty());
        }
        if let Ok(port) = std::env::var("HOSTGUARD_PORT") {
            self.server.port = port
                .parse()
                .map_err(|e| anyhow::anyhow!("HOSTGUARD_PORT {:?}: {}", port, e))?;
        }
        Ok(())
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        anyhow::ensure!(
            self.watchdog.threshold_pct > 0.0 && self.watchdog.threshold_pct <= 100.0,
            "watchdog.threshold_pct must be in (0, 100], got {}",
            self.watchdog.threshold_pct
        );
        anyhow::ensure!(
            self.watchdog.confirmation_count > 0,
            "watchdog.confirmation_count must be > 0, got {}",
            self.watchdog.confirmation_count
        );
        anyhow::ensure!(
            self.watchdog.sampling_interval_ms > 0,
            "watchdog.sampling_interval_ms must be > 0, got {}",
            self.watchdog.sampling_interval_ms
        );
        anyhow::ensure!(
            self.watchdog.top_n_alert > 0,
            "watchdog.top_n_alert must be > 0, got {}",
            self.watchdog.top_n_alert
        );
        anyhow::ensure!(
            self.watchdog.alert_channel_capacity > 0,
            "watchdog.alert_channel_capacity must be > 0, got {}",
            self.watchdog.alert_channel_capacity
        );
        anyhow::ensure!(
            self.watchdog.history_window_secs > 0,
            "watchdog.history_window_secs must be > 0, got {}",
            self.watchdog.history_window_secs
        );
        anyhow::ensure!(
            self.sampler.sample_window_ms < self.watchdog.sampling_interval_ms,
            "sampler.sample_window_ms ({}) must be shorter than watchdog.sampling_interval_ms ({})",
            self.sampler.sample_window_ms,
            self.watchdog.sampling_interval_ms
        );
        anyhow::ensure!(
            self.commands.top_n_query > 0 && self.commands.top_n_query <= self.commands.max_top_n,
            "commands.top_n_query must be in 1..={}, got {}",
            self.commands.max_top_n,
            self.commands.top_n_query
        );
        anyhow::ensure!(
            self.commands.snapshot_ttl_secs > 0,
            "commands.snapshot_ttl_secs must be > 0, got {}",
            self.commands.snapshot_ttl_secs
        );
        anyhow::ensure!(
            self.reporter.min_interval_ms > 0,
            "reporter.min_interval_ms must be > 0, got {}",
            self.reporter.min_interval_ms
        );
        anyhow::ensure!(
            self.commands.terminate_grace_ms > 0,
            "commands.terminate_grace_ms must be > 0, got {}",
            self.commands.terminate_grace_ms
        );
        anyhow::ensure!(
            self.sampler.sample_window_ms < self.reporter.min_interval_ms,
            "sampler.sample_window_ms ({}) must be shorter than reporter.min_interval_ms ({})",
            self.sampler.sample_window_ms,
            self.reporter.min_interval_ms
        );
        anyhow::ensure!(
            self.reporter.interval_ms >= self.reporter.min_interval_ms,
            "reporter.interval_ms must be >= reporter.min_interval_ms ({}), got {}",
            self.reporter.min_interval_ms,
            self.reporter.interval_ms
        );
        anyhow::ensure!(
            self.reporter.duration_secs > 0
                && self.reporter.duration_secs <= self.reporter.max_duration_secs,
            "reporter.duration_secs must be in 1..={}, got {}",
            self.reporter.max_duration_secs,
            self.reporter.duration_secs
        );
        anyhow::ensure!(
            self.reporter.top_n > 0,
            "reporter.top_n must be > 0, got {}",
            self.reporter.top_n
        );
        if let Some(url) = &self.alerts.webhook_url {
            anyhow::ensure!(
                url.starts_with("http://") || url.starts_with("https://"),
                "alerts.webhook_url must be an http(s) URL, got {:?}",
                url
            );
        }
        anyhow::ensure!(
            self.alerts.webhook_timeout_secs > 0,
            "alerts.webhook_timeout_secs must be > 0, got {}",
            self.alerts.webhook_timeout_secs
        );
        anyhow::ensure!(
            self.monitoring.stats_log_interval_secs > 0,
            "monitoring.stats_log_interval_secs must be > 0, got {}",
            self.monitoring.stats_log_interval_secs
        );
        Ok(())
    }
}
