use serde::Deserialize;
use std::str::FromStr;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub monitoring: MonitoringConfig,
    pub history: HistoryConfig,
    pub anomaly: AnomalyConfig,
    pub alerts: AlertsConfig,
    pub thresholds: ThresholdsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
    pub retention_days: u32,
    /// How often the retention sweep runs (real seconds).
    pub cleanup_interval_secs: u64,
    /// Optional cron expression for VACUUM, seconds first (e.g. "0 0 3 * * *" = 03:00 daily). Local time.
    pub vacuum_schedule: Option<String>,
    /// Run VACUUM every N seconds when vacuum_schedule is not set.
    pub vacuum_interval_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "data/guardian.db".into(),
            retention_days: 7,
            cleanup_interval_secs: 3600,
            vacuum_schedule: None,
            vacuum_interval_secs: 86_400,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    pub sample_interval_ms: u64,
    /// How often to log app stats and refresh the stored summary/baseline.
    pub stats_log_interval_secs: u64,
    pub top_processes: usize,
    /// Frames kept for slow rendering consumers before they lag.
    pub frame_channel_capacity: usize,
    pub writer_channel_capacity: usize,
    pub summary_window_minutes: u32,
    pub baseline_min_samples: u64,
    /// Hard cap on rows returned by recent-window queries.
    pub recent_row_limit: u32,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            sample_interval_ms: 1000,
            stats_log_interval_secs: 60,
            top_processes: 8,
            frame_channel_capacity: 16,
            writer_channel_capacity: 64,
            summary_window_minutes: 60,
            baseline_min_samples: 10,
            recent_row_limit: 3600,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Sparkline length.
    pub display_window: usize,
    /// Statistics window for anomaly detection; must be at least display_window.
    pub stats_window: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            display_window: 24,
            stats_window: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnomalyConfig {
    pub min_samples: usize,
    pub z_threshold: f64,
    /// Below this stddev the window counts as flat and z is reported as 0.
    pub flat_epsilon: f64,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            min_samples: 30,
            z_threshold: 3.0,
            flat_epsilon: 0.01,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AlertsConfig {
    pub cooldown_secs: u64,
    pub log_capacity: usize,
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            cooldown_secs: 60,
            log_capacity: 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdBand {
    pub warning: f64,
    pub critical: f64,
}

impl ThresholdBand {
    pub const FALLBACK: ThresholdBand = ThresholdBand {
        warning: 70.0,
        critical: 85.0,
    };
}

/// Per-kind bands. A table may set only one edge; the other keeps that kind's default.
#[derive(Debug, Clone, Deserialize)]
#[serde(from = "RawThresholds")]
pub struct ThresholdsConfig {
    pub cpu: ThresholdBand,
    pub ram: ThresholdBand,
    pub disk: ThresholdBand,
}

#[derive(Debug, Default, Deserialize)]
struct PartialBand {
    warning: Option<f64>,
    critical: Option<f64>,
}

impl PartialBand {
    fn or(self, default: ThresholdBand) -> ThresholdBand {
        ThresholdBand {
            warning: self.warning.unwrap_or(default.warning),
            critical: self.critical.unwrap_or(default.critical),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawThresholds {
    cpu: PartialBand,
    ram: PartialBand,
    disk: PartialBand,
}

impl From<RawThresholds> for ThresholdsConfig {
    fn from(raw: RawThresholds) -> Self {
        let defaults = ThresholdsConfig::default();
        Self {
            cpu: raw.cpu.or(defaults.cpu),
            ram: raw.ram.or(defaults.ram),
            disk: raw.disk.or(defaults.disk),
        }
    }
}

impl Default for ThresholdsConfig {
    fn default() -> Self {
        Self {
            cpu: ThresholdBand {
                warning: 60.0,
                critical: 85.0,
            },
            ram: ThresholdBand::FALLBACK,
            disk: ThresholdBand {
                warning: 70.0,
                critical: 90.0,
            },
        }
    }
}

impl AppConfig {
    /// Reads `CONFIG_FILE` (default `config.toml`). A missing default file means built-in
    /// defaults; a named file that cannot be read is an error. `GUARDIAN_DB_PATH` overrides
    /// `database.path`.
    pub fn load() -> anyhow::Result<Self> {
        let mut config = match std::env::var("CONFIG_FILE") {
            Ok(path) => Self::load_from_str(&std::fs::read_to_string(&path)?)?,
            Err(_) => match std::fs::read_to_string("config.toml") {
                Ok(s) => Self::load_from_str(&s)?,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    tracing::info!("config.toml not found, using defaults");
                    Self::default()
                }
                Err(e) => return Err(e.into()),
            },
        };
        if let Ok(path) = std::env::var("GUARDIAN_DB_PATH") {
            config.database.path = path;
            config.validate()?;
        }
        Ok(config)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            !self.database.path.is_empty(),
            "database.path must be non-empty"
        );
        anyhow::ensure!(
            self.database.retention_days > 0,
            "database.retention_days must be > 0, got {}",
            self.database.retention_days
        );
        anyhow::ensure!(
            self.database.cleanup_interval_secs > 0,
            "database.cleanup_interval_secs must be > 0, got {}",
            self.database.cleanup_interval_secs
        );
        anyhow::ensure!(
            self.database.vacuum_interval_secs > 0,
            "database.vacuum_interval_secs must be > 0, got {}",
            self.database.vacuum_interval_secs
        );
        if let Some(ref schedule) = self.database.vacuum_schedule {
            anyhow::ensure!(
                cron::Schedule::from_str(schedule).is_ok(),
                "database.vacuum_schedule is not a valid cron expression: {}",
                schedule
            );
        }
        anyhow::ensure!(
            self.monitoring.sample_interval_ms > 0,
            "monitoring.sample_interval_ms must be > 0, got {}",
            self.monitoring.sample_interval_ms
        );
        anyhow::ensure!(
            self.monitoring.stats_log_interval_secs > 0,
            "monitoring.stats_log_interval_secs must be > 0, got {}",
            self.monitoring.stats_log_interval_secs
        );
        anyhow::ensure!(
            self.monitoring.frame_channel_capacity > 0,
            "monitoring.frame_channel_capacity must be > 0, got {}",
            self.monitoring.frame_channel_capacity
        );
        anyhow::ensure!(
            self.monitoring.writer_channel_capacity > 0,
            "monitoring.writer_channel_capacity must be > 0, got {}",
            self.monitoring.writer_channel_capacity
        );
        anyhow::ensure!(
            self.monitoring.summary_window_minutes > 0,
            "monitoring.summary_window_minutes must be > 0, got {}",
            self.monitoring.summary_window_minutes
        );
        anyhow::ensure!(
            self.monitoring.recent_row_limit > 0,
            "monitoring.recent_row_limit must be > 0, got {}",
            self.monitoring.recent_row_limit
        );
        anyhow::ensure!(
            self.history.display_window > 0,
            "history.display_window must be > 0, got {}",
            self.history.display_window
        );
        anyhow::ensure!(
            self.history.stats_window >= self.history.display_window,
            "history.stats_window ({}) must be >= history.display_window ({})",
            self.history.stats_window,
            self.history.display_window
        );
        anyhow::ensure!(
            self.anomaly.min_samples > 0 && self.anomaly.min_samples <= self.history.stats_window,
            "anomaly.min_samples must be in 1..={}, got {}",
            self.history.stats_window,
            self.anomaly.min_samples
        );
        anyhow::ensure!(
            self.anomaly.z_threshold > 0.0,
            "anomaly.z_threshold must be > 0, got {}",
            self.anomaly.z_threshold
        );
        anyhow::ensure!(
            self.anomaly.flat_epsilon > 0.0,
            "anomaly.flat_epsilon must be > 0, got {}",
            self.anomaly.flat_epsilon
        );
        anyhow::ensure!(
            self.alerts.log_capacity > 0,
            "alerts.log_capacity must be > 0, got {}",
            self.alerts.log_capacity
        );
        for (name, band) in [
            ("cpu", self.thresholds.cpu),
            ("ram", self.thresholds.ram),
            ("disk", self.thresholds.disk),
        ] {
            anyhow::ensure!(
                (0.0..=100.0).contains(&band.warning) && (0.0..=100.0).contains(&band.critical),
                "thresholds.{} must lie within 0..=100, got {:?}",
                name,
                band
            );
            anyhow::ensure!(
                band.warning <= band.critical,
                "thresholds.{}.warning ({}) must be <= critical ({})",
                name,
                band.warning,
                band.critical
            );
        }
        Ok(())
    }
}
