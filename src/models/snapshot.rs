// Per-tick readings: host snapshot and top-N process samples

use serde::{Deserialize, Serialize};

use super::MetricKind;

/// One sampling tick's instantaneous readings. Timestamps are seconds since the epoch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub timestamp: f64,
    pub cpu_pct: f64,
    pub ram_pct: f64,
    pub disk_pct: f64,
    pub ram_used_mb: f64,
    pub ram_total_mb: f64,
    pub disk_free_gb: f64,
    pub disk_total_gb: f64,
    pub process_count: u32,
    /// Totals since boot.
    pub net_sent_total_mb: f64,
    pub net_recv_total_mb: f64,
    /// Derived from the previous reading; never negative.
    pub net_sent_speed_kbps: f64,
    pub net_recv_speed_kbps: f64,
}

impl Snapshot {
    /// All-zero snapshot used when the OS read fails.
    pub fn zeroed(timestamp: f64) -> Self {
        Self {
            timestamp,
            ..Self::default()
        }
    }

    pub fn ram_available_mb(&self) -> f64 {
        (self.ram_total_mb - self.ram_used_mb).max(0.0)
    }

    /// Scalar value for a tracked metric.
    pub fn value(&self, metric: MetricKind) -> f64 {
        match metric {
            MetricKind::Cpu => self.cpu_pct,
            MetricKind::Ram => self.ram_pct,
            MetricKind::Disk => self.disk_pct,
            MetricKind::NetUp => self.net_sent_speed_kbps,
            MetricKind::NetDown => self.net_recv_speed_kbps,
        }
    }

    /// Values for every tracked metric, in `MetricKind::ALL` order.
    pub fn metric_values(&self) -> Vec<(MetricKind, f64)> {
        MetricKind::ALL
            .iter()
            .map(|&m| (m, self.value(m)))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessSample {
    pub pid: u32,
    pub name: String,
    /// Normalized by logical core count, so 100 means the whole machine.
    pub cpu_pct: f64,
    pub ram_pct: f64,
    #[serde(default)]
    pub uptime_secs: u64,
}
