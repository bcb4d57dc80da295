// Rows and aggregates read from the sample store

use serde::{Deserialize, Serialize};

use super::{MetricKind, Severity};

/// One persisted sample row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredSample {
    pub id: i64,
    pub timestamp: f64,
    pub cpu: f64,
    pub ram: f64,
    /// Wall-clock insert time in milliseconds.
    pub created_at: i64,
}

/// (timestamp, cpu, ram) as returned by recent-window queries.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SamplePoint {
    pub timestamp: f64,
    pub cpu: f64,
    pub ram: f64,
}

/// Aggregates over a trailing window. All zero when the window is empty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub samples: u64,
    pub avg_cpu: f64,
    pub avg_ram: f64,
    pub max_cpu: f64,
    pub max_ram: f64,
    pub stddev_cpu: f64,
    pub stddev_ram: f64,
}

/// Mean/stddev reference for a trailing window. `ready` is false until enough rows exist.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Baseline {
    pub avg_cpu: f64,
    pub std_cpu: f64,
    pub avg_ram: f64,
    pub std_ram: f64,
    pub samples: u64,
    pub ready: bool,
}

impl Baseline {
    /// Fallback used before the window holds enough rows. Stddev of 1.0 keeps divisions finite.
    pub fn not_ready(samples: u64) -> Self {
        Self {
            avg_cpu: 0.0,
            std_cpu: 1.0,
            avg_ram: 0.0,
            std_ram: 1.0,
            samples,
            ready: false,
        }
    }
}

impl Default for Baseline {
    fn default() -> Self {
        Self::not_ready(0)
    }
}

/// Append-only anomaly audit row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnomalyLogRow {
    pub timestamp: f64,
    pub metric: MetricKind,
    pub value: f64,
    pub baseline: f64,
    pub stddev: f64,
    pub severity: Severity,
}
