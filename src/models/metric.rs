// Metric kinds and severity bands

use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of metrics tracked by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    Cpu,
    Ram,
    Disk,
    NetUp,
    NetDown,
}

impl MetricKind {
    pub const ALL: [MetricKind; 5] = [
        MetricKind::Cpu,
        MetricKind::Ram,
        MetricKind::Disk,
        MetricKind::NetUp,
        MetricKind::NetDown,
    ];

    /// Metrics whose instantaneous value is a percentage and gets a severity band.
    pub const PERCENT: [MetricKind; 3] = [MetricKind::Cpu, MetricKind::Ram, MetricKind::Disk];

    /// Stable key used for cooldown bookkeeping and the anomaly audit table.
    pub fn as_str(self) -> &'static str {
        match self {
            MetricKind::Cpu => "cpu",
            MetricKind::Ram => "ram",
            MetricKind::Disk => "disk",
            MetricKind::NetUp => "net_up",
            MetricKind::NetDown => "net_down",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        MetricKind::ALL.into_iter().find(|m| m.as_str() == s)
    }

    pub fn label(self) -> &'static str {
        match self {
            MetricKind::Cpu => "CPU",
            MetricKind::Ram => "RAM",
            MetricKind::Disk => "Disk",
            MetricKind::NetUp => "Upload",
            MetricKind::NetDown => "Download",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity band; ordering is NORMAL < WARNING < CRITICAL.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Normal,
    Warning,
    Critical,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Normal => "normal",
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        }
    }

    /// Parse a stored severity; anything unrecognized reads back as `Normal`.
    pub fn from_db(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "warning" => Severity::Warning,
            "critical" => Severity::Critical,
            _ => Severity::Normal,
        }
    }

    pub fn color_hint(self) -> ColorHint {
        match self {
            Severity::Normal => ColorHint::Green,
            Severity::Warning => ColorHint::Yellow,
            Severity::Critical => ColorHint::Red,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Normal => "NORMAL",
            Severity::Warning => "WARNING",
            Severity::Critical => "CRITICAL",
        })
    }
}

/// Presentation hint only; renderers decide what the colors look like.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorHint {
    Green,
    Yellow,
    Red,
}
