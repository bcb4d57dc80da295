// Structured alert events; formatting is left to the renderer

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{MetricKind, Severity};

/// Which detection mechanism raised the alert. Each source has its own cooldown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSource {
    Threshold,
    Anomaly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertKey {
    pub source: AlertSource,
    pub metric: MetricKind,
}

impl AlertKey {
    pub fn threshold(metric: MetricKind) -> Self {
        Self {
            source: AlertSource::Threshold,
            metric,
        }
    }

    pub fn anomaly(metric: MetricKind) -> Self {
        Self {
            source: AlertSource::Anomaly,
            metric,
        }
    }
}

impl fmt::Display for AlertKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let source = match self.source {
            AlertSource::Threshold => "threshold",
            AlertSource::Anomaly => "anomaly",
        };
        write!(f, "{}:{}", source, self.metric)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertEvent {
    pub key: AlertKey,
    pub severity: Severity,
    pub value: f64,
    /// Plain text, no markup (e.g. "CPU CRITICAL 91.2%").
    pub message: String,
    /// Seconds since the epoch.
    pub first_fired_at: f64,
}
