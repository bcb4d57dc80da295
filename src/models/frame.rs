// Per-tick output handed to rendering consumers

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{
    AlertEvent, AnomalyResult, Baseline, ColorHint, MetricKind, ProcessSample, Severity, Snapshot,
    Summary,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardFrame {
    pub snapshot: Snapshot,
    pub processes: Vec<ProcessSample>,
    /// Display windows, oldest first.
    pub history: BTreeMap<MetricKind, Vec<f64>>,
    /// Empty for metrics still warming up.
    pub anomalies: BTreeMap<MetricKind, AnomalyResult>,
    pub severities: BTreeMap<MetricKind, (Severity, ColorHint)>,
    /// Most recent first.
    pub alerts: Vec<AlertEvent>,
    /// Alerts that surfaced on this tick.
    pub new_alerts: Vec<AlertEvent>,
    /// Set when the last persistence command failed.
    pub store_degraded: bool,
    pub summary: Option<Summary>,
    pub baseline: Option<Baseline>,
}

impl DashboardFrame {
    /// Worst severity across the classified metrics.
    pub fn overall_severity(&self) -> Severity {
        self.severities
            .values()
            .map(|(s, _)| *s)
            .max()
            .unwrap_or_default()
    }

    /// Peak of a display window, used to scale throughput sparklines. 1.0 when idle.
    pub fn peak(&self, metric: MetricKind) -> f64 {
        let peak = self
            .history
            .get(&metric)
            .map(|w| w.iter().copied().fold(0.0_f64, f64::max))
            .unwrap_or(0.0);
        if peak > 0.0 { peak } else { 1.0 }
    }
}
