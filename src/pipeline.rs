// One tick of the metrics pipeline: display histories -> anomaly detection ->
// threshold classification -> alert governing. No I/O; the worker owns persistence.

use crate::alerts::AlertGovernor;
use crate::anomaly::AnomalyDetector;
use crate::config::AppConfig;
use crate::history::HistoryStore;
use crate::models::{
    AlertEvent, AlertKey, AnomalyLogRow, AnomalyResult, Baseline, DashboardFrame, Direction,
    MetricKind, ProcessSample, Severity, Snapshot, Summary,
};
use crate::thresholds::ThresholdTable;
use std::collections::BTreeMap;

/// Output of one tick: the frame for renderers plus audit rows for alerts that surfaced.
#[derive(Debug, Clone)]
pub struct TickOutput {
    pub frame: DashboardFrame,
    pub anomaly_rows: Vec<AnomalyLogRow>,
}

/// Process-wide pipeline state. Created once at startup and owned by the sampling task.
pub struct Pipeline {
    display: HistoryStore,
    detector: AnomalyDetector,
    thresholds: ThresholdTable,
    governor: AlertGovernor,
    summary: Option<Summary>,
    baseline: Option<Baseline>,
}

impl Pipeline {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            display: HistoryStore::prefilled(config.history.display_window, 0.0),
            detector: AnomalyDetector::new(config.history.stats_window, &config.anomaly),
            thresholds: ThresholdTable::from_config(&config.thresholds),
            governor: AlertGovernor::new(config.alerts.cooldown_secs, config.alerts.log_capacity),
            summary: None,
            baseline: None,
        }
    }

    /// Latest stored-window aggregates, attached to every following frame.
    pub fn set_store_stats(&mut self, summary: Summary, baseline: Baseline) {
        self.summary = Some(summary);
        self.baseline = Some(baseline);
    }

    /// Alerts currently in the log, most recent first.
    pub fn alert_log(&self) -> Vec<AlertEvent> {
        self.governor.log_snapshot()
    }

    pub fn tick(
        &mut self,
        snapshot: Snapshot,
        processes: Vec<ProcessSample>,
        store_degraded: bool,
    ) -> TickOutput {
        let now = snapshot.timestamp;
        let values = snapshot.metric_values();
        for &(metric, value) in &values {
            self.display.push(metric, value);
        }

        let anomalies = self.detector.update(&values);

        let severities: BTreeMap<_, _> = MetricKind::PERCENT
            .iter()
            .map(|&m| (m, self.thresholds.classify(snapshot.value(m), m)))
            .collect();

        let mut new_alerts = Vec::new();
        let mut anomaly_rows = Vec::new();

        for (&metric, &(severity, _)) in &severities {
            if severity == Severity::Normal {
                continue;
            }
            let value = snapshot.value(metric);
            let message = format!("{} {} {:.1}%", metric.label(), severity, value);
            if let Some(event) =
                self.governor
                    .consider(AlertKey::threshold(metric), now, severity, value, message)
            {
                new_alerts.push(event);
            }
        }

        for (&metric, result) in anomalies.iter().filter(|(_, r)| r.flagged) {
            let severity = self.detector.severity(result);
            let message = anomaly_message(metric, result);
            if let Some(event) =
                self.governor
                    .consider(AlertKey::anomaly(metric), now, severity, result.value, message)
            {
                anomaly_rows.push(AnomalyLogRow {
                    timestamp: now,
                    metric,
                    value: result.value,
                    baseline: result.mean,
                    stddev: result.stddev,
                    severity,
                });
                new_alerts.push(event);
            }
        }

        tracing::debug!(
            timestamp = snapshot.timestamp,
            cpu = snapshot.cpu_pct,
            ram = snapshot.ram_pct,
            anomalies = anomalies.len(),
            new_alerts = new_alerts.len(),
            "tick processed"
        );

        TickOutput {
            frame: DashboardFrame {
                snapshot,
                processes,
                history: self.display.windows(),
                anomalies,
                severities,
                alerts: self.governor.log_snapshot(),
                new_alerts,
                store_degraded,
                summary: self.summary,
                baseline: self.baseline,
            },
            anomaly_rows,
        }
    }
}

fn anomaly_message(metric: MetricKind, result: &AnomalyResult) -> String {
    let kind = match result.direction() {
        Direction::Spike => "spike",
        Direction::Drop => "drop",
        Direction::Flat => "shift",
    };
    format!(
        "{} {} z={:+.2} (value {:.1}, mean {:.1}, sd {:.1})",
        metric.label(),
        kind,
        result.z_score,
        result.value,
        result.mean,
        result.stddev
    )
}
