// Rolling z-score anomaly detection over per-metric statistics windows.
// Warm-up is gated per metric: a metric reports nothing until its own window holds min_samples.

use crate::config::AnomalyConfig;
use crate::history::HistoryStore;
use crate::models::{AnomalyResult, MetricKind, Severity};
use std::collections::BTreeMap;

/// Population mean and standard deviation. `None` for an empty slice.
pub fn population_stats(values: &[f64]) -> Option<(f64, f64)> {
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    Some((mean, variance.sqrt()))
}

pub struct AnomalyDetector {
    windows: HistoryStore,
    min_samples: usize,
    z_threshold: f64,
    flat_epsilon: f64,
}

impl AnomalyDetector {
    pub fn new(window: usize, config: &AnomalyConfig) -> Self {
        Self {
            windows: HistoryStore::new(window),
            min_samples: config.min_samples,
            z_threshold: config.z_threshold,
            flat_epsilon: config.flat_epsilon,
        }
    }

    pub fn z_threshold(&self) -> f64 {
        self.z_threshold
    }

    /// Pushes each value into its window and scores it against the updated window.
    /// Metrics still warming up are absent from the result.
    pub fn update(&mut self, values: &[(MetricKind, f64)]) -> BTreeMap<MetricKind, AnomalyResult> {
        let mut out = BTreeMap::new();
        for &(metric, value) in values {
            self.windows.push(metric, value);
            if let Some(result) = self.score(metric, value) {
                out.insert(metric, result);
            }
        }
        out
    }

    fn score(&self, metric: MetricKind, value: f64) -> Option<AnomalyResult> {
        let series = self.windows.series(metric)?;
        if series.len() < self.min_samples {
            return None;
        }
        let (mean, stddev) = population_stats(&series.to_vec())?;
        if stddev < self.flat_epsilon {
            return Some(AnomalyResult {
                value,
                mean,
                stddev,
                z_score: 0.0,
                flagged: false,
            });
        }
        let z_score = (value - mean) / stddev;
        Some(AnomalyResult {
            value,
            mean,
            stddev,
            z_score,
            flagged: z_score.abs() > self.z_threshold,
        })
    }

    /// Audit severity for a flagged result: critical beyond twice the threshold.
    pub fn severity(&self, result: &AnomalyResult) -> Severity {
        if !result.flagged {
            Severity::Normal
        } else if result.z_score.abs() > self.z_threshold * 2.0 {
            Severity::Critical
        } else {
            Severity::Warning
        }
    }

    pub fn samples(&self, metric: MetricKind) -> usize {
        self.windows.series(metric).map_or(0, |s| s.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Direction;

    fn config() -> AnomalyConfig {
        AnomalyConfig {
            min_samples: 30,
            z_threshold: 3.0,
            flat_epsilon: 0.01,
        }
    }

    fn feed(det: &mut AnomalyDetector, v: f64) -> Option<AnomalyResult> {
        det.update(&[(MetricKind::Cpu, v)]).remove(&MetricKind::Cpu)
    }

    #[test]
    fn population_stats_matches_hand_computation() {
        let (mean, sd) = population_stats(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert_eq!(mean, 5.0);
        assert_eq!(sd, 2.0);
        assert!(population_stats(&[]).is_none());
    }

    #[test]
    fn nothing_reported_before_min_samples() {
        let mut det = AnomalyDetector::new(60, &config());
        for i in 0..29 {
            let v = if i == 28 { 1000.0 } else { 10.0 + (i % 3) as f64 };
            assert!(feed(&mut det, v).is_none(), "tick {} reported during warm-up", i + 1);
        }
        // 30th value activates detection
        assert!(feed(&mut det, 11.0).is_some());
    }

    #[test]
    fn flat_signal_never_flags() {
        let mut det = AnomalyDetector::new(60, &config());
        for _ in 0..120 {
            if let Some(r) = feed(&mut det, 42.0) {
                assert!(!r.flagged);
                assert_eq!(r.z_score, 0.0);
            }
        }
    }

    #[test]
    fn spike_after_mixed_window_is_flagged() {
        let mut det = AnomalyDetector::new(60, &config());
        for _ in 0..29 {
            feed(&mut det, 50.0);
        }
        let cycle = [10.0, 12.0, 11.0];
        for i in 0..31 {
            feed(&mut det, cycle[i % 3]);
        }
        let r = feed(&mut det, 95.0).unwrap();
        assert!(r.z_score > 3.0, "z = {}", r.z_score);
        assert!(r.flagged);
        assert_eq!(r.direction(), Direction::Spike);
        assert_eq!(det.severity(&r), Severity::Warning);
    }

    #[test]
    fn drop_has_negative_direction() {
        let mut det = AnomalyDetector::new(60, &config());
        for i in 0..40 {
            feed(&mut det, 80.0 + (i % 2) as f64);
        }
        let r = feed(&mut det, 5.0).unwrap();
        assert!(r.flagged);
        assert_eq!(r.direction(), Direction::Drop);
        assert_eq!(det.severity(&r), Severity::Critical);
    }
}
