// In-memory rolling windows, one per metric. Process-lifetime only, never persisted.

mod series;

pub use series::MetricSeries;

use crate::models::MetricKind;
use std::collections::BTreeMap;

/// Fixed-capacity window per metric. The pipeline keeps one short store for display
/// and the anomaly detector keeps a longer one for statistics.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    capacity: usize,
    series: BTreeMap<MetricKind, MetricSeries>,
}

impl HistoryStore {
    /// Empty windows for every metric.
    ///
    /// # Panics
    /// If `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        Self::with_initial(capacity, None)
    }

    /// Windows already full of `fill`, so a sparkline has full width from the first tick.
    pub fn prefilled(capacity: usize, fill: f64) -> Self {
        Self::with_initial(capacity, Some(fill))
    }

    fn with_initial(capacity: usize, fill: Option<f64>) -> Self {
        let series = MetricKind::ALL
            .iter()
            .map(|&m| {
                let s = match fill {
                    Some(v) => MetricSeries::filled(capacity, v),
                    None => MetricSeries::new(capacity),
                };
                (m, s)
            })
            .collect();
        Self { capacity, series }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn push(&mut self, metric: MetricKind, value: f64) {
        self.series
            .entry(metric)
            .or_insert_with(|| MetricSeries::new(self.capacity))
            .push(value);
    }

    pub fn series(&self, metric: MetricKind) -> Option<&MetricSeries> {
        self.series.get(&metric)
    }

    /// Oldest-first copy of a metric's window; empty for a metric never pushed.
    pub fn window(&self, metric: MetricKind) -> Vec<f64> {
        self.series
            .get(&metric)
            .map(MetricSeries::to_vec)
            .unwrap_or_default()
    }

    pub fn windows(&self) -> BTreeMap<MetricKind, Vec<f64>> {
        self.series.iter().map(|(m, s)| (*m, s.to_vec())).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn windows_are_independent_per_metric() {
        let mut store = HistoryStore::new(3);
        store.push(MetricKind::Cpu, 1.0);
        store.push(MetricKind::Cpu, 2.0);
        store.push(MetricKind::Ram, 9.0);
        assert_eq!(store.window(MetricKind::Cpu), vec![1.0, 2.0]);
        assert_eq!(store.window(MetricKind::Ram), vec![9.0]);
        assert!(store.window(MetricKind::Disk).is_empty());
    }

    #[test]
    fn prefilled_store_starts_full() {
        let mut store = HistoryStore::prefilled(4, 0.0);
        assert_eq!(store.window(MetricKind::NetUp), vec![0.0; 4]);
        store.push(MetricKind::NetUp, 7.0);
        assert_eq!(store.window(MetricKind::NetUp), vec![0.0, 0.0, 0.0, 7.0]);
    }
}
