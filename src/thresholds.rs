// Warning/critical bands per metric kind

use crate::config::{ThresholdBand, ThresholdsConfig};
use crate::models::{ColorHint, MetricKind, Severity};
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct ThresholdTable {
    bands: HashMap<MetricKind, ThresholdBand>,
    fallback: ThresholdBand,
}

impl Default for ThresholdTable {
    fn default() -> Self {
        Self::from_config(&ThresholdsConfig::default())
    }
}

impl ThresholdTable {
    pub fn from_config(config: &ThresholdsConfig) -> Self {
        let bands = HashMap::from([
            (MetricKind::Cpu, config.cpu),
            (MetricKind::Ram, config.ram),
            (MetricKind::Disk, config.disk),
        ]);
        Self {
            bands,
            fallback: ThresholdBand::FALLBACK,
        }
    }

    /// Band for `metric`, or the {70, 85} fallback for kinds without one.
    pub fn band(&self, metric: MetricKind) -> ThresholdBand {
        self.bands.get(&metric).copied().unwrap_or(self.fallback)
    }

    pub fn classify(&self, value: f64, metric: MetricKind) -> (Severity, ColorHint) {
        let severity = classify_band(value, self.band(metric));
        (severity, severity.color_hint())
    }
}

/// Bands are inclusive at their lower edge: a value equal to `critical` is CRITICAL.
pub fn classify_band(value: f64, band: ThresholdBand) -> Severity {
    if value >= band.critical {
        Severity::Critical
    } else if value >= band.warning {
        Severity::Warning
    } else {
        Severity::Normal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cpu_bands_use_configured_values() {
        let table = ThresholdTable::default();
        assert_eq!(table.classify(59.9, MetricKind::Cpu).0, Severity::Normal);
        assert_eq!(table.classify(60.0, MetricKind::Cpu).0, Severity::Warning);
        assert_eq!(
            table.classify(85.0, MetricKind::Cpu),
            (Severity::Critical, ColorHint::Red)
        );
    }

    #[test]
    fn disk_has_its_own_critical_edge() {
        let table = ThresholdTable::default();
        assert_eq!(table.classify(89.0, MetricKind::Disk).0, Severity::Warning);
        assert_eq!(table.classify(90.0, MetricKind::Disk).0, Severity::Critical);
    }

    #[test]
    fn unknown_kind_falls_back_to_default_pair() {
        let table = ThresholdTable::default();
        assert_eq!(table.band(MetricKind::NetUp), ThresholdBand::FALLBACK);
        assert_eq!(
            table.classify(70.0, MetricKind::NetDown),
            (Severity::Warning, ColorHint::Yellow)
        );
        assert_eq!(table.classify(69.0, MetricKind::NetDown).1, ColorHint::Green);
    }
}
