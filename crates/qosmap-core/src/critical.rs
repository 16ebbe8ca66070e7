//! Critical-zone filtering.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::aggregate::ZoneAggregate;

/// Which averaged metric drives criticality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Download,
    Upload,
}

impl MetricKind {
    /// The selected average of a zone.
    pub fn of(self, zone: &ZoneAggregate) -> Option<f64> {
        match self {
            Self::Download => zone.avg_download,
            Self::Upload => zone.avg_upload,
        }
    }
}

/// Keep only critical zones, worst first.
///
/// A zone is critical when it has at least `min_tests` samples and its
/// selected average is strictly below `threshold`. Zones with no samples
/// for the metric are never critical. Non-critical zones are discarded,
/// not annotated.
pub fn filter_critical(
    zones: Vec<ZoneAggregate>,
    metric: MetricKind,
    threshold: f64,
    min_tests: u64,
) -> Vec<ZoneAggregate> {
    let mut critical: Vec<ZoneAggregate> = zones
        .into_iter()
        .filter(|zone| {
            zone.test_count >= min_tests
                && metric.of(zone).is_some_and(|avg| avg < threshold)
        })
        .collect();

    critical.sort_by(|a, b| {
        metric
            .of(a)
            .partial_cmp(&metric.of(b))
            .unwrap_or(Ordering::Equal)
    });
    critical
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::ZoneKey;

    fn zone(commune: &str, avg_download: Option<f64>, test_count: u64) -> ZoneAggregate {
        ZoneAggregate {
            key: ZoneKey::Administrative {
                wilaya: "Alger".to_string(),
                commune: commune.to_string(),
            },
            avg_download,
            avg_upload: Some(1.0),
            avg_latency: Some(90.0),
            test_count,
            centroid: None,
            wilayas: vec!["Alger".to_string()],
            communes: vec![commune.to_string()],
        }
    }

    #[test]
    fn requires_both_sample_count_and_threshold() {
        let zones = vec![
            // Too few samples, even though the average is terrible.
            zone("sparse", Some(5.0), 4),
            // Enough samples, average below threshold.
            zone("critical", Some(8.0), 10),
            // Enough samples, average at the threshold (not strictly below).
            zone("borderline", Some(10.0), 10),
        ];

        let critical = filter_critical(zones, MetricKind::Download, 10.0, 5);
        assert_eq!(critical.len(), 1);
        assert!(matches!(
            &critical[0].key,
            ZoneKey::Administrative { commune, .. } if commune == "critical"
        ));
    }

    #[test]
    fn orders_worst_first() {
        let zones = vec![
            zone("bad", Some(6.0), 10),
            zone("worst", Some(1.5), 10),
            zone("poor", Some(4.0), 10),
        ];

        let critical = filter_critical(zones, MetricKind::Download, 10.0, 5);
        let averages: Vec<f64> = critical.iter().map(|z| z.avg_download.unwrap()).collect();
        assert_eq!(averages, vec![1.5, 4.0, 6.0]);
    }

    #[test]
    fn zones_without_metric_samples_are_never_critical() {
        let zones = vec![zone("silent", None, 50)];
        assert!(filter_critical(zones, MetricKind::Download, 10.0, 5).is_empty());
    }

    #[test]
    fn upload_metric_selects_the_upload_average() {
        let mut z = zone("uplink", Some(50.0), 10);
        z.avg_upload = Some(0.5);
        let critical = filter_critical(vec![z], MetricKind::Upload, 1.0, 5);
        assert_eq!(critical.len(), 1);
    }
}
