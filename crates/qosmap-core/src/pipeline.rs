//! Per-request orchestration: aggregate → critical filter → attribution.
//!
//! Everything here is pure and operates on in-memory snapshots, so
//! concurrent requests can run the pipeline without coordination. The
//! caller fetches the snapshots (time-filtered) from storage first.

use serde::{Deserialize, Serialize};

use crate::aggregate::{aggregate_zones, GroupingMode, ZoneAggregate, ZoneKey, UNKNOWN_LABEL};
use crate::attribution::{
    responsible_antennas, sector_download_averages, AttributionConfig, ResponsibleBts,
};
use crate::critical::{filter_critical, MetricKind};
use crate::models::{AntennaSite, Coordinate, MeasurementRecord};
use crate::status::StatusThresholds;

/// Immutable per-request detection parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionConfig {
    pub mode: GroupingMode,
    pub metric: MetricKind,
    /// A zone is critical below this average, in the metric's unit.
    pub threshold: f64,
    /// Minimum sample count before a zone can be judged at all.
    pub min_tests: u64,
    /// Cell edge in coordinate degrees; grid mode only.
    pub grid_size: f64,
    /// Cut-points for antenna-sector statuses.
    pub sector_thresholds: StatusThresholds,
    pub attribution: AttributionConfig,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            mode: GroupingMode::Administrative,
            metric: MetricKind::Download,
            threshold: 10.0,
            min_tests: 5,
            grid_size: 0.005,
            sector_thresholds: StatusThresholds::default(),
            attribution: AttributionConfig::default(),
        }
    }
}

/// One reported zone: mode-dependent key fields, averages, and the
/// antennas held responsible for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneReport {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wilaya: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commune: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cell_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid_lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid_lng: Option<f64>,
    pub avg_download: Option<f64>,
    pub avg_upload: Option<f64>,
    pub avg_latency: Option<f64>,
    pub test_count: u64,
    pub detection_mode: GroupingMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid_size: Option<f64>,
    /// Zone centroid, when any member carried a fix.
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    #[serde(default)]
    pub responsible_bts: Vec<ResponsibleBts>,
}

impl ZoneReport {
    pub fn centroid(&self) -> Option<Coordinate> {
        match (self.lat, self.lng) {
            (Some(lat), Some(lng)) => Some(Coordinate { lat, lng }),
            _ => None,
        }
    }
}

/// Aggregate and filter, without sector attribution.
pub fn critical_zones(records: &[MeasurementRecord], config: &DetectionConfig) -> Vec<ZoneReport> {
    let zones = aggregate_zones(records, config.mode, config.grid_size);
    filter_critical(zones, config.metric, config.threshold, config.min_tests)
        .into_iter()
        .map(|zone| zone_report(zone, config))
        .collect()
}

/// Full pipeline: aggregate → critical filter → responsible-BTS
/// attribution. Zones without a centroid keep an empty responsibility
/// list.
pub fn detect_critical_zones(
    records: &[MeasurementRecord],
    antennas: &[AntennaSite],
    config: &DetectionConfig,
) -> Vec<ZoneReport> {
    let sector_averages = sector_download_averages(records);

    critical_zones(records, config)
        .into_iter()
        .map(|mut report| {
            if let Some(centroid) = report.centroid() {
                report.responsible_bts = responsible_antennas(
                    centroid,
                    antennas,
                    &sector_averages,
                    &config.sector_thresholds,
                    &config.attribution,
                );
            }
            report
        })
        .collect()
}

fn zone_report(zone: ZoneAggregate, config: &DetectionConfig) -> ZoneReport {
    let ZoneAggregate {
        key,
        avg_download,
        avg_upload,
        avg_latency,
        test_count,
        centroid,
        wilayas,
        communes,
    } = zone;

    let mut report = ZoneReport {
        wilaya: None,
        commune: None,
        cell_id: None,
        grid_lat: None,
        grid_lng: None,
        avg_download,
        avg_upload,
        avg_latency,
        test_count,
        detection_mode: config.mode,
        grid_size: None,
        lat: centroid.map(|c| c.lat),
        lng: centroid.map(|c| c.lng),
        responsible_bts: Vec::new(),
    };

    match key {
        ZoneKey::Administrative { wilaya, commune } => {
            report.wilaya = Some(wilaya);
            report.commune = Some(commune);
        }
        ZoneKey::Grid { lat, lng } => {
            report.grid_lat = Some(lat);
            report.grid_lng = Some(lng);
            report.grid_size = Some(config.grid_size);
            // Cells can straddle communes; label with everything seen.
            report.wilaya = Some(join_or_unknown(wilayas));
            report.commune = Some(join_or_unknown(communes));
        }
        ZoneKey::Antenna { cell_id } => {
            report.cell_id = Some(cell_id);
        }
    }

    report
}

fn join_or_unknown(labels: Vec<String>) -> String {
    if labels.is_empty() {
        UNKNOWN_LABEL.to_string()
    } else {
        labels.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NetworkGeneration, Sector};
    use crate::status::QualityStatus;
    use chrono::{TimeZone, Utc};

    fn record(
        commune: &str,
        coordinate: (f64, f64),
        cell_id: Option<&str>,
        download: f64,
    ) -> MeasurementRecord {
        MeasurementRecord {
            test_id: "t".to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap(),
            latitude: Some(coordinate.0),
            longitude: Some(coordinate.1),
            download_mbps: Some(download),
            upload_mbps: Some(4.0),
            latency_ms: Some(70.0),
            jitter_ms: None,
            signal_strength_dbm: None,
            network_type: NetworkGeneration::G4,
            wilaya: Some("Alger".to_string()),
            commune: Some(commune.to_string()),
            cell_id: cell_id.map(str::to_string),
            operator: Some("Mobilis".to_string()),
            device_type: None,
        }
    }

    fn antenna(id: i64, lat: f64, lng: f64) -> AntennaSite {
        AntennaSite {
            id,
            name: format!("BTS-{id:03}"),
            wilaya: "Alger".to_string(),
            commune: "Hydra".to_string(),
            latitude: lat,
            longitude: lng,
            cell_id_a: format!("{id}1"),
            cell_id_b: format!("{id}2"),
            cell_id_c: format!("{id}3"),
            installed_on: None,
        }
    }

    #[test]
    fn end_to_end_attributes_nearby_antenna_sector() {
        // Six slow tests clustered around Hydra; the antenna sits just
        // south of the cluster, so its A sector faces the zone.
        let records: Vec<MeasurementRecord> = (0..6)
            .map(|i| {
                let mut r = record("Hydra", (36.7501 + 0.0001 * i as f64, 3.0501), Some("9001"), 2.0);
                r.test_id = format!("t{i}");
                r
            })
            .collect();
        let antennas = vec![antenna(900, 36.74, 3.05)];

        let config = DetectionConfig::default();
        let zones = detect_critical_zones(&records, &antennas, &config);

        assert_eq!(zones.len(), 1);
        let zone = &zones[0];
        assert_eq!(zone.commune.as_deref(), Some("Hydra"));
        assert_eq!(zone.test_count, 6);
        assert_eq!(zone.responsible_bts.len(), 1);

        let bts = &zone.responsible_bts[0];
        assert_eq!(bts.id, 900);
        assert_eq!(bts.sector, Sector::A);
        // The zone's own tests feed sector A's average: 2 Mbps → critique.
        assert_eq!(bts.sector_status, QualityStatus::Critique);
        assert!(bts.distance_km > 0.0 && bts.distance_km <= 5.0);
    }

    #[test]
    fn grid_mode_reports_cell_fields_and_size() {
        let records: Vec<MeasurementRecord> = (0..5)
            .map(|i| record("Hydra", (36.7501, 3.0501 + 0.00001 * i as f64), None, 1.0))
            .collect();

        let config = DetectionConfig {
            mode: GroupingMode::Grid,
            ..DetectionConfig::default()
        };
        let zones = critical_zones(&records, &config);

        assert_eq!(zones.len(), 1);
        let zone = &zones[0];
        assert_eq!(zone.grid_size, Some(0.005));
        assert!(zone.grid_lat.is_some() && zone.grid_lng.is_some());
        assert_eq!(zone.commune.as_deref(), Some("Hydra"));
        // Centroid is the snapped cell center.
        assert_eq!(zone.lat, zone.grid_lat);
        assert_eq!(zone.lng, zone.grid_lng);
    }

    #[test]
    fn antenna_mode_reports_cell_id_without_admin_labels() {
        let records: Vec<MeasurementRecord> = (0..5)
            .map(|i| record("Hydra", (36.75, 3.05), Some("777"), 3.0 + 0.1 * i as f64))
            .collect();

        let config = DetectionConfig {
            mode: GroupingMode::Antenna,
            ..DetectionConfig::default()
        };
        let zones = critical_zones(&records, &config);

        assert_eq!(zones.len(), 1);
        assert_eq!(zones[0].cell_id.as_deref(), Some("777"));
        assert_eq!(zones[0].wilaya, None);
        assert_eq!(zones[0].grid_size, None);
    }

    #[test]
    fn mode_dependent_fields_are_omitted_from_the_payload() {
        let records: Vec<MeasurementRecord> =
            (0..5).map(|_| record("Hydra", (36.75, 3.05), None, 2.0)).collect();

        let zones = critical_zones(&records, &DetectionConfig::default());
        let payload = serde_json::to_value(&zones[0]).unwrap();

        assert!(payload.get("commune").is_some());
        assert!(payload.get("grid_lat").is_none());
        assert!(payload.get("grid_size").is_none());
        assert!(payload.get("cell_id").is_none());
        assert_eq!(payload["detection_mode"], "administrative");
    }

    #[test]
    fn reports_are_ordered_worst_first() {
        let mut records = Vec::new();
        for i in 0..5 {
            records.push(record("Kouba", (36.72, 3.08), None, 6.0 + 0.01 * i as f64));
        }
        for i in 0..5 {
            records.push(record("Hydra", (36.75, 3.05), None, 2.0 + 0.01 * i as f64));
        }

        let zones = critical_zones(&records, &DetectionConfig::default());
        assert_eq!(zones.len(), 2);
        assert_eq!(zones[0].commune.as_deref(), Some("Hydra"));
        assert_eq!(zones[1].commune.as_deref(), Some("Kouba"));
    }

    #[test]
    fn zone_without_centroid_keeps_empty_responsibility_list() {
        let mut no_fix = record("Hydra", (0.0, 0.0), None, 2.0);
        no_fix.latitude = None;
        no_fix.longitude = None;
        let records: Vec<MeasurementRecord> = (0..5)
            .map(|i| {
                let mut r = no_fix.clone();
                r.test_id = format!("t{i}");
                r
            })
            .collect();
        let antennas = vec![antenna(1, 36.75, 3.05)];

        let zones = detect_critical_zones(&records, &antennas, &DetectionConfig::default());
        assert_eq!(zones.len(), 1);
        assert_eq!(zones[0].lat, None);
        assert!(zones[0].responsible_bts.is_empty());
    }
}
