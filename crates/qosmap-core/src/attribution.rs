//! BTS sector attribution for critical zones.
//!
//! Finds the antennas close enough to a zone centroid to be held
//! responsible for it, works out which 120° sector of each antenna faces
//! the zone, and attaches that sector's quality status.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::aggregate::{aggregate_zones, GroupingMode, ZoneKey};
use crate::geo::{haversine_km, initial_bearing_deg};
use crate::models::{AntennaSite, Coordinate, MeasurementRecord, Sector};
use crate::status::{classify, QualityStatus, StatusThresholds};

/// Attribution tuning: how far out a BTS can be held responsible and how
/// many are reported per zone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AttributionConfig {
    pub coverage_radius_km: f64,
    pub max_antennas: usize,
}

impl Default for AttributionConfig {
    fn default() -> Self {
        Self {
            coverage_radius_km: 5.0,
            max_antennas: 5,
        }
    }
}

/// Map a bearing in [0, 360) to its fixed 120° sector:
/// [0,120) → A, [120,240) → B, [240,360) → C.
pub fn sector_for_bearing(bearing_deg: f64) -> Sector {
    if (0.0..120.0).contains(&bearing_deg) {
        Sector::A
    } else if (120.0..240.0).contains(&bearing_deg) {
        Sector::B
    } else {
        Sector::C
    }
}

/// A nearby antenna held responsible for a critical zone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponsibleBts {
    pub id: i64,
    pub name: String,
    /// Rounded to 2 decimals for the payload; filtering and ordering use
    /// full precision.
    pub distance_km: f64,
    /// Bearing antenna → zone centroid, rounded to 1 decimal.
    pub bearing: f64,
    /// The sector of the antenna facing the zone.
    pub sector: Sector,
    pub sector_status: QualityStatus,
}

/// Mean download per sector cell id, reusing antenna-mode aggregation.
/// Sectors with no non-null download samples are absent from the map.
pub fn sector_download_averages(records: &[MeasurementRecord]) -> HashMap<String, f64> {
    aggregate_zones(records, GroupingMode::Antenna, 0.0)
        .into_iter()
        .filter_map(|zone| {
            let avg = zone.avg_download?;
            match zone.key {
                ZoneKey::Antenna { cell_id } => Some((cell_id, avg)),
                _ => None,
            }
        })
        .collect()
}

/// Antennas within the coverage radius of `centroid`, nearest first, each
/// with the sector facing the zone and that sector's quality status.
///
/// No antenna in range yields an empty list, not an error.
pub fn responsible_antennas(
    centroid: Coordinate,
    antennas: &[AntennaSite],
    sector_averages: &HashMap<String, f64>,
    thresholds: &StatusThresholds,
    config: &AttributionConfig,
) -> Vec<ResponsibleBts> {
    let mut nearby: Vec<(f64, &AntennaSite)> = antennas
        .iter()
        .map(|antenna| (haversine_km(antenna.coordinate(), centroid), antenna))
        .filter(|(distance_km, _)| *distance_km <= config.coverage_radius_km)
        .collect();

    nearby.sort_by(|(a, _), (b, _)| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    nearby.truncate(config.max_antennas);

    nearby
        .into_iter()
        .map(|(distance_km, antenna)| {
            let bearing = initial_bearing_deg(antenna.coordinate(), centroid);
            let sector = sector_for_bearing(bearing);
            let avg = sector_averages.get(antenna.sector_cell_id(sector)).copied();
            ResponsibleBts {
                id: antenna.id,
                name: antenna.name.clone(),
                distance_km: round_to(distance_km, 2),
                bearing: round_to(bearing, 1),
                sector,
                sector_status: classify(avg, thresholds),
            }
        })
        .collect()
}

fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}
