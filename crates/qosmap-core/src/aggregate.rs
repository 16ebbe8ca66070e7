//! Zone aggregation.
//!
//! Groups a collection of measurements into zones under one of three
//! interchangeable strategies and computes per-zone averages, sample
//! counts, and centroids. Aggregation only sums and counts, so the result
//! is independent of input order.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::models::{Coordinate, MeasurementRecord};

/// Sentinel for records without an administrative label.
pub const UNKNOWN_LABEL: &str = "Unknown";

/// How measurements are grouped into zones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupingMode {
    /// Group by (wilaya, commune) pair; missing labels become `"Unknown"`.
    #[serde(alias = "commune")]
    Administrative,
    /// Bucket coordinates into fixed-size lat/lng cells; records without a
    /// fix are excluded.
    Grid,
    /// Group by sector cell id; records without one are excluded.
    Antenna,
}

/// Grouping key of an aggregated zone.
#[derive(Debug, Clone, PartialEq)]
pub enum ZoneKey {
    Administrative { wilaya: String, commune: String },
    /// Snapped cell center.
    Grid { lat: f64, lng: f64 },
    Antenna { cell_id: String },
}

/// Aggregate metrics for one zone. Averages skip null samples.
#[derive(Debug, Clone)]
pub struct ZoneAggregate {
    pub key: ZoneKey,
    pub avg_download: Option<f64>,
    pub avg_upload: Option<f64>,
    pub avg_latency: Option<f64>,
    pub test_count: u64,
    /// Mean of member coordinates, or the cell center in grid mode.
    pub centroid: Option<Coordinate>,
    /// Distinct administrative labels seen among members, sorted. Used as
    /// display labels for grid cells that straddle communes.
    pub wilayas: Vec<String>,
    pub communes: Vec<String>,
}

/// Snap a coordinate component to the nearest multiple of `cell_size`.
pub fn snap_to_grid(value: f64, cell_size: f64) -> f64 {
    (value / cell_size).round() * cell_size
}

// Hashable grouping key; grid cells are keyed by integer cell index so two
// floats that snap to the same multiple always land in the same bucket.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum GroupKey {
    Admin(String, String),
    Cell(i64, i64),
    Sector(String),
}

#[derive(Debug, Default)]
struct MeanAccumulator {
    sum: f64,
    n: u64,
}

impl MeanAccumulator {
    fn push(&mut self, sample: Option<f64>) {
        if let Some(value) = sample {
            self.sum += value;
            self.n += 1;
        }
    }

    fn mean(&self) -> Option<f64> {
        if self.n == 0 {
            None
        } else {
            Some(self.sum / self.n as f64)
        }
    }
}

#[derive(Debug, Default)]
struct ZoneAccumulator {
    download: MeanAccumulator,
    upload: MeanAccumulator,
    latency: MeanAccumulator,
    lat_sum: f64,
    lng_sum: f64,
    coord_count: u64,
    count: u64,
    wilayas: BTreeSet<String>,
    communes: BTreeSet<String>,
}

impl ZoneAccumulator {
    fn push(&mut self, record: &MeasurementRecord) {
        self.download.push(record.download_mbps);
        self.upload.push(record.upload_mbps);
        self.latency.push(record.latency_ms);
        if let Some(coordinate) = record.coordinate() {
            self.lat_sum += coordinate.lat;
            self.lng_sum += coordinate.lng;
            self.coord_count += 1;
        }
        if let Some(wilaya) = record.wilaya.as_deref() {
            self.wilayas.insert(wilaya.to_string());
        }
        if let Some(commune) = record.commune.as_deref() {
            self.communes.insert(commune.to_string());
        }
        self.count += 1;
    }

    fn mean_coordinate(&self) -> Option<Coordinate> {
        if self.coord_count == 0 {
            return None;
        }
        Some(Coordinate {
            lat: self.lat_sum / self.coord_count as f64,
            lng: self.lng_sum / self.coord_count as f64,
        })
    }
}

/// Group `records` into zones under `mode`.
///
/// `grid_size` is the cell edge in coordinate degrees and must be strictly
/// positive in grid mode; a non-positive or non-finite size yields no
/// zones. It is ignored by the other modes.
pub fn aggregate_zones(
    records: &[MeasurementRecord],
    mode: GroupingMode,
    grid_size: f64,
) -> Vec<ZoneAggregate> {
    if mode == GroupingMode::Grid && !(grid_size.is_finite() && grid_size > 0.0) {
        return Vec::new();
    }

    let mut groups: HashMap<GroupKey, ZoneAccumulator> = HashMap::new();

    for record in records {
        let key = match mode {
            GroupingMode::Administrative => GroupKey::Admin(
                record.wilaya.clone().unwrap_or_else(|| UNKNOWN_LABEL.to_string()),
                record.commune.clone().unwrap_or_else(|| UNKNOWN_LABEL.to_string()),
            ),
            GroupingMode::Grid => match record.coordinate() {
                Some(coordinate) => GroupKey::Cell(
                    cell_index(coordinate.lat, grid_size),
                    cell_index(coordinate.lng, grid_size),
                ),
                None => continue,
            },
            GroupingMode::Antenna => match record.cell_id.clone() {
                Some(cell_id) => GroupKey::Sector(cell_id),
                None => continue,
            },
        };
        groups.entry(key).or_default().push(record);
    }

    groups
        .into_iter()
        .map(|(key, acc)| {
            let (zone_key, centroid) = match key {
                GroupKey::Admin(wilaya, commune) => {
                    let centroid = acc.mean_coordinate();
                    (ZoneKey::Administrative { wilaya, commune }, centroid)
                }
                GroupKey::Cell(lat_idx, lng_idx) => {
                    let center = Coordinate {
                        lat: lat_idx as f64 * grid_size,
                        lng: lng_idx as f64 * grid_size,
                    };
                    (
                        ZoneKey::Grid {
                            lat: center.lat,
                            lng: center.lng,
                        },
                        Some(center),
                    )
                }
                GroupKey::Sector(cell_id) => {
                    let centroid = acc.mean_coordinate();
                    (ZoneKey::Antenna { cell_id }, centroid)
                }
            };

            ZoneAggregate {
                key: zone_key,
                avg_download: acc.download.mean(),
                avg_upload: acc.upload.mean(),
                avg_latency: acc.latency.mean(),
                test_count: acc.count,
                centroid,
                wilayas: acc.wilayas.into_iter().collect(),
                communes: acc.communes.into_iter().collect(),
            }
        })
        .collect()
}

fn cell_index(value: f64, cell_size: f64) -> i64 {
    (value / cell_size).round() as i64
}
