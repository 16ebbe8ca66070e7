//! Core data models for the QoS monitoring system.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A geographic coordinate in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

/// Radio access generation reported with a measurement.
///
/// Stored as free text upstream, so unknown labels collapse to `Unknown`
/// instead of failing deserialization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NetworkGeneration {
    G2,
    G3,
    G4,
    G5,
    #[default]
    Unknown,
}

impl NetworkGeneration {
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_uppercase().as_str() {
            "2G" => Self::G2,
            "3G" => Self::G3,
            "4G" => Self::G4,
            "5G" => Self::G5,
            _ => Self::Unknown,
        }
    }

    pub fn as_label(self) -> &'static str {
        match self {
            Self::G2 => "2G",
            Self::G3 => "3G",
            Self::G4 => "4G",
            Self::G5 => "5G",
            Self::Unknown => "Unknown",
        }
    }
}

impl From<String> for NetworkGeneration {
    fn from(label: String) -> Self {
        Self::from_label(&label)
    }
}

impl From<NetworkGeneration> for String {
    fn from(generation: NetworkGeneration) -> Self {
        generation.as_label().to_string()
    }
}

impl std::fmt::Display for NetworkGeneration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_label())
    }
}

/// A single speed-test measurement reported by a device.
///
/// Immutable once read. Numeric fields may be null upstream; they stay
/// `None` here and are skipped by averaging, never coerced to zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeasurementRecord {
    pub test_id: String,
    /// Capture time in UTC.
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub download_mbps: Option<f64>,
    #[serde(default)]
    pub upload_mbps: Option<f64>,
    #[serde(default)]
    pub latency_ms: Option<f64>,
    #[serde(default)]
    pub jitter_ms: Option<f64>,
    #[serde(default)]
    pub signal_strength_dbm: Option<f64>,
    #[serde(default)]
    pub network_type: NetworkGeneration,
    #[serde(default)]
    pub wilaya: Option<String>,
    #[serde(default)]
    pub commune: Option<String>,
    /// Sector cell id linking the record to one antenna sector.
    #[serde(default)]
    pub cell_id: Option<String>,
    #[serde(default)]
    pub operator: Option<String>,
    #[serde(default)]
    pub device_type: Option<String>,
}

impl MeasurementRecord {
    /// The geographic fix, when both components are present.
    pub fn coordinate(&self) -> Option<Coordinate> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) => Some(Coordinate { lat, lng }),
            _ => None,
        }
    }
}

/// One of the three fixed 120° angular sectors around a BTS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sector {
    A,
    B,
    C,
}

impl std::fmt::Display for Sector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::A => f.write_str("A"),
            Self::B => f.write_str("B"),
            Self::C => f.write_str("C"),
        }
    }
}

/// A BTS antenna site with its three sector cell ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AntennaSite {
    pub id: i64,
    pub name: String,
    pub wilaya: String,
    pub commune: String,
    pub latitude: f64,
    pub longitude: f64,
    pub cell_id_a: String,
    pub cell_id_b: String,
    pub cell_id_c: String,
    #[serde(default)]
    pub installed_on: Option<NaiveDate>,
}

impl AntennaSite {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate {
            lat: self.latitude,
            lng: self.longitude,
        }
    }

    /// Cell id of the given sector.
    pub fn sector_cell_id(&self, sector: Sector) -> &str {
        match sector {
            Sector::A => &self.cell_id_a,
            Sector::B => &self.cell_id_b,
            Sector::C => &self.cell_id_c,
        }
    }
}

/// Inclusive time window over capture timestamps. Unset bounds are open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl TimeRange {
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.start.map_or(true, |start| ts >= start) && self.end.map_or(true, |end| ts <= end)
    }
}
