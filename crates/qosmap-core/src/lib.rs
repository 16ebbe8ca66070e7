pub mod aggregate;
pub mod attribution;
pub mod critical;
pub mod geo;
pub mod models;
pub mod pipeline;
pub mod status;

pub use aggregate::{aggregate_zones, snap_to_grid, GroupingMode, ZoneAggregate, ZoneKey};
pub use attribution::{
    responsible_antennas, sector_download_averages, sector_for_bearing, AttributionConfig,
    ResponsibleBts,
};
pub use critical::{filter_critical, MetricKind};
pub use geo::{haversine_km, initial_bearing_deg};
pub use models::{
    AntennaSite, Coordinate, MeasurementRecord, NetworkGeneration, Sector, TimeRange,
};
pub use pipeline::{critical_zones, detect_critical_zones, DetectionConfig, ZoneReport};
pub use status::{classify, QualityStatus, StatusThresholds};
