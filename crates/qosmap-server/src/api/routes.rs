//! REST API routes.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

use crate::persistence;
use crate::state::AppState;
use crate::sync;
use qosmap_core::{
    classify, critical_zones, detect_critical_zones, haversine_km, sector_download_averages,
    AntennaSite, Coordinate, DetectionConfig, GroupingMode, MeasurementRecord, MetricKind,
    NetworkGeneration, QualityStatus, Sector, TimeRange, ZoneReport,
};

/// Create the API router.
pub fn create_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/data", get(list_data))
        .route("/api/stats", get(get_stats))
        .route("/api/critical-zones", get(get_critical_zones))
        .route("/api/critical-zones-with-bts", get(get_critical_zones_with_bts))
        .route("/api/bts", get(list_bts))
        .route("/api/bts/coverage", get(bts_coverage))
        .route("/api/mobile/submit-test", post(submit_test))
        .route("/api/sync", post(trigger_sync))
}

// === Request/Response types ===

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub mode: Option<GroupingMode>,
    pub metric: Option<MetricKind>,
    pub threshold: Option<f64>,
    pub min_tests: Option<u64>,
    pub grid_size: Option<f64>,
}

impl DetectionQuery {
    fn time_query(&self) -> TimeQuery {
        TimeQuery {
            start_date: self.start_date.clone(),
            end_date: self.end_date.clone(),
            start_time: self.start_time.clone(),
            end_time: self.end_time.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CoverageQuery {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct SubmitTestRequest {
    pub download_mbps: Option<f64>,
    pub upload_mbps: Option<f64>,
    pub latency_ms: Option<f64>,
    pub jitter_ms: Option<f64>,
    pub signal_strength_dbm: Option<f64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub network_type: Option<String>,
    pub wilaya: Option<String>,
    pub commune: Option<String>,
    pub cell_id: Option<String>,
    pub device_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub total_tests: u64,
    pub avg_download: Option<f64>,
    pub avg_upload: Option<f64>,
    pub avg_latency: Option<f64>,
}

/// Antenna registry entry with the dynamic status of each sector.
#[derive(Debug, Serialize)]
pub struct AntennaStatusReport {
    #[serde(flatten)]
    pub site: AntennaSite,
    #[serde(rename = "etatA")]
    pub status_a: QualityStatus,
    #[serde(rename = "etatB")]
    pub status_b: QualityStatus,
    #[serde(rename = "etatC")]
    pub status_c: QualityStatus,
}

#[derive(Debug, Serialize)]
pub struct CoverageEntry {
    #[serde(flatten)]
    pub site: AntennaSite,
    pub distance_km: f64,
}

// === Handlers ===

async fn list_data(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TimeQuery>,
) -> Response {
    let range = match parse_time_range(&query) {
        Ok(range) => range,
        Err(response) => return response,
    };

    match persistence::list_measurements(state.pool(), &range).await {
        Ok(records) => Json(records).into_response(),
        Err(err) => internal_error("Failed to list measurements", err),
    }
}

async fn get_stats(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TimeQuery>,
) -> Response {
    let range = match parse_time_range(&query) {
        Ok(range) => range,
        Err(response) => return response,
    };

    let records = match persistence::list_measurements(state.pool(), &range).await {
        Ok(records) => records,
        Err(err) => return internal_error("Failed to compute stats", err),
    };

    Json(StatsResponse {
        total_tests: records.len() as u64,
        avg_download: mean(records.iter().map(|r| r.download_mbps)),
        avg_upload: mean(records.iter().map(|r| r.upload_mbps)),
        avg_latency: mean(records.iter().map(|r| r.latency_ms)),
    })
    .into_response()
}

async fn get_critical_zones(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DetectionQuery>,
) -> Response {
    let (range, config) = match detection_request(&state, &query) {
        Ok(parts) => parts,
        Err(response) => return response,
    };

    let records = match persistence::list_measurements(state.pool(), &range).await {
        Ok(records) => records,
        Err(err) => return internal_error("Failed to detect critical zones", err),
    };

    let zones: Vec<ZoneReport> = critical_zones(&records, &config);
    Json(zones).into_response()
}

async fn get_critical_zones_with_bts(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DetectionQuery>,
) -> Response {
    let (range, config) = match detection_request(&state, &query) {
        Ok(parts) => parts,
        Err(response) => return response,
    };

    let records = match persistence::list_measurements(state.pool(), &range).await {
        Ok(records) => records,
        Err(err) => return internal_error("Failed to detect critical zones", err),
    };
    let antennas = match persistence::list_antennas(state.pool()).await {
        Ok(antennas) => antennas,
        Err(err) => return internal_error("Failed to load antenna registry", err),
    };

    let zones = detect_critical_zones(&records, &antennas, &config);
    Json(zones).into_response()
}

async fn list_bts(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TimeQuery>,
) -> Response {
    let range = match parse_time_range(&query) {
        Ok(range) => range,
        Err(response) => return response,
    };

    let antennas = match persistence::list_antennas(state.pool()).await {
        Ok(antennas) => antennas,
        Err(err) => return internal_error("Failed to load antenna registry", err),
    };
    let records = match persistence::list_measurements(state.pool(), &range).await {
        Ok(records) => records,
        Err(err) => return internal_error("Failed to load measurements", err),
    };

    let averages = sector_download_averages(&records);
    let thresholds = state.config().status_thresholds;

    let reports: Vec<AntennaStatusReport> = antennas
        .into_iter()
        .map(|site| {
            let status_of = |sector| {
                classify(averages.get(site.sector_cell_id(sector)).copied(), &thresholds)
            };
            AntennaStatusReport {
                status_a: status_of(Sector::A),
                status_b: status_of(Sector::B),
                status_c: status_of(Sector::C),
                site,
            }
        })
        .collect();

    Json(reports).into_response()
}

async fn bts_coverage(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CoverageQuery>,
) -> Response {
    let (lat, lng) = match (query.lat, query.lng) {
        (Some(lat), Some(lng)) => (lat, lng),
        _ => return bad_request("lat and lng parameters required"),
    };
    let point = Coordinate { lat, lng };

    let antennas = match persistence::list_antennas(state.pool()).await {
        Ok(antennas) => antennas,
        Err(err) => return internal_error("Failed to load antenna registry", err),
    };

    let radius_km = state.config().coverage_radius_km;
    let mut covering: Vec<CoverageEntry> = antennas
        .into_iter()
        .map(|site| CoverageEntry {
            distance_km: haversine_km(site.coordinate(), point),
            site,
        })
        .filter(|entry| entry.distance_km <= radius_km)
        .collect();
    covering.sort_by(|a, b| {
        a.distance_km
            .partial_cmp(&b.distance_km)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    Json(covering).into_response()
}

async fn submit_test(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SubmitTestRequest>,
) -> Response {
    let (Some(latitude), Some(longitude)) = (request.latitude, request.longitude) else {
        return bad_request("GPS coordinates are required");
    };
    if !latitude.is_finite() || !longitude.is_finite() {
        return bad_request("GPS coordinates must be finite numbers");
    }

    let record = MeasurementRecord {
        test_id: uuid::Uuid::new_v4().to_string(),
        timestamp: Utc::now(),
        latitude: Some(latitude),
        longitude: Some(longitude),
        download_mbps: request.download_mbps,
        upload_mbps: request.upload_mbps,
        latency_ms: request.latency_ms,
        jitter_ms: request.jitter_ms,
        signal_strength_dbm: request.signal_strength_dbm,
        network_type: request
            .network_type
            .as_deref()
            .map(NetworkGeneration::from_label)
            .unwrap_or_default(),
        wilaya: request.wilaya,
        commune: request.commune,
        cell_id: request.cell_id,
        operator: Some(state.config().operator_tag.clone()),
        device_type: request.device_type.or_else(|| Some("Mobile".to_string())),
    };

    match persistence::insert_measurement(state.pool(), &record).await {
        Ok(_) => Json(json!({
            "success": true,
            "test_id": record.test_id,
            "message": "Test result saved successfully"
        }))
        .into_response(),
        Err(err) => internal_error("Failed to save test result", err),
    }
}

async fn trigger_sync(State(state): State<Arc<AppState>>) -> Response {
    // Best-effort: the outcome is reported, never turned into a failure.
    let outcome = sync::run_sync(&state).await;
    Json(outcome).into_response()
}

// === Helpers ===

fn internal_error(context: &str, err: anyhow::Error) -> Response {
    tracing::error!("{context}: {err:#}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "Server Error" })),
    )
        .into_response()
}

fn bad_request(message: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
}

fn mean(values: impl Iterator<Item = Option<f64>>) -> Option<f64> {
    let mut sum = 0.0;
    let mut n = 0u64;
    for value in values.flatten() {
        sum += value;
        n += 1;
    }
    if n == 0 {
        None
    } else {
        Some(sum / n as f64)
    }
}

/// Build the inclusive capture-time window from `startDate`/`endDate` plus
/// optional `startTime`/`endTime`. Empty strings count as absent; a date
/// without a time spans the whole day, as in the dashboard UI.
fn parse_time_range(query: &TimeQuery) -> Result<TimeRange, Response> {
    let start = match bound(&query.start_date, &query.start_time, NaiveTime::MIN) {
        Ok(start) => start,
        Err(message) => return Err(bad_request(&message)),
    };
    let end_of_day = NaiveTime::from_hms_opt(23, 59, 59).expect("valid time");
    let end = match bound(&query.end_date, &query.end_time, end_of_day) {
        Ok(end) => end,
        Err(message) => return Err(bad_request(&message)),
    };

    Ok(TimeRange { start, end })
}

fn bound(
    date: &Option<String>,
    time: &Option<String>,
    default_time: NaiveTime,
) -> Result<Option<chrono::DateTime<Utc>>, String> {
    let Some(date) = non_empty(date) else {
        return Ok(None);
    };
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| format!("Invalid date: {date}"))?;

    let time = match non_empty(time) {
        Some(raw) => NaiveTime::parse_from_str(raw, "%H:%M:%S")
            .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
            .map_err(|_| format!("Invalid time: {raw}"))?,
        None => default_time,
    };

    Ok(Some(date.and_time(time).and_utc()))
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn detection_request(
    state: &AppState,
    query: &DetectionQuery,
) -> Result<(TimeRange, DetectionConfig), Response> {
    let range = parse_time_range(&query.time_query())?;

    let mut config = state.detection_defaults();
    if let Some(mode) = query.mode {
        config.mode = mode;
    }
    if let Some(metric) = query.metric {
        config.metric = metric;
    }
    if let Some(threshold) = query.threshold {
        if !threshold.is_finite() {
            return Err(bad_request("threshold must be a finite number"));
        }
        config.threshold = threshold;
    }
    if let Some(min_tests) = query.min_tests {
        config.min_tests = min_tests;
    }
    if let Some(grid_size) = query.grid_size {
        config.grid_size = grid_size;
    }
    if config.mode == GroupingMode::Grid && !(config.grid_size.is_finite() && config.grid_size > 0.0)
    {
        return Err(bad_request("gridSize must be a positive number of degrees"));
    }

    Ok((range, config))
}
