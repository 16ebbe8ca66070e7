//! Measurement persistence operations.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use qosmap_core::{MeasurementRecord, NetworkGeneration, TimeRange};
use sqlx::SqlitePool;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const SELECT_COLUMNS: &str = "SELECT test_id, timestamp, operator, network_type, download_mbps, \
     upload_mbps, latency_ms, jitter_ms, signal_strength_dbm, device_type, wilaya, commune, \
     latitude, longitude, cell_id FROM speed_tests";

/// Format a capture time the way it is stored. The fixed-width format keeps
/// lexicographic and chronological order identical, which the time-range
/// comparisons below rely on.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .with_context(|| format!("invalid stored timestamp: {raw}"))?;
    Ok(naive.and_utc())
}

/// List measurements inside `range`, newest first.
pub async fn list_measurements(
    pool: &SqlitePool,
    range: &TimeRange,
) -> Result<Vec<MeasurementRecord>> {
    let mut sql = String::from(SELECT_COLUMNS);
    let mut clauses: Vec<&str> = Vec::new();
    if range.start.is_some() {
        clauses.push("timestamp >= ?");
    }
    if range.end.is_some() {
        clauses.push("timestamp <= ?");
    }
    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }
    sql.push_str(" ORDER BY timestamp DESC");

    let mut query = sqlx::query_as::<_, MeasurementRow>(&sql);
    if let Some(start) = range.start {
        query = query.bind(format_timestamp(start));
    }
    if let Some(end) = range.end {
        query = query.bind(format_timestamp(end));
    }

    let rows = query.fetch_all(pool).await?;
    rows.into_iter().map(|row| row.try_into()).collect()
}

/// Insert a measurement. Re-inserting an already-known test id is a no-op,
/// which keeps cloud sync idempotent.
pub async fn insert_measurement(pool: &SqlitePool, record: &MeasurementRecord) -> Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT OR IGNORE INTO speed_tests (
            test_id, timestamp, operator, network_type,
            download_mbps, upload_mbps, latency_ms, jitter_ms, signal_strength_dbm,
            device_type, wilaya, commune, latitude, longitude, cell_id
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
        "#,
    )
    .bind(&record.test_id)
    .bind(format_timestamp(record.timestamp))
    .bind(&record.operator)
    .bind(record.network_type.as_label())
    .bind(record.download_mbps)
    .bind(record.upload_mbps)
    .bind(record.latency_ms)
    .bind(record.jitter_ms)
    .bind(record.signal_strength_dbm)
    .bind(&record.device_type)
    .bind(&record.wilaya)
    .bind(&record.commune)
    .bind(record.latitude)
    .bind(record.longitude)
    .bind(&record.cell_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Capture time of the newest stored measurement, the high-water mark for
/// incremental cloud sync.
pub async fn latest_measurement_at(pool: &SqlitePool) -> Result<Option<DateTime<Utc>>> {
    let row: (Option<String>,) = sqlx::query_as("SELECT MAX(timestamp) FROM speed_tests")
        .fetch_one(pool)
        .await?;

    match row.0 {
        Some(raw) => Ok(Some(parse_timestamp(&raw)?)),
        None => Ok(None),
    }
}

// Internal row type for SQLx
#[derive(sqlx::FromRow)]
struct MeasurementRow {
    test_id: String,
    timestamp: String,
    operator: Option<String>,
    network_type: Option<String>,
    download_mbps: Option<f64>,
    upload_mbps: Option<f64>,
    latency_ms: Option<f64>,
    jitter_ms: Option<f64>,
    signal_strength_dbm: Option<f64>,
    device_type: Option<String>,
    wilaya: Option<String>,
    commune: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    cell_id: Option<String>,
}

impl TryFrom<MeasurementRow> for MeasurementRecord {
    type Error = anyhow::Error;

    fn try_from(row: MeasurementRow) -> Result<Self> {
        Ok(MeasurementRecord {
            test_id: row.test_id,
            timestamp: parse_timestamp(&row.timestamp)?,
            latitude: row.latitude,
            longitude: row.longitude,
            download_mbps: row.download_mbps,
            upload_mbps: row.upload_mbps,
            latency_ms: row.latency_ms,
            jitter_ms: row.jitter_ms,
            signal_strength_dbm: row.signal_strength_dbm,
            network_type: row
                .network_type
                .as_deref()
                .map(NetworkGeneration::from_label)
                .unwrap_or_default(),
            wilaya: row.wilaya,
            commune: row.commune,
            cell_id: row.cell_id,
            operator: row.operator,
            device_type: row.device_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::init_database;
    use chrono::TimeZone;

    fn record(test_id: &str, ts: DateTime<Utc>) -> MeasurementRecord {
        MeasurementRecord {
            test_id: test_id.to_string(),
            timestamp: ts,
            latitude: Some(36.75),
            longitude: Some(3.05),
            download_mbps: Some(8.5),
            upload_mbps: Some(2.1),
            latency_ms: Some(75.0),
            jitter_ms: None,
            signal_strength_dbm: Some(-85.0),
            network_type: NetworkGeneration::G4,
            wilaya: Some("Alger".to_string()),
            commune: Some("Hydra".to_string()),
            cell_id: Some("100011".to_string()),
            operator: Some("Mobilis".to_string()),
            device_type: Some("Android".to_string()),
        }
    }

    #[tokio::test]
    async fn insert_roundtrips_and_ignores_duplicates() {
        let db = init_database(":memory:", 1).await.unwrap();
        let ts = Utc.with_ymd_and_hms(2024, 3, 15, 12, 30, 0).unwrap();

        assert!(insert_measurement(db.pool(), &record("t1", ts)).await.unwrap());
        assert!(!insert_measurement(db.pool(), &record("t1", ts)).await.unwrap());

        let all = list_measurements(db.pool(), &TimeRange::default()).await.unwrap();
        assert_eq!(all.len(), 1);
        let got = &all[0];
        assert_eq!(got.test_id, "t1");
        assert_eq!(got.timestamp, ts);
        assert_eq!(got.network_type, NetworkGeneration::G4);
        assert_eq!(got.download_mbps, Some(8.5));
        assert_eq!(got.jitter_ms, None);
    }

    #[tokio::test]
    async fn time_range_filter_is_inclusive_and_ordered() {
        let db = init_database(":memory:", 1).await.unwrap();
        let base = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        for day in 1..=5 {
            let ts = base + chrono::Duration::days(day);
            insert_measurement(db.pool(), &record(&format!("t{day}"), ts))
                .await
                .unwrap();
        }

        let range = TimeRange {
            start: Some(base + chrono::Duration::days(2)),
            end: Some(base + chrono::Duration::days(4)),
        };
        let filtered = list_measurements(db.pool(), &range).await.unwrap();
        let ids: Vec<&str> = filtered.iter().map(|r| r.test_id.as_str()).collect();
        assert_eq!(ids, vec!["t4", "t3", "t2"]);
    }

    #[tokio::test]
    async fn latest_measurement_tracks_the_high_water_mark() {
        let db = init_database(":memory:", 1).await.unwrap();
        assert_eq!(latest_measurement_at(db.pool()).await.unwrap(), None);

        let newest = Utc.with_ymd_and_hms(2024, 3, 20, 8, 0, 0).unwrap();
        insert_measurement(db.pool(), &record("old", newest - chrono::Duration::days(3)))
            .await
            .unwrap();
        insert_measurement(db.pool(), &record("new", newest)).await.unwrap();

        assert_eq!(latest_measurement_at(db.pool()).await.unwrap(), Some(newest));
    }
}
