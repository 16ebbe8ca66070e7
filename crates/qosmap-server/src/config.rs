//! Server configuration from environment.

use qosmap_core::StatusThresholds;
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    pub database_path: String,
    pub database_max_connections: u32,
    /// Remote measurement cloud base URL; sync is skipped when unset.
    pub cloud_url: Option<String>,
    /// Hard ceiling on one sync attempt; computation proceeds on stale
    /// data once it elapses.
    pub sync_timeout_s: u64,
    pub sync_interval_s: u64,
    /// The single classification policy for antenna-sector statuses.
    pub status_thresholds: StatusThresholds,
    pub coverage_radius_km: f64,
    pub max_responsible_bts: usize,
    /// Operator tag stamped on measurements submitted via the mobile API.
    pub operator_tag: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            server_port: env_parse("QOSMAP_PORT", 5000),
            database_path: env::var("QOSMAP_DB_PATH")
                .unwrap_or_else(|_| "data/qosmap.db".to_string()),
            database_max_connections: env_parse("QOSMAP_DB_MAX_CONNECTIONS", 5),
            cloud_url: env::var("QOSMAP_CLOUD_URL")
                .ok()
                .filter(|url| !url.trim().is_empty()),
            sync_timeout_s: env_parse("QOSMAP_SYNC_TIMEOUT_S", 15),
            sync_interval_s: env_parse("QOSMAP_SYNC_INTERVAL_S", 300),
            status_thresholds: StatusThresholds {
                good: env_parse("QOSMAP_STATUS_GOOD_MBPS", 10.0),
                medium: env_parse("QOSMAP_STATUS_MEDIUM_MBPS", 5.0),
            },
            coverage_radius_km: env_parse("QOSMAP_COVERAGE_RADIUS_KM", 5.0),
            max_responsible_bts: env_parse("QOSMAP_MAX_RESPONSIBLE_BTS", 5),
            operator_tag: env::var("QOSMAP_OPERATOR").unwrap_or_else(|_| "Mobilis".to_string()),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}
