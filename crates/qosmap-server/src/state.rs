//! Shared application state.

use qosmap_cloud::CloudClient;
use qosmap_core::{AttributionConfig, DetectionConfig};
use sqlx::SqlitePool;

use crate::config::Config;
use crate::persistence::Database;

/// Per-process state injected into every handler. The database snapshot is
/// the only thing requests share; there is no mutable state between them.
pub struct AppState {
    db: Database,
    config: Config,
    cloud: Option<CloudClient>,
}

impl AppState {
    pub fn new(db: Database, config: Config) -> Self {
        let cloud = config.cloud_url.as_deref().map(CloudClient::new);
        Self { db, config, cloud }
    }

    pub fn pool(&self) -> &SqlitePool {
        self.db.pool()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn cloud(&self) -> Option<&CloudClient> {
        self.cloud.as_ref()
    }

    /// Deployment-level detection defaults, before per-request overrides.
    pub fn detection_defaults(&self) -> DetectionConfig {
        DetectionConfig {
            sector_thresholds: self.config.status_thresholds,
            attribution: AttributionConfig {
                coverage_radius_km: self.config.coverage_radius_km,
                max_antennas: self.config.max_responsible_bts,
            },
            ..DetectionConfig::default()
        }
    }
}
