//! Best-effort cloud synchronization.
//!
//! Pulls new measurements from the remote cloud into the local store. The
//! attempt is bounded by a timeout and every failure degrades to serving
//! stale data; nothing here ever fails a request.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::time::timeout;

use crate::persistence;
use crate::state::AppState;

/// Result of one sync attempt, reported back to callers of `/api/sync`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SyncOutcome {
    /// No cloud URL configured.
    Skipped,
    Completed { fetched: usize, inserted: usize },
    Failed { reason: String },
}

/// Run one bounded sync attempt against the measurement cloud.
pub async fn run_sync(state: &Arc<AppState>) -> SyncOutcome {
    let Some(cloud) = state.cloud() else {
        tracing::info!("Sync skipped: cloud URL not configured");
        return SyncOutcome::Skipped;
    };

    let since = match persistence::latest_measurement_at(state.pool()).await {
        Ok(since) => since,
        Err(err) => {
            tracing::warn!("Sync aborted, could not read high-water mark: {err:#}");
            return SyncOutcome::Failed {
                reason: err.to_string(),
            };
        }
    };

    let budget = Duration::from_secs(state.config().sync_timeout_s);
    let fetched = match timeout(budget, cloud.fetch_measurements(since)).await {
        Err(_) => {
            tracing::warn!("Cloud sync timed out after {}s", budget.as_secs());
            return SyncOutcome::Failed {
                reason: format!("timed out after {}s", budget.as_secs()),
            };
        }
        Ok(Err(err)) => {
            tracing::warn!("Cloud sync failed: {err}");
            return SyncOutcome::Failed {
                reason: err.to_string(),
            };
        }
        Ok(Ok(records)) => records,
    };

    let mut inserted = 0usize;
    for record in &fetched {
        match persistence::insert_measurement(state.pool(), record).await {
            Ok(true) => inserted += 1,
            Ok(false) => {}
            Err(err) => {
                tracing::warn!("Failed to store synced measurement {}: {err:#}", record.test_id);
                return SyncOutcome::Failed {
                    reason: err.to_string(),
                };
            }
        }
    }

    tracing::info!("Cloud sync completed: {} fetched, {} new", fetched.len(), inserted);
    SyncOutcome::Completed {
        fetched: fetched.len(),
        inserted,
    }
}
