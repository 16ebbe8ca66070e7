//! Loop to pull new measurements from the cloud periodically.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

use crate::state::AppState;
use crate::sync::{run_sync, SyncOutcome};

/// Start the periodic cloud sync loop.
///
/// Failures double the wait up to ten times the configured interval so a
/// cloud outage doesn't turn into a tight retry loop; any success falls
/// back to the normal cadence.
pub async fn run_cloud_sync_loop(state: Arc<AppState>) {
    if state.cloud().is_none() {
        tracing::info!("Cloud sync loop disabled: no cloud URL configured");
        return;
    }

    let interval = Duration::from_secs(state.config().sync_interval_s.max(1));
    let max_delay = interval * 10;
    let mut delay = interval;

    loop {
        sleep(delay).await;

        match run_sync(&state).await {
            SyncOutcome::Failed { reason } => {
                delay = (delay * 2).min(max_delay);
                tracing::warn!(
                    "Cloud sync failed ({reason}); next attempt in {}s",
                    delay.as_secs()
                );
            }
            SyncOutcome::Completed { inserted, .. } => {
                if inserted > 0 {
                    tracing::debug!("Cloud sync loop stored {inserted} new measurements");
                }
                delay = interval;
            }
            SyncOutcome::Skipped => {
                delay = interval;
            }
        }
    }
}
