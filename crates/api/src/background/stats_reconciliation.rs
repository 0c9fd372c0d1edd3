//! Periodic repair of cached user stats.
//!
//! `user_stats` is maintained incrementally inside each ledger transaction.
//! This job recomputes every row from the `xp_events` sum and fixes any that
//! drifted, for example after a manual data correction.

use std::time::Duration;

use homestead_db::repositories::UserStatsRepo;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

/// Run the stats reconciliation loop until `cancel` is triggered.
///
/// The first pass runs immediately on startup.
pub async fn run(pool: PgPool, interval: Duration, cancel: CancellationToken) {
    tracing::info!(
        interval_secs = interval.as_secs(),
        "Stats reconciliation job started"
    );

    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Stats reconciliation job stopping");
                break;
            }
            _ = ticker.tick() => {
                match UserStatsRepo::reconcile_all(&pool).await {
                    Ok(repaired) => {
                        if repaired > 0 {
                            tracing::warn!(repaired, "Stats reconciliation: repaired drifted rows");
                        } else {
                            tracing::debug!("Stats reconciliation: no drift");
                        }
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Stats reconciliation: pass failed");
                    }
                }
            }
        }
    }
}
