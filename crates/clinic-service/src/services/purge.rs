//! Background cleanup of dead refresh tokens and idle lock entries

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info};

use super::context::ServiceContext;
use super::error::ServiceResult;
use super::refresh_token::RefreshTokenStore;

/// Outcome of one purge pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PurgeReport {
    pub deleted_tokens: u64,
    pub pruned_locks: usize,
}

/// Run a single purge pass
pub async fn purge_once(ctx: &ServiceContext) -> ServiceResult<PurgeReport> {
    let deleted_tokens = RefreshTokenStore::new(ctx).purge_expired_or_revoked().await?;
    let pruned_locks = ctx.account_locks().prune();

    Ok(PurgeReport {
        deleted_tokens,
        pruned_locks,
    })
}

/// Spawn the periodic purge loop
///
/// The first pass runs one full `every` after startup. Failures are logged
/// and the loop keeps going; abort the returned handle to stop it.
pub fn spawn_purge_task(ctx: ServiceContext, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;

            match purge_once(&ctx).await {
                Ok(report) if report.deleted_tokens > 0 || report.pruned_locks > 0 => {
                    info!(
                        deleted_tokens = report.deleted_tokens,
                        pruned_locks = report.pruned_locks,
                        "Purged refresh tokens"
                    );
                }
                Ok(_) => debug!("Purge pass found nothing to delete"),
                Err(e) => error!(error = %e, "Refresh token purge failed"),
            }
        }
    })
}
