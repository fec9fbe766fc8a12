/// Background maintenance for the functions server
use crate::functions::{db, remove_tmp, FunctionsContext};
use crate::metrics;
use chrono::{Duration as ChronoDuration, Utc};
use tokio::time::{interval, Duration};
use tracing::{error, info};

/// Sweep interval for orphaned pending drafts
const SWEEP_INTERVAL_SECS: u64 = 6 * 3600;

/// Start the background jobs
pub fn start(ctx: FunctionsContext) {
    info!("Starting functions maintenance jobs");
    tokio::spawn(draft_sweep_job(ctx));
}

/// Periodically remove pending drafts whose upload never finished: their
/// storage directory is swept and the row deleted, the same path an owner
/// delete takes.
async fn draft_sweep_job(ctx: FunctionsContext) {
    let mut ticker = interval(Duration::from_secs(SWEEP_INTERVAL_SECS));

    loop {
        ticker.tick().await;

        match sweep_stale_drafts(&ctx).await {
            Ok(0) => info!("draft sweep: nothing to remove"),
            Ok(count) => info!("draft sweep removed {} stale drafts", count),
            Err(e) => error!("draft sweep failed: {}", e),
        }
    }
}

async fn sweep_stale_drafts(ctx: &FunctionsContext) -> crate::error::PartnerResult<u64> {
    let cutoff = Utc::now() - ChronoDuration::hours(ctx.config.draft_sweep_age_hours);
    let stale = db::stale_pending_drafts(&ctx.db, cutoff).await?;

    let mut removed = 0;
    for draft in stale {
        remove_tmp::sweep_storage_prefix(ctx, &draft.storage_key).await;
        db::delete_media(&ctx.db, draft.id).await?;
        metrics::DRAFTS_SWEPT.inc();
        removed += 1;
    }

    Ok(removed)
}
