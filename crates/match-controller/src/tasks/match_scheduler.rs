//! Matching scheduler background task.
//!
//! Drives one matching cycle per tick on a fixed interval. The loop awaits
//! the full cycle before selecting the next tick, so cycles never overlap;
//! missed ticks are skipped rather than bursted.
//!
//! # Graceful Shutdown
//!
//! The task supports graceful shutdown via a cancellation token. When the
//! token is cancelled, the task completes its current iteration and exits
//! cleanly.

use crate::observability::metrics;
use crate::services::MatchingService;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument};

/// Start the matching scheduler task.
///
/// Runs until the cancellation token is triggered. Any cycle error is
/// caught, logged, and counted; the next tick proceeds normally.
///
/// # Arguments
///
/// * `service` - The composed matchmaking core
/// * `interval` - Tick interval (one cycle per tick)
/// * `cancel_token` - Token for graceful shutdown
#[instrument(skip_all, name = "mm.task.scheduler")]
pub async fn start_match_scheduler(
    service: Arc<MatchingService>,
    interval: Duration,
    cancel_token: CancellationToken,
) {
    info!(
        target: "mm.task.scheduler",
        interval_ms = interval.as_millis(),
        "Starting matching scheduler task"
    );

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            () = cancel_token.cancelled() => {
                info!(
                    target: "mm.task.scheduler",
                    "Matching scheduler received shutdown signal, exiting"
                );
                break;
            }
            _ = ticker.tick() => {
                if let Err(e) = service.run_cycle().await {
                    // Abort this cycle only - the store might recover.
                    error!(
                        target: "mm.task.scheduler",
                        error = %e,
                        "Matching cycle failed"
                    );
                    metrics::increment_cycle_errors();
                }
            }
        }
    }

    info!(
        target: "mm.task.scheduler",
        "Matching scheduler task stopped"
    );
}
