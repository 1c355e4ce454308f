//! Fixed-interval background jobs.
//!
//! Each loop (admission, reconciliation, retention) implements [`Periodic`]
//! and is driven by [`run`]. The job logic stays callable one tick at a time,
//! which is how tests exercise it.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

#[async_trait]
pub trait Periodic: Send + Sync {
    /// Short name used in log lines.
    fn name(&self) -> &'static str;

    fn interval(&self) -> Duration;

    /// One cycle of work. Errors are handled and logged inside.
    async fn tick(&self);
}

/// Drive `job` every `job.interval()` until `cancel` fires.
///
/// The first tick runs immediately. A tick that overruns its interval delays
/// the next one instead of bursting to catch up.
pub async fn run<P>(job: Arc<P>, cancel: CancellationToken)
where
    P: Periodic + ?Sized,
{
    let mut ticker = tokio::time::interval(job.interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tracing::info!(
        job = job.name(),
        interval_ms = job.interval().as_millis() as u64,
        "Periodic job started",
    );

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!(job = job.name(), "Periodic job shutting down");
                break;
            }
            _ = ticker.tick() => {
                job.tick().await;
            }
        }
    }
}
