//! Periodic cleanup of old completed tasks.
//!
//! Completed tasks whose `createdAt` is older than the retention window are
//! removed from the store. Failed and cancelled tasks are kept.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use vidgen_core::TaskStatus;

use crate::clock::Clock;
use crate::periodic::Periodic;
use crate::store::TaskStore;

pub struct RetentionSweeper {
    store: Arc<TaskStore>,
    clock: Arc<dyn Clock>,
    retention: Duration,
    interval: Duration,
}

impl RetentionSweeper {
    pub fn new(
        store: Arc<TaskStore>,
        clock: Arc<dyn Clock>,
        retention: Duration,
        interval: Duration,
    ) -> Self {
        Self {
            store,
            clock,
            retention,
            interval,
        }
    }

    /// Remove expired completed tasks. Returns how many were removed.
    pub async fn sweep(&self) -> usize {
        let cutoff = chrono::Duration::from_std(self.retention)
            .ok()
            .and_then(|retention| self.clock.now().checked_sub_signed(retention));
        let Some(cutoff) = cutoff else {
            tracing::debug!(
                retention_secs = self.retention.as_secs(),
                "Retention window reaches past the earliest timestamp; nothing can expire",
            );
            return 0;
        };

        self.store
            .delete_where(|t| t.status() == TaskStatus::Completed && t.created_at() < cutoff)
            .await
    }
}

#[async_trait]
impl Periodic for RetentionSweeper {
    fn name(&self) -> &'static str {
        "retention"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    async fn tick(&self) {
        let deleted = self.sweep().await;
        if deleted > 0 {
            tracing::info!(deleted, "Task retention: purged completed tasks");
        } else {
            tracing::debug!("Task retention: nothing to purge");
        }
    }
}
