//! Completion reconciler.
//!
//! Two signals can finish a `generating` task: the webhook callback from the
//! generation API and the periodic status sweep. Both end up in
//! [`Reconciler::try_complete`], which applies the outcome only if the task is
//! still active. Whichever signal lands first wins; the other is a no-op.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use vidgen_core::{
    CoreError, JobReport, JobSubmitter, Outcome, Task, TaskId, TaskStatus, Timestamp,
};
use vidgen_events::{EventBus, TaskEvent};

use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::periodic::Periodic;
use crate::slots::InFlightSlots;
use crate::store::TaskStore;

/// Error recorded on tasks that never received a terminal status.
pub const TIMEOUT_MESSAGE: &str = "Timed out waiting for generation result";

pub struct Reconciler {
    store: Arc<TaskStore>,
    slots: Arc<InFlightSlots>,
    bus: Arc<EventBus>,
    submitter: Arc<dyn JobSubmitter>,
    clock: Arc<dyn Clock>,
    interval: Duration,
    poll_after: Duration,
    timeout: Duration,
}

impl Reconciler {
    pub fn new(
        store: Arc<TaskStore>,
        slots: Arc<InFlightSlots>,
        bus: Arc<EventBus>,
        submitter: Arc<dyn JobSubmitter>,
        clock: Arc<dyn Clock>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            store,
            slots,
            bus,
            submitter,
            clock,
            interval: config.reconcile_interval,
            poll_after: config.status_poll_after,
            timeout: config.generation_timeout,
        }
    }

    /// Apply a terminal outcome to an active task.
    ///
    /// Returns `Ok(true)` if the transition was applied, `Ok(false)` if the
    /// task had already left `processing`/`generating`. The task's in-flight
    /// slot is released only when the transition is applied.
    pub async fn try_complete(&self, id: TaskId, outcome: Outcome) -> Result<bool, CoreError> {
        let now = self.clock.now();
        let target = outcome.status();

        let applied = self
            .store
            .update(id, |task| match task.finish(outcome, now) {
                Ok(()) => Some(task.clone()),
                Err(e) => {
                    tracing::debug!(task_id = %id, error = %e, "Completion signal ignored");
                    None
                }
            })
            .await?;

        let Some(task) = applied else {
            return Ok(false);
        };

        if !self.slots.release(id) {
            tracing::warn!(task_id = %id, "Completed task held no in-flight slot");
        }

        tracing::info!(
            task_id = %id,
            status = %target,
            in_flight = self.slots.in_flight(),
            "Task finished",
        );
        self.bus.publish(TaskEvent::changed(task));
        Ok(true)
    }

    /// Handle a webhook callback from the generation API.
    ///
    /// The report is correlated by external job id. Non-terminal states are
    /// acknowledged without touching the task. A malformed `resultJson` is a
    /// validation error and leaves the task unchanged.
    pub async fn handle_callback(&self, report: JobReport) -> Result<bool, CoreError> {
        let external_id = report
            .task_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| CoreError::Validation("Missing taskId in callback data".into()))?;

        let task = self
            .store
            .find_by_external_id(external_id)
            .await
            .ok_or_else(|| CoreError::task_not_found(external_id))?;

        tracing::info!(
            task_id = %task.id(),
            external_job_id = external_id,
            state = report.state.as_deref().unwrap_or("<none>"),
            "Callback received",
        );

        match report.outcome()? {
            Some(outcome) => self.try_complete(task.id(), outcome).await,
            None => Ok(false),
        }
    }

    /// One sweep over `generating` tasks.
    ///
    /// Tasks past the poll grace period are queried concurrently; tasks past
    /// the generation timeout that are still unresolved are failed. Returns
    /// the number of transitions applied.
    pub async fn sweep(&self) -> usize {
        let now = self.clock.now();
        let stuck: Vec<Task> = self
            .store
            .list_by_status(TaskStatus::Generating)
            .await
            .into_iter()
            .filter(|t| time_generating(t, now) >= self.poll_after)
            .collect();

        if stuck.is_empty() {
            return 0;
        }
        tracing::debug!(count = stuck.len(), "Checking status of long-running tasks");

        let results = join_all(stuck.iter().map(|t| self.reconcile_one(t, now))).await;
        results.into_iter().filter(|applied| *applied).count()
    }

    async fn reconcile_one(&self, task: &Task, now: Timestamp) -> bool {
        let id = task.id();

        if let Some(external_id) = task.external_job_id() {
            match self.submitter.query(external_id).await {
                Ok(report) => match report.outcome() {
                    Ok(Some(outcome)) => return self.apply(id, outcome).await,
                    Ok(None) => {
                        tracing::debug!(
                            task_id = %id,
                            external_job_id = external_id,
                            "Job still running",
                        );
                    }
                    Err(e) => {
                        tracing::warn!(task_id = %id, error = %e, "Unreadable status report");
                    }
                },
                Err(e) => {
                    tracing::warn!(task_id = %id, error = %e, "Status query failed");
                }
            }
        }

        if time_generating(task, now) >= self.timeout {
            tracing::warn!(
                task_id = %id,
                timeout_secs = self.timeout.as_secs(),
                "Task exceeded generation timeout",
            );
            return self.apply(id, Outcome::Failed(TIMEOUT_MESSAGE.into())).await;
        }
        false
    }

    async fn apply(&self, id: TaskId, outcome: Outcome) -> bool {
        match self.try_complete(id, outcome).await {
            Ok(applied) => applied,
            Err(e) => {
                tracing::warn!(task_id = %id, error = %e, "Could not apply sweep outcome");
                false
            }
        }
    }
}

fn time_generating(task: &Task, now: Timestamp) -> Duration {
    task.generating_for(now)
        .and_then(|d| d.to_std().ok())
        .unwrap_or_default()
}

#[async_trait]
impl Periodic for Reconciler {
    fn name(&self) -> &'static str {
        "reconciler"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    async fn tick(&self) {
        let applied = self.sweep().await;
        if applied > 0 {
            tracing::info!(applied, "Reconciliation sweep resolved tasks");
        }
    }
}
