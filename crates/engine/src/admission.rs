//! Admission controller.
//!
//! Moves `pending` tasks into the external generation API, oldest first,
//! while keeping at most `max_concurrent` tasks in flight. Each admitted task
//! is submitted on its own tokio task so a slow API call never holds up the
//! scan.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use vidgen_core::{JobSubmitter, Outcome, Task, TaskStatus};
use vidgen_events::{EventBus, TaskEvent};

use crate::clock::Clock;
use crate::periodic::Periodic;
use crate::reconciler::Reconciler;
use crate::slots::InFlightSlots;
use crate::store::TaskStore;

#[derive(Clone)]
pub struct AdmissionController {
    store: Arc<TaskStore>,
    slots: Arc<InFlightSlots>,
    bus: Arc<EventBus>,
    submitter: Arc<dyn JobSubmitter>,
    clock: Arc<dyn Clock>,
    reconciler: Arc<Reconciler>,
    interval: Duration,
}

impl AdmissionController {
    pub fn new(
        store: Arc<TaskStore>,
        slots: Arc<InFlightSlots>,
        bus: Arc<EventBus>,
        submitter: Arc<dyn JobSubmitter>,
        clock: Arc<dyn Clock>,
        reconciler: Arc<Reconciler>,
        interval: Duration,
    ) -> Self {
        Self {
            store,
            slots,
            bus,
            submitter,
            clock,
            reconciler,
            interval,
        }
    }

    /// One admission scan.
    ///
    /// Capacity is checked again before every admission. The scan stops at
    /// the first task that finds no free slot so later tasks never overtake
    /// it. Returns the handles of the submissions started by this scan.
    pub async fn admit(&self) -> Vec<JoinHandle<()>> {
        let pending = self.store.list_by_status(TaskStatus::Pending).await;
        let mut started = Vec::new();

        for task in pending {
            let id = task.id();
            if !self.slots.try_acquire(id) {
                tracing::debug!(
                    in_flight = self.slots.in_flight(),
                    max = self.slots.max(),
                    "No free slot; admission deferred",
                );
                break;
            }

            let now = self.clock.now();
            let admitted = self
                .store
                .update(id, |t| t.begin_processing(now).map(|()| t.clone()))
                .await;

            let task = match admitted {
                Ok(Ok(task)) => task,
                Ok(Err(e)) => {
                    self.slots.release(id);
                    tracing::debug!(task_id = %id, error = %e, "Task no longer pending");
                    continue;
                }
                Err(e) => {
                    self.slots.release(id);
                    tracing::debug!(task_id = %id, error = %e, "Task vanished before admission");
                    continue;
                }
            };

            tracing::info!(
                task_id = %id,
                in_flight = self.slots.in_flight(),
                "Task admitted",
            );
            self.bus.publish(TaskEvent::changed(task.clone()));

            let this = self.clone();
            started.push(tokio::spawn(async move { this.submit(task).await }));
        }

        started
    }

    async fn submit(&self, task: Task) {
        let id = task.id();

        match self.submitter.submit(task.prompt(), task.options()).await {
            Ok(external_id) => {
                let now = self.clock.now();
                let accepted = self
                    .store
                    .update(id, |t| {
                        t.begin_generating(external_id.as_str(), now)
                            .map(|()| t.clone())
                    })
                    .await;

                match accepted {
                    Ok(Ok(task)) => {
                        tracing::info!(
                            task_id = %id,
                            external_job_id = %external_id,
                            "Generation job accepted",
                        );
                        self.bus.publish(TaskEvent::changed(task));
                    }
                    Ok(Err(e)) => {
                        // Cancelled while the submission was in flight.
                        tracing::info!(
                            task_id = %id,
                            external_job_id = %external_id,
                            error = %e,
                            "Discarding acceptance for task that left processing",
                        );
                    }
                    Err(e) => {
                        tracing::warn!(task_id = %id, error = %e, "Accepted task no longer stored");
                    }
                }
            }
            Err(e) => {
                tracing::error!(task_id = %id, error = %e, "Task submission failed");
                if let Err(e) = self
                    .reconciler
                    .try_complete(id, Outcome::Failed(e.to_string()))
                    .await
                {
                    tracing::warn!(task_id = %id, error = %e, "Could not record submission failure");
                }
            }
        }
    }
}

#[async_trait]
impl Periodic for AdmissionController {
    fn name(&self) -> &'static str {
        "admission"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    async fn tick(&self) {
        // Submissions finish on their own; the loop does not wait for them.
        drop(self.admit().await);
    }
}
