//! In-process task scheduler for video generation jobs.
//!
//! [`Engine`] owns the task store and wires together the three background
//! jobs: admission (pending tasks into the generation API under a concurrency
//! bound), reconciliation (webhook and status-sweep completion) and retention
//! (dropping old completed tasks). Everything is injected through
//! [`Engine::new`]; there is no global state.

pub mod admission;
pub mod clock;
pub mod config;
pub mod periodic;
pub mod reconciler;
pub mod retention;
pub mod slots;
pub mod store;

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use vidgen_core::{CoreError, JobReport, JobSubmitter, Outcome, Task, TaskId, TaskOptions};
use vidgen_events::{EventBus, TaskEvent};

pub use admission::AdmissionController;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::EngineConfig;
pub use reconciler::{Reconciler, TIMEOUT_MESSAGE};
pub use retention::RetentionSweeper;
pub use slots::InFlightSlots;
pub use store::TaskStore;

pub struct Engine {
    store: Arc<TaskStore>,
    slots: Arc<InFlightSlots>,
    bus: Arc<EventBus>,
    clock: Arc<dyn Clock>,
    admission: Arc<AdmissionController>,
    reconciler: Arc<Reconciler>,
    retention: Arc<RetentionSweeper>,
}

impl Engine {
    /// Build an engine driven by the wall clock.
    pub fn new(
        config: &EngineConfig,
        submitter: Arc<dyn JobSubmitter>,
        bus: Arc<EventBus>,
    ) -> Self {
        Self::with_clock(config, submitter, bus, Arc::new(SystemClock))
    }

    /// Build an engine with an explicit time source.
    pub fn with_clock(
        config: &EngineConfig,
        submitter: Arc<dyn JobSubmitter>,
        bus: Arc<EventBus>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let store = Arc::new(TaskStore::new());
        let slots = Arc::new(InFlightSlots::new(config.max_concurrent));

        let reconciler = Arc::new(Reconciler::new(
            Arc::clone(&store),
            Arc::clone(&slots),
            Arc::clone(&bus),
            Arc::clone(&submitter),
            Arc::clone(&clock),
            config,
        ));
        let admission = Arc::new(AdmissionController::new(
            Arc::clone(&store),
            Arc::clone(&slots),
            Arc::clone(&bus),
            submitter,
            Arc::clone(&clock),
            Arc::clone(&reconciler),
            config.admission_interval,
        ));
        let retention = Arc::new(RetentionSweeper::new(
            Arc::clone(&store),
            Arc::clone(&clock),
            config.retention,
            config.retention_sweep_interval,
        ));

        Self {
            store,
            slots,
            bus,
            clock,
            admission,
            reconciler,
            retention,
        }
    }

    // -----------------------------------------------------------------------
    // Task intake
    // -----------------------------------------------------------------------

    /// Queue one prompt as a `pending` task.
    pub async fn submit(&self, prompt: &str, options: TaskOptions) -> Result<Task, CoreError> {
        if prompt.trim().is_empty() {
            return Err(CoreError::Validation("Prompt is required".into()));
        }

        let task = Task::new(TaskId::now_v7(), prompt, options, self.clock.now());
        self.store.put(task.clone()).await;

        tracing::info!(task_id = %task.id(), "Task created");
        self.bus.publish(TaskEvent::created(task.clone()));
        Ok(task)
    }

    /// Queue several prompts sharing the same options.
    ///
    /// Every prompt is validated before any task is created, so a bad entry
    /// leaves the store untouched.
    pub async fn submit_batch(
        &self,
        prompts: &[String],
        options: TaskOptions,
    ) -> Result<Vec<Task>, CoreError> {
        if prompts.is_empty() {
            return Err(CoreError::Validation("Prompts array is required".into()));
        }
        if let Some(index) = prompts.iter().position(|p| p.trim().is_empty()) {
            return Err(CoreError::Validation(format!("Prompt at index {index} is empty")));
        }

        let now = self.clock.now();
        let tasks: Vec<Task> = prompts
            .iter()
            .map(|prompt| Task::new(TaskId::now_v7(), prompt.as_str(), options.clone(), now))
            .collect();
        self.store.put_all(tasks.iter().cloned()).await;

        tracing::info!(count = tasks.len(), "Batch tasks created");
        for task in &tasks {
            self.bus.publish(TaskEvent::created(task.clone()));
        }
        Ok(tasks)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub async fn get(&self, id: TaskId) -> Result<Task, CoreError> {
        self.store.get(id).await
    }

    /// All tasks, newest first.
    pub async fn list(&self) -> Vec<Task> {
        self.store.list_newest_first().await
    }

    pub async fn task_count(&self) -> usize {
        self.store.len().await
    }

    pub fn in_flight(&self) -> usize {
        self.slots.in_flight()
    }

    pub fn max_concurrent(&self) -> usize {
        self.slots.max()
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Cancel a task if it is `processing` or `generating`.
    ///
    /// The external job keeps running; only the local task stops. Cancelling a
    /// pending or finished task changes nothing. Returns the current snapshot.
    pub async fn cancel(&self, id: TaskId) -> Result<Task, CoreError> {
        let task = self.store.get(id).await?;
        if !task.status().is_active() {
            return Ok(task);
        }
        if self.reconciler.try_complete(id, Outcome::Cancelled).await? {
            tracing::info!(task_id = %id, "Task cancelled");
        }
        self.store.get(id).await
    }

    /// Apply a webhook report from the generation API.
    ///
    /// Returns whether a transition was applied.
    pub async fn handle_callback(&self, report: JobReport) -> Result<bool, CoreError> {
        self.reconciler.handle_callback(report).await
    }

    // -----------------------------------------------------------------------
    // Background jobs
    // -----------------------------------------------------------------------

    /// Run one admission scan. Returns the handles of the submissions it
    /// started.
    pub async fn run_admission(&self) -> Vec<JoinHandle<()>> {
        self.admission.admit().await
    }

    /// Run one reconciliation sweep. Returns the number of tasks resolved.
    pub async fn run_reconciliation(&self) -> usize {
        self.reconciler.sweep().await
    }

    /// Run one retention sweep. Returns the number of tasks removed.
    pub async fn run_retention(&self) -> usize {
        self.retention.sweep().await
    }

    /// Spawn the admission, reconciliation and retention loops. They stop
    /// when `cancel` fires.
    pub fn spawn_loops(&self, cancel: &CancellationToken) -> Vec<JoinHandle<()>> {
        vec![
            tokio::spawn(periodic::run(Arc::clone(&self.admission), cancel.clone())),
            tokio::spawn(periodic::run(Arc::clone(&self.reconciler), cancel.clone())),
            tokio::spawn(periodic::run(Arc::clone(&self.retention), cancel.clone())),
        ]
    }
}
