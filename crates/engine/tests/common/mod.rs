#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde_json::Number;
use tokio::sync::Semaphore;
use vidgen_core::{JobReport, JobSubmitter, SubmissionError, TaskOptions};
use vidgen_engine::{Engine, EngineConfig, ManualClock};
use vidgen_events::EventBus;

/// Scripted stand-in for the generation API.
///
/// Accepts every prompt with `ext-<n>` ids unless the prompt was marked as
/// failing. Status queries answer from `reports`, defaulting to "still
/// running". When built with [`FakeSubmitter::gated`], each submission waits
/// for a permit so tests can observe tasks while they are `processing`.
#[derive(Default)]
pub struct FakeSubmitter {
    submitted: Mutex<Vec<String>>,
    failing: Mutex<HashSet<String>>,
    reports: Mutex<HashMap<String, JobReport>>,
    queries: AtomicUsize,
    gate: Option<Arc<Semaphore>>,
}

impl FakeSubmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gated(gate: Arc<Semaphore>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::default()
        }
    }

    pub fn fail_prompt(&self, prompt: &str) {
        self.failing.lock().unwrap().insert(prompt.to_string());
    }

    pub fn set_report(&self, external_id: &str, report: JobReport) {
        self.reports
            .lock()
            .unwrap()
            .insert(external_id.to_string(), report);
    }

    pub fn submitted(&self) -> Vec<String> {
        self.submitted.lock().unwrap().clone()
    }

    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl JobSubmitter for FakeSubmitter {
    async fn submit(&self, prompt: &str, _options: &TaskOptions) -> Result<String, SubmissionError> {
        let n = {
            let mut submitted = self.submitted.lock().unwrap();
            submitted.push(prompt.to_string());
            submitted.len()
        };

        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }

        if self.failing.lock().unwrap().contains(prompt) {
            return Err(SubmissionError::Rejected {
                code: 402,
                message: "Insufficient credits".into(),
            });
        }
        Ok(format!("ext-{n}"))
    }

    async fn query(&self, external_job_id: &str) -> Result<JobReport, SubmissionError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .reports
            .lock()
            .unwrap()
            .get(external_job_id)
            .cloned()
            .unwrap_or_else(|| JobReport {
                task_id: Some(external_job_id.to_string()),
                state: Some("generating".into()),
                ..Default::default()
            }))
    }
}

pub struct Harness {
    pub engine: Engine,
    pub submitter: Arc<FakeSubmitter>,
    pub clock: Arc<ManualClock>,
    pub bus: Arc<EventBus>,
}

pub fn config(max_concurrent: usize) -> EngineConfig {
    EngineConfig {
        max_concurrent,
        ..EngineConfig::default()
    }
}

pub fn harness(max_concurrent: usize) -> Harness {
    harness_with(config(max_concurrent), FakeSubmitter::new())
}

pub fn harness_with(config: EngineConfig, submitter: FakeSubmitter) -> Harness {
    let submitter = Arc::new(submitter);
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
    ));
    let bus = Arc::new(EventBus::default());
    let engine = Engine::with_clock(
        &config,
        Arc::clone(&submitter) as Arc<dyn JobSubmitter>,
        Arc::clone(&bus),
        Arc::clone(&clock) as Arc<dyn vidgen_engine::Clock>,
    );
    Harness {
        engine,
        submitter,
        clock,
        bus,
    }
}

/// Run one admission scan and wait for every submission it started.
pub async fn admit_and_settle(engine: &Engine) -> usize {
    let handles = engine.run_admission().await;
    let started = handles.len();
    for handle in handles {
        handle.await.unwrap();
    }
    started
}

pub fn success_report(external_id: &str, urls: &[&str]) -> JobReport {
    let result_json = serde_json::json!({ "resultUrls": urls }).to_string();
    JobReport {
        task_id: Some(external_id.to_string()),
        state: Some("success".into()),
        result_json: Some(result_json),
        consume_credits: Some(Number::from(100u64)),
        cost_time: Some(Number::from(42u64)),
        remained_credits: Some(Number::from(900u64)),
        ..Default::default()
    }
}

pub fn fail_report(external_id: &str, message: &str) -> JobReport {
    JobReport {
        task_id: Some(external_id.to_string()),
        state: Some("fail".into()),
        fail_msg: Some(message.to_string()),
        ..Default::default()
    }
}
