#![allow(dead_code)]

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, Response, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use vidgen_api::config::ServerConfig;
use vidgen_api::router::build_app_router;
use vidgen_api::state::AppState;
use vidgen_api::ws::WsManager;
use vidgen_core::{JobReport, JobSubmitter, SubmissionError, TaskOptions};
use vidgen_engine::{Engine, EngineConfig};
use vidgen_events::EventBus;

/// Generation API stand-in: accepts every prompt as `ext-<n>` unless the
/// prompt was marked as failing.
#[derive(Default)]
pub struct FakeSubmitter {
    count: AtomicUsize,
    failing: Mutex<HashSet<String>>,
}

impl FakeSubmitter {
    pub fn fail_prompt(&self, prompt: &str) {
        self.failing.lock().unwrap().insert(prompt.to_string());
    }
}

#[async_trait]
impl JobSubmitter for FakeSubmitter {
    async fn submit(&self, prompt: &str, _options: &TaskOptions) -> Result<String, SubmissionError> {
        if self.failing.lock().unwrap().contains(prompt) {
            return Err(SubmissionError::Transport("connection refused".into()));
        }
        let n = self.count.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("ext-{n}"))
    }

    async fn query(&self, external_job_id: &str) -> Result<JobReport, SubmissionError> {
        Ok(JobReport {
            task_id: Some(external_job_id.to_string()),
            state: Some("generating".into()),
            ..Default::default()
        })
    }
}

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["*".to_string()],
        request_timeout_secs: 30,
        static_dir: PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/static"),
    }
}

/// A router plus handles on the pieces behind it.
pub struct TestApp {
    pub router: Router,
    pub engine: Arc<Engine>,
    pub submitter: Arc<FakeSubmitter>,
}

impl TestApp {
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run one admission cycle and wait for its submissions to finish.
    pub async fn admit(&self) {
        for handle in self.engine.run_admission().await {
            handle.await.unwrap();
        }
    }
}

/// Build the full application router with all middleware layers.
///
/// Uses [`build_app_router`] so tests exercise the same middleware stack
/// production does.
pub fn build_test_app() -> TestApp {
    build_test_app_with(test_config())
}

pub fn build_test_app_with(config: ServerConfig) -> TestApp {
    let submitter = Arc::new(FakeSubmitter::default());
    let event_bus = Arc::new(EventBus::default());
    let engine = Arc::new(Engine::new(
        &EngineConfig::default(),
        Arc::clone(&submitter) as Arc<dyn JobSubmitter>,
        event_bus,
    ));

    let state = AppState {
        engine: Arc::clone(&engine),
        ws_manager: Arc::new(WsManager::new()),
    };

    TestApp {
        router: build_app_router(state, &config),
        engine,
        submitter,
    }
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn send(app: Router, method: Method, uri: &str, body: Option<&str>) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    app.oneshot(builder.body(body).unwrap()).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, None).await
}

pub async fn post_json(app: Router, uri: &str, json: serde_json::Value) -> Response<Body> {
    send(app, Method::POST, uri, Some(&json.to_string())).await
}

pub async fn delete(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::DELETE, uri, None).await
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Assert the status and return the parsed body.
pub async fn expect_json(response: Response<Body>, status: StatusCode) -> serde_json::Value {
    assert_eq!(response.status(), status);
    body_json(response).await
}
