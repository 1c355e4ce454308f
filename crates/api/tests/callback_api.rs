//! Integration tests for `POST /api/callback`.

mod common;

use axum::http::StatusCode;
use common::{build_test_app, expect_json, get, post_json, TestApp};
use serde_json::json;

/// Create a task, admit it, and return `(task id, external job id)`.
async fn generating_task(app: &TestApp) -> (String, String) {
    let created = expect_json(
        post_json(app.router(), "/api/tasks", json!({ "prompt": "A cat in rain" })).await,
        StatusCode::CREATED,
    )
    .await;
    let id = created["task"]["id"].as_str().unwrap().to_string();
    app.admit().await;

    let json = expect_json(
        get(app.router(), &format!("/api/tasks/{id}")).await,
        StatusCode::OK,
    )
    .await;
    let ext = json["task"]["externalJobId"].as_str().unwrap().to_string();
    (id, ext)
}

async fn task_json(app: &TestApp, id: &str) -> serde_json::Value {
    let json = expect_json(
        get(app.router(), &format!("/api/tasks/{id}")).await,
        StatusCode::OK,
    )
    .await;
    json["task"].clone()
}

// ---------------------------------------------------------------------------
// Test: success callback completes the task
// ---------------------------------------------------------------------------

#[tokio::test]
async fn success_callback_completes_task() {
    let app = build_test_app();
    let (id, ext) = generating_task(&app).await;

    let body = json!({
        "code": 200,
        "msg": "success",
        "data": {
            "taskId": ext,
            "state": "success",
            "resultJson": "{\"resultUrls\":[\"http://x/a.mp4\"]}",
            "consumeCredits": 100,
            "costTime": 37,
            "remainedCredits": 4900
        }
    });
    let json = expect_json(
        post_json(app.router(), "/api/callback", body).await,
        StatusCode::OK,
    )
    .await;
    assert!(json["message"].is_string());

    let task = task_json(&app, &id).await;
    assert_eq!(task["status"], "completed");
    assert_eq!(task["progress"], 100);
    assert_eq!(task["result"]["urls"], json!(["http://x/a.mp4"]));
    assert_eq!(task["result"]["consumeCredits"], 100);
    assert_eq!(task["result"]["costTime"], 37);
    assert_eq!(task["result"]["remainedCredits"], 4900);
    assert!(task["error"].is_null());
    assert_eq!(app.engine.in_flight(), 0);
}

// ---------------------------------------------------------------------------
// Test: fail callback fails the task
// ---------------------------------------------------------------------------

#[tokio::test]
async fn fail_callback_fails_task() {
    let app = build_test_app();
    let (id, ext) = generating_task(&app).await;

    let body = json!({ "data": { "taskId": ext, "state": "fail" } });
    expect_json(post_json(app.router(), "/api/callback", body).await, StatusCode::OK).await;

    let task = task_json(&app, &id).await;
    assert_eq!(task["status"], "failed");
    assert_eq!(task["error"], "Generation failed");
    assert_eq!(task["progress"], 0);
    assert!(task["result"].is_null());
}

// ---------------------------------------------------------------------------
// Test: a second signal does not change a finished task
// ---------------------------------------------------------------------------

#[tokio::test]
async fn duplicate_callback_is_noop() {
    let app = build_test_app();
    let (id, ext) = generating_task(&app).await;

    let success = json!({
        "data": {
            "taskId": ext,
            "state": "success",
            "resultJson": "{\"resultUrls\":[\"http://x/a.mp4\"]}"
        }
    });
    let failure = json!({ "data": { "taskId": ext, "state": "fail", "failMsg": "late" } });

    expect_json(post_json(app.router(), "/api/callback", success).await, StatusCode::OK).await;
    expect_json(post_json(app.router(), "/api/callback", failure).await, StatusCode::OK).await;

    let task = task_json(&app, &id).await;
    assert_eq!(task["status"], "completed");
    assert!(task["error"].is_null());
    assert_eq!(app.engine.in_flight(), 0);
}

// ---------------------------------------------------------------------------
// Test: error responses
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unmatched_task_id_is_404_and_mutates_nothing() {
    let app = build_test_app();
    let (id, _) = generating_task(&app).await;

    let body = json!({ "data": { "taskId": "no-such-job", "state": "success" } });
    let json = expect_json(
        post_json(app.router(), "/api/callback", body).await,
        StatusCode::NOT_FOUND,
    )
    .await;
    assert_eq!(json["code"], "NOT_FOUND");

    assert_eq!(task_json(&app, &id).await["status"], "generating");
    assert_eq!(app.engine.task_count().await, 1);
}

#[tokio::test]
async fn missing_data_or_task_id_is_400() {
    let app = build_test_app();

    for body in [json!({}), json!({ "data": {} }), json!({ "data": { "state": "success" } })] {
        let response = post_json(app.router(), "/api/callback", body).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn malformed_result_json_is_400_and_task_untouched() {
    let app = build_test_app();
    let (id, ext) = generating_task(&app).await;

    let body = json!({
        "data": { "taskId": ext, "state": "success", "resultJson": "{oops" }
    });
    let json = expect_json(
        post_json(app.router(), "/api/callback", body).await,
        StatusCode::BAD_REQUEST,
    )
    .await;
    assert_eq!(json["code"], "VALIDATION_ERROR");

    assert_eq!(task_json(&app, &id).await["status"], "generating");
    assert_eq!(app.engine.in_flight(), 1);
}

#[tokio::test]
async fn intermediate_state_is_acknowledged() {
    let app = build_test_app();
    let (id, ext) = generating_task(&app).await;

    let body = json!({ "data": { "taskId": ext, "state": "generating" } });
    expect_json(post_json(app.router(), "/api/callback", body).await, StatusCode::OK).await;

    assert_eq!(task_json(&app, &id).await["status"], "generating");
}
