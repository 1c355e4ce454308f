//! Tests for `AppError` to HTTP response mapping.
//!
//! These call `IntoResponse` directly on `AppError` values; no router needed.

use axum::body::Body;
use axum::http::{header, Response, StatusCode};
use axum::response::IntoResponse;
use http_body_util::BodyExt;
use vidgen_api::error::{json_error_body, panic_response, AppError};
use vidgen_core::CoreError;

/// Helper: convert an `AppError` into its status code and parsed JSON body.
async fn error_to_response(err: AppError) -> (StatusCode, serde_json::Value) {
    split_json(err.into_response()).await
}

async fn split_json(response: Response<Body>) -> (StatusCode, serde_json::Value) {
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    (status, json)
}

// ---------------------------------------------------------------------------
// Test: CoreError::NotFound maps to 404 with NOT_FOUND code
// ---------------------------------------------------------------------------

#[tokio::test]
async fn not_found_error_returns_404() {
    let err = AppError::Core(CoreError::task_not_found("ext-42"));

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "NOT_FOUND");
    assert_eq!(json["error"], "Task with id ext-42 not found");
}

// ---------------------------------------------------------------------------
// Test: CoreError::Validation maps to 400 with VALIDATION_ERROR code
// ---------------------------------------------------------------------------

#[tokio::test]
async fn validation_error_returns_400() {
    let err = AppError::Core(CoreError::Validation("Prompt is required".into()));

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "VALIDATION_ERROR");
    assert_eq!(json["error"], "Prompt is required");
}

// ---------------------------------------------------------------------------
// Test: AppError::BadRequest maps to 400 with BAD_REQUEST code
// ---------------------------------------------------------------------------

#[tokio::test]
async fn bad_request_error_returns_400() {
    let err = AppError::BadRequest("Invalid callback data".into());

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "BAD_REQUEST");
    assert_eq!(json["error"], "Invalid callback data");
}

// ---------------------------------------------------------------------------
// Test: internal errors are sanitized
// ---------------------------------------------------------------------------

#[tokio::test]
async fn core_internal_error_hides_details() {
    let err = AppError::Core(CoreError::Internal("store lock poisoned".into()));

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["code"], "INTERNAL_ERROR");
    assert_eq!(json["error"], "An internal error occurred");
}

#[tokio::test]
async fn app_internal_error_hides_details() {
    let err = AppError::InternalError("secret connection string".into());

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["code"], "INTERNAL_ERROR");
    assert!(!json["error"].as_str().unwrap().contains("secret"));
}

// ---------------------------------------------------------------------------
// Test: handler panics become sanitized JSON 500s
// ---------------------------------------------------------------------------

#[tokio::test]
async fn panic_payloads_become_internal_errors() {
    let payloads: Vec<Box<dyn std::any::Any + Send>> = vec![
        Box::new("index out of bounds"),
        Box::new(String::from("lock poisoned")),
        Box::new(42_u32),
    ];

    for payload in payloads {
        let (status, json) = split_json(panic_response(payload)).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["code"], "INTERNAL_ERROR");
        assert_eq!(json["error"], "An internal error occurred");
    }
}

// ---------------------------------------------------------------------------
// Test: bodiless error responses get a JSON body
// ---------------------------------------------------------------------------

#[tokio::test]
async fn bare_timeout_gets_json_body_and_keeps_headers() {
    let bare = Response::builder()
        .status(StatusCode::REQUEST_TIMEOUT)
        .header("x-request-id", "req-1")
        .body(Body::empty())
        .unwrap();

    let response = json_error_body(bare).await;

    assert_eq!(response.headers()["x-request-id"], "req-1");
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
    let (status, json) = split_json(response).await;
    assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
    assert_eq!(json["code"], "REQUEST_TIMEOUT");
    assert_eq!(json["error"], "Request Timeout");
}

#[tokio::test]
async fn responses_with_a_body_are_left_alone() {
    let (_, original) = error_to_response(AppError::BadRequest("Invalid callback data".into())).await;
    let response = json_error_body(
        AppError::BadRequest("Invalid callback data".into()).into_response(),
    )
    .await;
    let (status, json) = split_json(response).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json, original);

    let ok = Response::builder()
        .status(StatusCode::OK)
        .body(Body::empty())
        .unwrap();
    let response = json_error_body(ok).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(header::CONTENT_TYPE).is_none());
}
