//! HTTP 接口测试

mod common;

use std::sync::Arc;

use access_lifecycle::api::lifecycle_routes;
use access_lifecycle::application::LifecycleRegistry;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use common::{RecordingProvisioning, memory_deps, settle};
use serde_json::{Value, json};
use tower::ServiceExt;

fn app() -> Router {
    let registry = Arc::new(LifecycleRegistry::new(memory_deps(
        RecordingProvisioning::new(),
    )));
    lifecycle_routes(registry)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let (status, _, value) = send_raw(app, method, uri, body.map(|b| b.to_string())).await;
    (status, value)
}

/// 原样发送请求体，返回状态码、content-type 和解析后的 JSON
async fn send_raw(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<String>,
) -> (StatusCode, String, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, content_type, value)
}

#[tokio::test]
async fn test_grant_and_query_over_http() {
    let app = app();

    let (status, body) = send(
        &app,
        "POST",
        "/subjects",
        Some(json!({ "subject_id": "employee-100001" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["subject_id"], "employee-100001");
    assert_eq!(body["status"], "running");

    let (status, _) = send(
        &app,
        "POST",
        "/subjects/employee-100001/grant",
        Some(json!({
            "application_name": "Salesforce",
            "permission_level": "Admin",
            "expiry_seconds": 0
        })),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    settle().await;

    let (status, access) = send(&app, "GET", "/subjects/employee-100001/access", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(access["Salesforce"]["permission_level"], "Admin");
    assert_eq!(access["Salesforce"]["status"], "active");
    assert_eq!(access["Salesforce"]["expiry_seconds"], 0);

    let (status, history) = send(&app, "GET", "/subjects/employee-100001/history", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history[0]["kind"], "grant");

    let (status, list) = send(&app, "GET", "/subjects", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_start_without_id_generates_one() {
    let app = app();

    let (status, body) = send(&app, "POST", "/subjects", Some(json!({}))).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["subject_id"].as_str().unwrap();
    assert!(id.starts_with("employee-"));

    let (status, body) = send(&app, "GET", &format!("/subjects/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "running");
}

#[tokio::test]
async fn test_unknown_subject_is_problem_details_404() {
    let app = app();

    let (status, body) = send(&app, "GET", "/subjects/employee-999999/access", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], 404);
    assert!(body["detail"].as_str().unwrap().contains("employee-999999"));
}

#[tokio::test]
async fn test_invalid_grant_is_400() {
    let app = app();
    send(
        &app,
        "POST",
        "/subjects",
        Some(json!({ "subject_id": "employee-100002" })),
    )
    .await;

    let (status, body) = send(
        &app,
        "POST",
        "/subjects/employee-100002/grant",
        Some(json!({ "application_name": "", "permission_level": "Admin" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], 400);
}

#[tokio::test]
async fn test_duplicate_start_is_409() {
    let app = app();
    let request = json!({ "subject_id": "employee-100003" });

    send(&app, "POST", "/subjects", Some(request.clone())).await;
    let (status, _) = send(&app, "POST", "/subjects", Some(request)).await;

    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_negative_expiry_is_problem_details_400() {
    let app = app();
    send(
        &app,
        "POST",
        "/subjects",
        Some(json!({ "subject_id": "employee-100004" })),
    )
    .await;

    let (status, content_type, body) = send_raw(
        &app,
        "POST",
        "/subjects/employee-100004/grant",
        Some(
            json!({
                "application_name": "Office365",
                "permission_level": "User",
                "expiry_seconds": -5
            })
            .to_string(),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(content_type, "application/problem+json");
    assert_eq!(body["status"], 400);
}

#[tokio::test]
async fn test_missing_field_is_problem_details_400() {
    let app = app();
    send(
        &app,
        "POST",
        "/subjects",
        Some(json!({ "subject_id": "employee-100005" })),
    )
    .await;

    let (status, content_type, body) = send_raw(
        &app,
        "POST",
        "/subjects/employee-100005/revoke",
        Some("{}".to_string()),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(content_type, "application/problem+json");
    assert!(body["detail"].as_str().unwrap().contains("application_name"));

    let (status, content_type, _) = send_raw(
        &app,
        "POST",
        "/subjects/employee-100005/grant",
        Some("not json".to_string()),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(content_type, "application/problem+json");
}

#[tokio::test]
async fn test_start_accepts_empty_body() {
    let app = app();

    let (status, _, body) = send_raw(&app, "POST", "/subjects", None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body["subject_id"].as_str().unwrap().starts_with("employee-"));

    let (status, content_type, _) =
        send_raw(&app, "POST", "/subjects", Some("[1, 2".to_string())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(content_type, "application/problem+json");
}
