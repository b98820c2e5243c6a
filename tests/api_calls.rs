mod common;

use anyhow::Result;
use axum::http::StatusCode;
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Value};

use common::{FakeBackend, Harness, CSRF_VALUE, PASSWORD};
use studio_gate::errors::AppError;

#[derive(Debug, Deserialize)]
struct Workload {
    id: u64,
    title: String,
}

#[tokio::test]
async fn authenticated_read_decodes_the_body() -> Result<()> {
    let backend = FakeBackend::start().await?;
    let harness = Harness::new(&backend)?;
    harness.manager.login("editor@example.com", PASSWORD, false).await?;

    let workloads: Vec<Workload> = harness.manager.get_json("/api/workloads").await?;
    assert_eq!(workloads.len(), 1);
    assert_eq!(workloads[0].id, 1);
    assert_eq!(workloads[0].title, "Santos wedding edit");
    Ok(())
}

#[tokio::test]
async fn mutation_carries_the_csrf_header() -> Result<()> {
    let backend = FakeBackend::start().await?;
    let harness = Harness::new(&backend)?;
    harness.manager.login("owner@example.com", PASSWORD, false).await?;

    let created: Value = harness
        .manager
        .send_json(Method::POST, "/api/workloads", &json!({ "title": "Reyes debut" }))
        .await?;

    assert_eq!(created["title"], "Reyes debut");
    assert_eq!(
        backend.state.workload_csrf.lock().unwrap().as_deref(),
        Some(CSRF_VALUE)
    );
    Ok(())
}

#[tokio::test]
async fn server_error_leaves_the_session_alone() -> Result<()> {
    let backend = FakeBackend::start().await?;
    let harness = Harness::new(&backend)?;
    harness.manager.login("owner@example.com", PASSWORD, false).await?;
    *backend.state.workload_status.lock().unwrap() = StatusCode::INTERNAL_SERVER_ERROR;

    let err = harness
        .manager
        .get_json::<Value>("/api/workloads")
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Upstream { status: 500 }));
    assert!(!err.is_definitely_unauthenticated());
    assert!(harness.manager.snapshot().is_authenticated);
    assert!(harness.navigator.visited().is_empty());
    Ok(())
}

#[tokio::test]
async fn unauthorized_response_sends_the_user_to_login() -> Result<()> {
    let backend = FakeBackend::start().await?;
    let harness = Harness::new(&backend)?;
    harness.manager.login("owner@example.com", PASSWORD, false).await?;
    // token revoked elsewhere, e.g. another tab signed out
    *backend.state.workload_status.lock().unwrap() = StatusCode::UNAUTHORIZED;

    let err = harness
        .manager
        .get_json::<Value>("/api/workloads")
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Unauthenticated));
    assert_eq!(harness.navigator.visited(), vec!["/login".to_string()]);
    Ok(())
}

#[tokio::test]
async fn calls_without_a_session_never_leave_the_client() -> Result<()> {
    let backend = FakeBackend::start().await?;
    let harness = Harness::new(&backend)?;

    let err = harness
        .manager
        .send_json::<Value, _>(Method::POST, "/api/workloads", &json!({ "title": "x" }))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Unauthenticated));
    assert!(backend.state.workload_csrf.lock().unwrap().is_none());
    assert_eq!(harness.navigator.visited(), vec!["/login".to_string()]);
    Ok(())
}
