// ABOUTME: Tests for the HTTP control plane's filesystem-backed routes.
// ABOUTME: Exercises the router directly with tower's oneshot; no daemon required.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use reflow::api::{router, ApiState};
use reflow::runtime::RuntimeClient;
use tower::ServiceExt;

fn state(base: &std::path::Path) -> ApiState {
    // The client connects lazily; filesystem-backed routes never touch it.
    let docker = RuntimeClient::from_docker(
        bollard::Docker::connect_with_local_defaults().expect("client construction is local"),
    );
    ApiState::new(base.to_path_buf(), docker)
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn list_projects_empty() {
    let dir = tempfile::tempdir().unwrap();
    let app = router(state(dir.path()));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/projects")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, serde_json::json!([]));
}

#[tokio::test]
async fn status_of_missing_project_is_404() {
    let dir = tempfile::tempdir().unwrap();
    let app = router(state(dir.path()));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/projects/ghost")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("ghost"));
}

#[tokio::test]
async fn create_project_validates_name() {
    let dir = tempfile::tempdir().unwrap();
    let app = router(state(dir.path()));

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/projects")
                .header("content-type", "application/json")
                .body(Body::from(
                    r#"{"name":"Not_Valid","repoURL":"git@example.com:x/y.git"}"#,
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["error"].as_str().is_some());
}

#[tokio::test]
async fn deployment_history_defaults_empty() {
    let dir = tempfile::tempdir().unwrap();
    let app = router(state(dir.path()));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/projects/myblog/deployments?env=prod&outcome=failure")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, serde_json::json!([]));
}

#[tokio::test]
async fn invalid_outcome_filter_is_400() {
    let dir = tempfile::tempdir().unwrap();
    let app = router(state(dir.path()));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/projects/myblog/deployments?outcome=exploded")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_route_is_json_404() {
    let dir = tempfile::tempdir().unwrap();
    let app = router(state(dir.path()));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/nonsense")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("/api/v1/nonsense"));
}
