//! HTTP API tests against the full router, with a mock runtime.

use std::path::Path;
use std::process::Command;
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use glimpse_core::{RefreshBus, RepoProbe, WorkspaceResolver};
use glimpse_runner::MockRuntime;
use glimpse_server::routes::{app, AppState};
use glimpse_server::{PreviewOrchestrator, ServerConfig};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

struct Fixture {
    router: Router,
    runtime: MockRuntime,
    bus: RefreshBus,
    _root: TempDir,
}

fn fixture() -> Fixture {
    let root = TempDir::new().unwrap();
    let runtime = MockRuntime::new();
    let resolver = WorkspaceResolver::new(root.path());
    let config = ServerConfig {
        projects_root: root.path().to_path_buf(),
        ..ServerConfig::default()
    };
    let orchestrator = Arc::new(PreviewOrchestrator::new(
        Arc::new(runtime.clone()),
        resolver.clone(),
        config.clone(),
    ));
    let bus = RefreshBus::new(8);
    let state = AppState::new(orchestrator, resolver, bus.clone(), config);

    Fixture {
        router: app(state),
        runtime,
        bus,
        _root: root,
    }
}

fn init_workspace(root: &Path, project_id: i64, session: Option<&str>) {
    let mut path = root.join(format!("project-{}", project_id));
    if let Some(session) = session {
        path = path.join("sessions").join(session);
    }
    std::fs::create_dir_all(&path).unwrap();
    Command::new("git")
        .args(["init", "--initial-branch", "main"])
        .current_dir(&path)
        .output()
        .unwrap();
    std::fs::write(path.join("index.js"), "// generated").unwrap();
    Command::new("git")
        .args(["add", "."])
        .current_dir(&path)
        .output()
        .unwrap();
    Command::new("git")
        .args([
            "-c",
            "user.email=test@test",
            "-c",
            "user.name=test",
            "commit",
            "-m",
            "seed",
        ])
        .current_dir(&path)
        .output()
        .unwrap();
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_missing_workspace_is_404_and_never_starts() {
    let f = fixture();

    let response = f.router.clone().oneshot(get("/previews/1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = body_json(response).await;
    assert_eq!(body["error"], "workspace_not_found");
    assert_eq!(f.runtime.launch_count(), 0);
}

#[tokio::test]
async fn test_get_preview_starts_implicitly_then_reuses() {
    if !RepoProbe::is_git_available() {
        println!("Git not available, skipping test");
        return;
    }

    let f = fixture();
    init_workspace(f._root.path(), 7, Some("fix-login"));

    let response = f
        .router
        .clone()
        .oneshot(get("/previews/7?session=fix-login"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["running"], true);
    assert_eq!(body["is_responding"], false);
    assert!(body["preview_url"].as_str().unwrap().starts_with("http://"));
    assert_eq!(f.runtime.launch_count(), 1);

    // Second read reuses the same instance.
    let response = f
        .router
        .clone()
        .oneshot(get("/previews/7?session=fix-login"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(f.runtime.launch_count(), 1);
}

#[tokio::test]
async fn test_post_preview_reports_starting_then_running() {
    if !RepoProbe::is_git_available() {
        println!("Git not available, skipping test");
        return;
    }

    let f = fixture();
    init_workspace(f._root.path(), 7, None);

    let request = post_json("/previews", json!({ "project_id": 7 }));
    let response = f.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["status"], "starting");
    let url = body["url"].as_str().unwrap().to_string();

    let request = post_json("/previews", json!({ "project_id": 7 }));
    let response = f.router.clone().oneshot(request).await.unwrap();
    let body = body_json(response).await;
    assert_eq!(body["status"], "running");
    assert_eq!(body["url"], url.as_str());
    assert_eq!(f.runtime.launch_count(), 1);
}

#[tokio::test]
async fn test_post_preview_start_failure_is_500_with_detail() {
    if !RepoProbe::is_git_available() {
        println!("Git not available, skipping test");
        return;
    }

    let f = fixture();
    init_workspace(f._root.path(), 7, None);
    let _ = f.runtime.clone().simulate_launch_failure("no disk");

    let request = post_json("/previews", json!({ "project_id": 7 }));
    let response = f.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("no disk"));
}

#[tokio::test]
async fn test_traversal_session_is_rejected() {
    let f = fixture();

    let request = post_json(
        "/previews",
        json!({ "project_id": 7, "session_id": "../escape" }),
    );
    let response = f.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_stop_preview() {
    if !RepoProbe::is_git_available() {
        println!("Git not available, skipping test");
        return;
    }

    let f = fixture();
    init_workspace(f._root.path(), 7, None);

    let request = post_json("/previews", json!({ "project_id": 7 }));
    f.router.clone().oneshot(request).await.unwrap();

    let request = Request::builder()
        .method("DELETE")
        .uri("/previews/7")
        .body(Body::empty())
        .unwrap();
    let response = f.router.clone().oneshot(request).await.unwrap();
    let body = body_json(response).await;
    assert_eq!(body["stopped"], true);

    // Stopping again is a harmless no-op.
    let request = Request::builder()
        .method("DELETE")
        .uri("/previews/7")
        .body(Body::empty())
        .unwrap();
    let response = f.router.clone().oneshot(request).await.unwrap();
    let body = body_json(response).await;
    assert_eq!(body["stopped"], false);
}

#[tokio::test]
async fn test_probe_route_collapses_unreachable_to_not_ok() {
    let f = fixture();

    let response = f
        .router
        .clone()
        .oneshot(get(
            "/previews/health?url=http://127.0.0.1:1&timeout_ms=300",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["ok"], false);
}

#[tokio::test]
async fn test_refresh_publish_counts_subscribers() {
    let f = fixture();

    let request = post_json("/previews/refresh", json!({ "projectId": 7 }));
    let response = f.router.clone().oneshot(request).await.unwrap();
    let body = body_json(response).await;
    assert_eq!(body["subscribers"], 0);

    let mut rx = f.bus.subscribe();
    let request = post_json(
        "/previews/refresh",
        json!({ "projectId": 7, "sessionId": "main" }),
    );
    let response = f.router.clone().oneshot(request).await.unwrap();
    let body = body_json(response).await;
    assert_eq!(body["subscribers"], 1);

    let event = rx.recv().await.unwrap();
    assert_eq!(event.project_id, 7);
    assert_eq!(event.session_id.as_deref(), Some("main"));
}
