//! Contract tests for the preview orchestrator.

use std::collections::HashMap;
use std::sync::Arc;

use glimpse_core::{WorkspaceKey, WorkspaceResolver};
use glimpse_runner::MockRuntime;
use glimpse_server::{PreviewOrchestrator, ServerConfig, ServerError};

fn orchestrator(runtime: MockRuntime) -> PreviewOrchestrator {
    let resolver = WorkspaceResolver::new("/srv/projects");
    PreviewOrchestrator::new(Arc::new(runtime), resolver, ServerConfig::default())
}

fn key(project: i64, session: &str) -> WorkspaceKey {
    WorkspaceKey::new(project, Some(session)).unwrap()
}

#[tokio::test]
async fn test_start_twice_reuses_instance() {
    let runtime = MockRuntime::new();
    let orch = orchestrator(runtime.clone());
    let k = key(7, "main");

    let first = orch.start(&k, HashMap::new(), None).await.unwrap();
    let second = orch.start(&k, HashMap::new(), None).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(runtime.launch_count(), 1);
    assert_eq!(orch.instance_count(), 1);
}

#[tokio::test]
async fn test_concurrent_starts_spawn_one_container() {
    let runtime = MockRuntime::new().launch_delay_ms(50);
    let orch = Arc::new(orchestrator(runtime.clone()));
    let k = key(7, "main");

    let (a, b) = tokio::join!(
        orch.start(&k, HashMap::new(), None),
        orch.start(&k, HashMap::new(), None),
    );

    assert_eq!(a.unwrap(), b.unwrap());
    assert_eq!(runtime.launch_count(), 1);
    assert_eq!(orch.instance_count(), 1);
}

#[tokio::test]
async fn test_unrelated_workspaces_start_independently() {
    let runtime = MockRuntime::new().launch_delay_ms(20);
    let orch = Arc::new(orchestrator(runtime.clone()));

    let k1 = key(1, "main");
    let k2 = key(2, "main");
    let (a, b) = tokio::join!(
        orch.start(&k1, HashMap::new(), None),
        orch.start(&k2, HashMap::new(), None),
    );

    assert_ne!(a.unwrap(), b.unwrap());
    assert_eq!(runtime.launch_count(), 2);
    assert_eq!(orch.instance_count(), 2);
}

#[tokio::test]
async fn test_status_never_spawns() {
    let runtime = MockRuntime::new();
    let orch = orchestrator(runtime.clone());
    let k = key(7, "main");

    for _ in 0..3 {
        let status = orch.status(&k).await;
        assert!(!status.running);
        assert!(!status.responding);
        assert!(status.url.is_none());
    }

    assert_eq!(runtime.launch_count(), 0);
    assert_eq!(orch.instance_count(), 0);
}

#[tokio::test]
async fn test_status_is_side_effect_free_for_dead_instance() {
    let runtime = MockRuntime::new();
    let orch = orchestrator(runtime.clone());
    let k = key(7, "main");

    let url = orch.start(&k, HashMap::new(), None).await.unwrap();

    let status_before = orch.status(&k).await;
    assert!(status_before.running);

    // Tear the container down out of band, then confirm status reports it
    // dead without dropping the registry entry.
    orch_kill(&runtime);
    let status = orch.status(&k).await;
    assert!(!status.running);
    assert_eq!(status.url.as_deref(), Some(url.as_str()));
    assert_eq!(orch.instance_count(), 1);
}

/// Kill every container the mock runtime knows about.
fn orch_kill(runtime: &MockRuntime) {
    // Launch responses are the only place container ids surface; the mock
    // exposes kill_container by id.
    for call in runtime.get_method_calls("is_running") {
        if let Some(id) = call.container {
            runtime.kill_container(&id);
        }
    }
}

#[tokio::test]
async fn test_dead_instance_is_relaunched() {
    let runtime = MockRuntime::new();
    let orch = orchestrator(runtime.clone());
    let k = key(7, "main");

    let first = orch.start(&k, HashMap::new(), None).await.unwrap();

    // Run a status pass so the mock records the container id, then kill it.
    let _ = orch.status(&k).await;
    orch_kill(&runtime);

    let second = orch.start(&k, HashMap::new(), None).await.unwrap();
    assert_ne!(first, second);
    assert_eq!(runtime.launch_count(), 2);
    assert_eq!(orch.instance_count(), 1);
}

#[tokio::test]
async fn test_launch_failure_leaves_no_registration() {
    let runtime = MockRuntime::new().simulate_launch_failure("out of disk");
    let orch = orchestrator(runtime.clone());
    let k = key(7, "main");

    let result = orch.start(&k, HashMap::new(), None).await;
    assert!(matches!(result, Err(ServerError::StartFailed(_))));
    assert_eq!(orch.instance_count(), 0);

    // The lock was released and the failure is retryable.
    runtime.clear_launch_failure();
    let url = orch.start(&k, HashMap::new(), None).await.unwrap();
    assert!(url.starts_with("http://127.0.0.1:"));
    assert_eq!(orch.instance_count(), 1);
}

#[tokio::test]
async fn test_instance_naming_encodes_ownership() {
    let runtime = MockRuntime::new();
    let orch = orchestrator(runtime.clone());

    orch.start(&key(7, "Fix Login"), HashMap::new(), None)
        .await
        .unwrap();
    orch.start(&WorkspaceKey::default_branch(9), HashMap::new(), None)
        .await
        .unwrap();

    let names: Vec<String> = runtime
        .get_method_calls("launch")
        .into_iter()
        .filter_map(|c| c.container)
        .collect();
    assert_eq!(names, vec!["glimpse-7-fix-login", "glimpse-9"]);
}

#[tokio::test]
async fn test_start_passes_env_and_workspace_mount() {
    let runtime = MockRuntime::new();
    let orch = orchestrator(runtime.clone());
    let k = key(7, "main");

    let mut env = HashMap::new();
    env.insert("NODE_ENV".to_string(), "development".to_string());
    orch.start(&k, env, Some(42)).await.unwrap();

    let call = &runtime.get_method_calls("launch")[0];
    assert_eq!(
        call.env.as_ref().unwrap().get("NODE_ENV"),
        Some(&"development".to_string())
    );
    assert_eq!(
        call.workspace.as_deref(),
        Some("/srv/projects/project-7/sessions/main")
    );
}

#[tokio::test]
async fn test_mark_responding_by_url() {
    let runtime = MockRuntime::new();
    let orch = orchestrator(runtime.clone());
    let k = key(7, "main");

    let url = orch.start(&k, HashMap::new(), None).await.unwrap();

    let status = orch.status(&k).await;
    assert!(!status.responding);

    assert!(orch.mark_responding_by_url(&url));
    let status = orch.status(&k).await;
    assert!(status.responding);
}
