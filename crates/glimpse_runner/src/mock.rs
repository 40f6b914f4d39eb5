//! Mock preview runtime for testing.
//!
//! Provides a configurable mock implementation of the PreviewRuntime trait
//! for use in unit tests without requiring actual Docker.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::error::{RunnerError, RunnerResult};
use crate::runner::{LaunchedPreview, PreviewRuntime};
use crate::spec::{LaunchOptions, PreviewSpec};

/// Captured call information for verification.
#[derive(Debug, Clone)]
pub struct CapturedCall {
    pub method: String,
    pub image: Option<String>,
    pub container: Option<String>,
    pub env: Option<HashMap<String, String>>,
    pub workspace: Option<String>,
}

/// Mock preview runtime for testing.
///
/// Captures all calls and fabricates launch results, allowing tests to
/// verify orchestration behavior without running containers. Launched
/// containers are tracked as running until `stop` or `kill_container`.
#[derive(Clone)]
pub struct MockRuntime {
    /// Whether the runtime should report as available.
    available: Arc<RwLock<bool>>,
    /// Version string to return.
    version: Arc<RwLock<String>>,
    /// Container ids currently considered running.
    running: Arc<RwLock<HashMap<String, LaunchedPreview>>>,
    /// Images that "exist".
    existing_images: Arc<RwLock<Vec<String>>>,
    /// Simulated launch failure message.
    launch_failure: Arc<RwLock<Option<String>>>,
    /// Artificial delay for launch, in milliseconds.
    launch_delay_ms: Arc<RwLock<u64>>,
    /// Captured calls for verification.
    captured_calls: Arc<RwLock<Vec<CapturedCall>>>,
    /// Next fabricated host port.
    next_port: Arc<AtomicU16>,
}

impl Default for MockRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRuntime {
    /// Create a new mock runtime.
    pub fn new() -> Self {
        Self {
            available: Arc::new(RwLock::new(true)),
            version: Arc::new(RwLock::new("mock-runtime 1.0.0".to_string())),
            running: Arc::new(RwLock::new(HashMap::new())),
            existing_images: Arc::new(RwLock::new(Vec::new())),
            launch_failure: Arc::new(RwLock::new(None)),
            launch_delay_ms: Arc::new(RwLock::new(0)),
            captured_calls: Arc::new(RwLock::new(Vec::new())),
            next_port: Arc::new(AtomicU16::new(49152)),
        }
    }

    /// Set whether the runtime is available.
    pub fn set_available(self, available: bool) -> Self {
        *self.available.write() = available;
        self
    }

    /// Add an image that should "exist".
    pub fn add_existing_image(self, image: impl Into<String>) -> Self {
        self.existing_images.write().push(image.into());
        self
    }

    /// Make subsequent launches fail with the given message.
    pub fn simulate_launch_failure(self, message: impl Into<String>) -> Self {
        *self.launch_failure.write() = Some(message.into());
        self
    }

    /// Delay each launch, to widen race windows in concurrency tests.
    pub fn launch_delay_ms(self, ms: u64) -> Self {
        *self.launch_delay_ms.write() = ms;
        self
    }

    /// Clear a previously simulated failure.
    pub fn clear_launch_failure(&self) {
        *self.launch_failure.write() = None;
    }

    /// Mark a launched container as dead without removing knowledge of it.
    pub fn kill_container(&self, container_id: &str) {
        self.running.write().remove(container_id);
    }

    /// Get all captured calls.
    pub fn get_calls(&self) -> Vec<CapturedCall> {
        self.captured_calls.read().clone()
    }

    /// Get calls to a specific method.
    pub fn get_method_calls(&self, method: &str) -> Vec<CapturedCall> {
        self.captured_calls
            .read()
            .iter()
            .filter(|c| c.method == method)
            .cloned()
            .collect()
    }

    /// Number of launch calls made.
    pub fn launch_count(&self) -> usize {
        self.get_method_calls("launch").len()
    }

    /// Check if a specific method was called.
    pub fn was_called(&self, method: &str) -> bool {
        self.captured_calls
            .read()
            .iter()
            .any(|c| c.method == method)
    }

    fn record_call(&self, call: CapturedCall) {
        self.captured_calls.write().push(call);
    }

    fn check_launch_failure(&self) -> RunnerResult<()> {
        if let Some(msg) = self.launch_failure.read().clone() {
            return Err(RunnerError::LaunchFailed(msg));
        }
        Ok(())
    }
}

#[async_trait]
impl PreviewRuntime for MockRuntime {
    async fn is_available(&self) -> RunnerResult<bool> {
        self.record_call(CapturedCall {
            method: "is_available".to_string(),
            image: None,
            container: None,
            env: None,
            workspace: None,
        });
        Ok(*self.available.read())
    }

    async fn version(&self) -> RunnerResult<String> {
        self.record_call(CapturedCall {
            method: "version".to_string(),
            image: None,
            container: None,
            env: None,
            workspace: None,
        });
        Ok(self.version.read().clone())
    }

    async fn image_exists(&self, image: &str, tag: &str) -> RunnerResult<bool> {
        let full_image = format!("{}:{}", image, tag);
        self.record_call(CapturedCall {
            method: "image_exists".to_string(),
            image: Some(full_image.clone()),
            container: None,
            env: None,
            workspace: None,
        });
        Ok(self.existing_images.read().contains(&full_image))
    }

    async fn pull_image(&self, image: &str, tag: &str) -> RunnerResult<()> {
        let full_image = format!("{}:{}", image, tag);
        self.record_call(CapturedCall {
            method: "pull_image".to_string(),
            image: Some(full_image.clone()),
            container: None,
            env: None,
            workspace: None,
        });
        self.existing_images.write().push(full_image);
        Ok(())
    }

    async fn launch(
        &self,
        spec: &PreviewSpec,
        _options: &LaunchOptions,
    ) -> RunnerResult<LaunchedPreview> {
        self.record_call(CapturedCall {
            method: "launch".to_string(),
            image: Some(spec.full_image()),
            container: Some(spec.name.clone()),
            env: Some(spec.env.clone()),
            workspace: Some(spec.workspace.to_string_lossy().to_string()),
        });

        let delay = *self.launch_delay_ms.read();
        if delay > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
        }

        self.check_launch_failure()?;

        let host_port = self.next_port.fetch_add(1, Ordering::SeqCst);
        let preview = LaunchedPreview {
            container_id: format!("mock-{}", Uuid::new_v4()),
            name: spec.name.clone(),
            host_port,
            url: format!("http://127.0.0.1:{}", host_port),
            launched_at: Utc::now(),
        };

        self.running
            .write()
            .insert(preview.container_id.clone(), preview.clone());

        Ok(preview)
    }

    async fn is_running(&self, container_id: &str) -> RunnerResult<bool> {
        self.record_call(CapturedCall {
            method: "is_running".to_string(),
            image: None,
            container: Some(container_id.to_string()),
            env: None,
            workspace: None,
        });
        Ok(self.running.read().contains_key(container_id))
    }

    async fn stop(&self, container_id: &str) -> RunnerResult<()> {
        self.record_call(CapturedCall {
            method: "stop".to_string(),
            image: None,
            container: Some(container_id.to_string()),
            env: None,
            workspace: None,
        });
        self.running.write().remove(container_id);
        Ok(())
    }

    async fn logs(&self, container_id: &str) -> RunnerResult<String> {
        self.record_call(CapturedCall {
            method: "logs".to_string(),
            image: None,
            container: Some(container_id.to_string()),
            env: None,
            workspace: None,
        });
        Ok("mock preview logs".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[tokio::test]
    async fn test_mock_launch_tracks_running() {
        let runtime = MockRuntime::new();
        let spec = PreviewSpec::new("node", "glimpse-1-main")
            .workspace(PathBuf::from("/srv/projects/project-1"));

        let preview = runtime
            .launch(&spec, &LaunchOptions::default())
            .await
            .unwrap();

        assert!(preview.url.starts_with("http://127.0.0.1:"));
        assert!(runtime.is_running(&preview.container_id).await.unwrap());

        runtime.stop(&preview.container_id).await.unwrap();
        assert!(!runtime.is_running(&preview.container_id).await.unwrap());
    }

    #[tokio::test]
    async fn test_mock_captures_launch_details() {
        let runtime = MockRuntime::new();
        let spec = PreviewSpec::new("node", "glimpse-2-fix")
            .tag("20-slim")
            .workspace(PathBuf::from("/srv/projects/project-2/sessions/fix"))
            .env("PORT", "3000");

        let _ = runtime.launch(&spec, &LaunchOptions::default()).await;

        let calls = runtime.get_method_calls("launch");
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].image.as_deref(), Some("node:20-slim"));
        assert_eq!(calls[0].container.as_deref(), Some("glimpse-2-fix"));
        assert_eq!(
            calls[0].env.as_ref().unwrap().get("PORT"),
            Some(&"3000".to_string())
        );
    }

    #[tokio::test]
    async fn test_mock_launch_failure() {
        let runtime = MockRuntime::new().simulate_launch_failure("no disk");
        let spec = PreviewSpec::new("node", "glimpse-3-main");

        let result = runtime.launch(&spec, &LaunchOptions::default()).await;
        assert!(matches!(result, Err(RunnerError::LaunchFailed(_))));

        runtime.clear_launch_failure();
        assert!(runtime
            .launch(&spec, &LaunchOptions::default())
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_mock_kill_container() {
        let runtime = MockRuntime::new();
        let spec = PreviewSpec::new("node", "glimpse-4-main");
        let preview = runtime
            .launch(&spec, &LaunchOptions::default())
            .await
            .unwrap();

        runtime.kill_container(&preview.container_id);
        assert!(!runtime.is_running(&preview.container_id).await.unwrap());
    }

    #[tokio::test]
    async fn test_mock_image_tracking() {
        let runtime = MockRuntime::new().add_existing_image("node:20-slim");

        assert!(runtime.image_exists("node", "20-slim").await.unwrap());
        assert!(!runtime.image_exists("python", "3.12").await.unwrap());

        runtime.pull_image("python", "3.12").await.unwrap();
        assert!(runtime.image_exists("python", "3.12").await.unwrap());
    }
}
