//! Preview runtime trait and types.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::RunnerResult;
use crate::spec::{LaunchOptions, PreviewSpec};

/// A successfully launched preview container.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaunchedPreview {
    /// Container ID assigned by the runtime
    pub container_id: String,
    /// Container name (stable per workspace)
    pub name: String,
    /// Host port the container port was published to
    pub host_port: u16,
    /// Address the preview is reachable at from the host
    pub url: String,
    /// Launch time
    pub launched_at: DateTime<Utc>,
}

/// Container runtime for long-running preview instances.
///
/// Unlike a batch runner, `launch` returns as soon as the container is
/// started; whether the dev server inside is actually serving traffic is the
/// health probe's concern, not the runtime's.
#[async_trait]
pub trait PreviewRuntime: Send + Sync {
    /// Check if the container engine is reachable.
    async fn is_available(&self) -> RunnerResult<bool>;

    /// Get engine version information.
    async fn version(&self) -> RunnerResult<String>;

    /// Check if an image exists locally.
    async fn image_exists(&self, image: &str, tag: &str) -> RunnerResult<bool>;

    /// Pull a container image.
    async fn pull_image(&self, image: &str, tag: &str) -> RunnerResult<()>;

    /// Create and start a preview container bound to a workspace.
    async fn launch(
        &self,
        spec: &PreviewSpec,
        options: &LaunchOptions,
    ) -> RunnerResult<LaunchedPreview>;

    /// Cheap liveness check: is the container process up?
    ///
    /// A missing container is `false`, not an error.
    async fn is_running(&self, container_id: &str) -> RunnerResult<bool>;

    /// Stop and remove a container.
    async fn stop(&self, container_id: &str) -> RunnerResult<()>;

    /// Get logs from a container.
    async fn logs(&self, container_id: &str) -> RunnerResult<String>;
}
