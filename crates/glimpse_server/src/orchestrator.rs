//! Preview orchestrator.
//!
//! Owns the lifecycle of one preview container per workspace. `start` is
//! idempotent get-or-create, `status` is a non-mutating read, `stop` tears
//! the container down and forgets it.

use std::collections::HashMap;
use std::sync::Arc;

use glimpse_core::{WorkspaceKey, WorkspaceResolver};
use glimpse_runner::{LaunchOptions, PreviewRuntime, PreviewSpec};
use serde::{Deserialize, Serialize};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::registry::{InstanceRegistry, PreviewInstance};

/// Snapshot of one workspace's preview, as reported to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewStatus {
    /// Container process is up
    pub running: bool,
    /// Instance has passed an HTTP probe at least once
    pub responding: bool,
    /// Last known address, if any instance is registered
    pub url: Option<String>,
}

impl PreviewStatus {
    fn absent() -> Self {
        Self {
            running: false,
            responding: false,
            url: None,
        }
    }
}

/// Orchestrates preview containers against a shared registry.
pub struct PreviewOrchestrator {
    runtime: Arc<dyn PreviewRuntime>,
    registry: InstanceRegistry,
    resolver: WorkspaceResolver,
    config: ServerConfig,
}

impl PreviewOrchestrator {
    pub fn new(
        runtime: Arc<dyn PreviewRuntime>,
        resolver: WorkspaceResolver,
        config: ServerConfig,
    ) -> Self {
        Self {
            runtime,
            registry: InstanceRegistry::new(),
            resolver,
            config,
        }
    }

    /// Stable container name for a workspace. Ownership is recoverable from
    /// the name alone: `{prefix}-{project}` or `{prefix}-{project}-{session}`.
    pub fn instance_name(&self, key: &WorkspaceKey) -> String {
        match key.session_slug() {
            Some(slug) => format!("{}-{}-{}", self.config.name_prefix, key.project_id, slug),
            None => format!("{}-{}", self.config.name_prefix, key.project_id),
        }
    }

    /// Start a preview for the workspace, or return the running one.
    ///
    /// The caller is responsible for having validated the workspace; this
    /// method only serializes and launches. Two concurrent calls for the
    /// same key converge on a single container: the second blocks on the
    /// per-key lock (bounded by the configured timeout) and then observes
    /// the first caller's registration.
    pub async fn start(
        &self,
        key: &WorkspaceKey,
        env: HashMap<String, String>,
        requesting_user: Option<i64>,
    ) -> ServerResult<String> {
        if let Some(url) = self.reusable_url(key).await {
            debug!("Reusing running preview for {}", key);
            return Ok(url);
        }

        let lock = self.registry.start_lock(key);
        let _guard = timeout(self.config.start_lock_timeout(), lock.lock())
            .await
            .map_err(|_| ServerError::LockTimeout)?;

        // Re-check under the lock: another caller may have just launched.
        if let Some(url) = self.reusable_url(key).await {
            debug!("Preview for {} appeared while waiting on lock", key);
            return Ok(url);
        }

        // Anything still registered here is a dead instance.
        self.registry.remove(key);

        let name = self.instance_name(key);
        let spec = PreviewSpec::new(&self.config.image, &name)
            .tag(&self.config.image_tag)
            .workspace(self.resolver.resolve(key))
            .container_port(self.config.container_port)
            .env_all(env);
        let options = LaunchOptions::default().boot_timeout(self.config.boot_timeout_seconds);

        info!(
            user = requesting_user,
            "Launching preview {} for {}", name, key
        );

        let preview = self
            .runtime
            .launch(&spec, &options)
            .await
            .map_err(ServerError::StartFailed)?;

        let url = preview.url.clone();
        self.registry.insert(
            key.clone(),
            PreviewInstance::new(preview.container_id, preview.name, &url),
        );

        Ok(url)
    }

    /// Current status for a workspace. Never spawns anything and never
    /// mutates the registry.
    pub async fn status(&self, key: &WorkspaceKey) -> PreviewStatus {
        let Some(instance) = self.registry.get(key) else {
            return PreviewStatus::absent();
        };

        let running = match self.runtime.is_running(&instance.container_id).await {
            Ok(running) => running,
            Err(e) => {
                warn!("Liveness check failed for {}: {}", instance.container_name, e);
                false
            }
        };

        PreviewStatus {
            running,
            responding: running && instance.responding,
            url: Some(instance.url),
        }
    }

    /// Tear down the workspace's preview, if one is registered.
    pub async fn stop(&self, key: &WorkspaceKey) -> ServerResult<bool> {
        let Some(instance) = self.registry.remove(key) else {
            return Ok(false);
        };

        info!("Stopping preview {} for {}", instance.container_name, key);
        self.runtime.stop(&instance.container_id).await?;
        Ok(true)
    }

    /// Record a successful HTTP probe against an instance address.
    pub fn mark_responding_by_url(&self, url: &str) -> bool {
        self.registry.mark_responding_by_url(url)
    }

    /// Number of registered instances. Diagnostic only.
    pub fn instance_count(&self) -> usize {
        self.registry.len()
    }

    async fn reusable_url(&self, key: &WorkspaceKey) -> Option<String> {
        let instance = self.registry.get(key)?;
        match self.runtime.is_running(&instance.container_id).await {
            Ok(true) => Some(instance.url),
            Ok(false) => None,
            Err(e) => {
                warn!(
                    "Liveness check failed for {}: {}",
                    instance.container_name, e
                );
                None
            }
        }
    }
}

impl std::fmt::Debug for PreviewOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreviewOrchestrator")
            .field("instances", &self.registry.len())
            .finish()
    }
}
