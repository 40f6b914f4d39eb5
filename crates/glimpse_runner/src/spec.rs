//! Preview container configuration types.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Configuration for one preview container.
///
/// The container name is chosen by the orchestrator and must be stable for a
/// given workspace, so cleanup tooling can recover ownership from the name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewSpec {
    /// Docker image to use
    pub image: String,
    /// Image tag (default: latest)
    pub tag: String,
    /// Container name
    pub name: String,
    /// Host directory holding the workspace
    pub workspace: PathBuf,
    /// Mount point for the workspace inside the container
    pub workspace_target: String,
    /// Port the dev server listens on inside the container
    pub container_port: u16,
    /// Environment variables
    pub env: HashMap<String, String>,
    /// Command to run (empty = image default)
    pub command: Vec<String>,
    /// Memory limit in bytes
    pub memory_limit: Option<i64>,
    /// CPU limit (number of CPUs)
    pub cpu_limit: Option<f64>,
    /// Network mode
    pub network_mode: Option<String>,
    /// User to run as (e.g., "1000:1000")
    pub user: Option<String>,
}

impl PreviewSpec {
    pub fn new(image: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            tag: "latest".to_string(),
            name: name.into(),
            workspace: PathBuf::new(),
            workspace_target: "/app".to_string(),
            container_port: 3000,
            env: HashMap::new(),
            command: Vec::new(),
            memory_limit: None,
            cpu_limit: None,
            network_mode: None,
            user: None,
        }
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    pub fn workspace(mut self, path: PathBuf) -> Self {
        self.workspace = path;
        self
    }

    pub fn workspace_target(mut self, target: impl Into<String>) -> Self {
        self.workspace_target = target.into();
        self
    }

    pub fn container_port(mut self, port: u16) -> Self {
        self.container_port = port;
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn env_all(mut self, vars: HashMap<String, String>) -> Self {
        self.env.extend(vars);
        self
    }

    pub fn command(mut self, cmd: Vec<String>) -> Self {
        self.command = cmd;
        self
    }

    pub fn memory(mut self, bytes: i64) -> Self {
        self.memory_limit = Some(bytes);
        self
    }

    pub fn cpus(mut self, cpus: f64) -> Self {
        self.cpu_limit = Some(cpus);
        self
    }

    pub fn network(mut self, network: impl Into<String>) -> Self {
        self.network_mode = Some(network.into());
        self
    }

    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// Get the full image name with tag.
    pub fn full_image(&self) -> String {
        format!("{}:{}", self.image, self.tag)
    }
}

/// Launch-time options independent of the container itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaunchOptions {
    /// Whether to pull the image when it is missing locally
    pub pull_if_missing: bool,
    /// Ceiling for pull + create + start, in seconds (0 = no ceiling)
    pub boot_timeout_seconds: u64,
    /// Fixed host port (None = runtime-assigned ephemeral port)
    pub host_port: Option<u16>,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            pull_if_missing: true,
            boot_timeout_seconds: 120,
            host_port: None,
        }
    }
}

impl LaunchOptions {
    pub fn boot_timeout(mut self, seconds: u64) -> Self {
        self.boot_timeout_seconds = seconds;
        self
    }

    pub fn no_pull(mut self) -> Self {
        self.pull_if_missing = false;
        self
    }

    pub fn host_port(mut self, port: u16) -> Self {
        self.host_port = Some(port);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_spec_builder() {
        let spec = PreviewSpec::new("node", "glimpse-7-main")
            .tag("20-slim")
            .workspace(PathBuf::from("/srv/projects/project-7"))
            .container_port(5173)
            .env("NODE_ENV", "development");

        assert_eq!(spec.full_image(), "node:20-slim");
        assert_eq!(spec.container_port, 5173);
        assert_eq!(spec.workspace_target, "/app");
        assert_eq!(
            spec.env.get("NODE_ENV"),
            Some(&"development".to_string())
        );
    }

    #[test]
    fn test_launch_options_defaults() {
        let options = LaunchOptions::default();
        assert!(options.pull_if_missing);
        assert!(options.host_port.is_none());
        assert_eq!(options.boot_timeout_seconds, 120);
    }
}
