//! Server configuration, read from the environment with sane defaults.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port the HTTP service listens on
    pub port: u16,
    /// Root directory holding all project workspaces
    pub projects_root: PathBuf,
    /// Default preview image
    pub image: String,
    /// Default preview image tag
    pub image_tag: String,
    /// Port the dev server listens on inside preview containers
    pub container_port: u16,
    /// Prefix for preview container names
    pub name_prefix: String,
    /// Ceiling for pull + create + start of one container, seconds
    pub boot_timeout_seconds: u64,
    /// Default health probe timeout, milliseconds
    pub probe_timeout_ms: u64,
    /// How long a second start call waits on the per-workspace lock, seconds
    pub start_lock_timeout_seconds: u64,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            port: env::var("GLIMPSE_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            projects_root: env::var("GLIMPSE_PROJECTS_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.projects_root),
            image: env::var("GLIMPSE_PREVIEW_IMAGE").unwrap_or(defaults.image),
            image_tag: env::var("GLIMPSE_PREVIEW_IMAGE_TAG").unwrap_or(defaults.image_tag),
            container_port: env::var("GLIMPSE_PREVIEW_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.container_port),
            name_prefix: env::var("GLIMPSE_NAME_PREFIX").unwrap_or(defaults.name_prefix),
            boot_timeout_seconds: env::var("GLIMPSE_BOOT_TIMEOUT")
                .ok()
                .and_then(|t| t.parse().ok())
                .unwrap_or(defaults.boot_timeout_seconds),
            probe_timeout_ms: env::var("GLIMPSE_PROBE_TIMEOUT_MS")
                .ok()
                .and_then(|t| t.parse().ok())
                .unwrap_or(defaults.probe_timeout_ms),
            start_lock_timeout_seconds: env::var("GLIMPSE_START_LOCK_TIMEOUT")
                .ok()
                .and_then(|t| t.parse().ok())
                .unwrap_or(defaults.start_lock_timeout_seconds),
        }
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn start_lock_timeout(&self) -> Duration {
        Duration::from_secs(self.start_lock_timeout_seconds)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 4100,
            projects_root: PathBuf::from("/var/lib/glimpse/projects"),
            image: "node".to_string(),
            image_tag: "20-slim".to_string(),
            container_port: 3000,
            name_prefix: "glimpse".to_string(),
            boot_timeout_seconds: 120,
            probe_timeout_ms: 5_000,
            start_lock_timeout_seconds: 150,
        }
    }
}
