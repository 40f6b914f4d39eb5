//! Docker implementation of PreviewRuntime.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use bollard::container::{
    Config, CreateContainerOptions, InspectContainerOptions, LogOutput, LogsOptions,
    RemoveContainerOptions, StartContainerOptions,
};
use bollard::image::CreateImageOptions;
use bollard::service::{HostConfig, Mount, MountTypeEnum, PortBinding};
use bollard::Docker;
use chrono::Utc;
use futures_util::StreamExt;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::error::{RunnerError, RunnerResult};
use crate::runner::{LaunchedPreview, PreviewRuntime};
use crate::spec::{LaunchOptions, PreviewSpec};

/// Docker-based preview runtime.
pub struct DockerRuntime {
    client: Docker,
}

impl DockerRuntime {
    /// Create a new Docker runtime.
    pub async fn new() -> RunnerResult<Self> {
        let client = Docker::connect_with_local_defaults()?;

        // Verify connection
        client
            .ping()
            .await
            .map_err(|e| RunnerError::DockerUnavailable(e.to_string()))?;

        Ok(Self { client })
    }

    /// Create with custom Docker host.
    pub async fn with_host(host: &str) -> RunnerResult<Self> {
        let client = Docker::connect_with_http(host, 120, bollard::API_DEFAULT_VERSION)?;
        client
            .ping()
            .await
            .map_err(|e| RunnerError::DockerUnavailable(e.to_string()))?;
        Ok(Self { client })
    }

    fn port_key(port: u16) -> String {
        format!("{}/tcp", port)
    }

    /// Remove any stale container holding our name from a previous run.
    async fn remove_stale(&self, name: &str) {
        let removed = self
            .client
            .remove_container(
                name,
                Some(RemoveContainerOptions {
                    force: true,
                    ..Default::default()
                }),
            )
            .await;
        if removed.is_ok() {
            warn!("Removed stale container {}", name);
        }
    }

    /// Read the host port Docker bound the container port to.
    async fn bound_host_port(&self, container_id: &str, port: u16) -> RunnerResult<u16> {
        let inspect = self
            .client
            .inspect_container(container_id, None::<InspectContainerOptions>)
            .await?;

        let ports = inspect
            .network_settings
            .and_then(|ns| ns.ports)
            .ok_or_else(|| {
                RunnerError::InspectFailed(format!("no port map for {}", container_id))
            })?;

        let bindings = ports
            .get(&Self::port_key(port))
            .and_then(|b| b.as_ref())
            .ok_or_else(|| {
                RunnerError::InspectFailed(format!(
                    "port {} not published for {}",
                    port, container_id
                ))
            })?;

        bindings
            .iter()
            .find_map(|b: &PortBinding| b.host_port.as_deref())
            .and_then(|p| p.parse::<u16>().ok())
            .ok_or_else(|| {
                RunnerError::InspectFailed(format!("no host port bound for {}", container_id))
            })
    }

    async fn launch_inner(
        &self,
        spec: &PreviewSpec,
        options: &LaunchOptions,
    ) -> RunnerResult<LaunchedPreview> {
        let full_image = spec.full_image();
        let launched_at = Utc::now();

        debug!("Launching preview {} with image {}", spec.name, full_image);

        if options.pull_if_missing && !self.image_exists(&spec.image, &spec.tag).await? {
            self.pull_image(&spec.image, &spec.tag).await?;
        }

        self.remove_stale(&spec.name).await;

        let mounts = vec![Mount {
            target: Some(spec.workspace_target.clone()),
            source: Some(spec.workspace.to_string_lossy().to_string()),
            typ: Some(MountTypeEnum::BIND),
            read_only: Some(false),
            ..Default::default()
        }];

        let env: Vec<String> = spec
            .env
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();

        let port_key = Self::port_key(spec.container_port);

        // Empty host port lets Docker pick an ephemeral one.
        let mut port_bindings = HashMap::new();
        port_bindings.insert(
            port_key.clone(),
            Some(vec![PortBinding {
                host_ip: Some("127.0.0.1".to_string()),
                host_port: options.host_port.map(|p| p.to_string()),
            }]),
        );

        let mut exposed_ports = HashMap::new();
        exposed_ports.insert(port_key, HashMap::new());

        let host_config = HostConfig {
            mounts: Some(mounts),
            port_bindings: Some(port_bindings),
            memory: spec.memory_limit,
            nano_cpus: spec.cpu_limit.map(|c| (c * 1_000_000_000.0) as i64),
            network_mode: spec.network_mode.clone(),
            ..Default::default()
        };

        let container_config = Config {
            image: Some(full_image.clone()),
            cmd: if spec.command.is_empty() {
                None
            } else {
                Some(spec.command.clone())
            },
            working_dir: Some(spec.workspace_target.clone()),
            env: Some(env),
            exposed_ports: Some(exposed_ports),
            host_config: Some(host_config),
            user: spec.user.clone(),
            ..Default::default()
        };

        let create_options = CreateContainerOptions {
            name: spec.name.as_str(),
            platform: None,
        };

        let container = self
            .client
            .create_container(Some(create_options), container_config)
            .await
            .map_err(|e| RunnerError::LaunchFailed(e.to_string()))?;

        let container_id = container.id;

        if let Err(e) = self
            .client
            .start_container(&container_id, None::<StartContainerOptions<String>>)
            .await
        {
            // Do not leave a created-but-dead container behind.
            let _ = self
                .client
                .remove_container(
                    &container_id,
                    Some(RemoveContainerOptions {
                        force: true,
                        ..Default::default()
                    }),
                )
                .await;
            return Err(RunnerError::LaunchFailed(e.to_string()));
        }

        let host_port = match options.host_port {
            Some(port) => port,
            None => {
                match self.bound_host_port(&container_id, spec.container_port).await {
                    Ok(port) => port,
                    Err(e) => {
                        let _ = self.stop(&container_id).await;
                        return Err(e);
                    }
                }
            }
        };

        let url = format!("http://127.0.0.1:{}", host_port);
        info!("Preview {} started at {}", spec.name, url);

        Ok(LaunchedPreview {
            container_id,
            name: spec.name.clone(),
            host_port,
            url,
            launched_at,
        })
    }
}

#[async_trait]
impl PreviewRuntime for DockerRuntime {
    async fn is_available(&self) -> RunnerResult<bool> {
        match self.client.ping().await {
            Ok(_) => Ok(true),
            Err(_) => Ok(false),
        }
    }

    async fn version(&self) -> RunnerResult<String> {
        let version = self.client.version().await?;
        Ok(format!(
            "Docker {} (API {})",
            version.version.unwrap_or_default(),
            version.api_version.unwrap_or_default()
        ))
    }

    async fn image_exists(&self, image: &str, tag: &str) -> RunnerResult<bool> {
        let full_image = format!("{}:{}", image, tag);
        match self.client.inspect_image(&full_image).await {
            Ok(_) => Ok(true),
            Err(bollard::errors::Error::DockerResponseServerError {
                status_code: 404, ..
            }) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn pull_image(&self, image: &str, tag: &str) -> RunnerResult<()> {
        info!("Pulling image {}:{}", image, tag);

        let options = CreateImageOptions {
            from_image: image,
            tag,
            ..Default::default()
        };

        let mut stream = self.client.create_image(Some(options), None, None);

        while let Some(result) = stream.next().await {
            match result {
                Ok(info) => {
                    if let Some(status) = info.status {
                        debug!("Pull status: {}", status);
                    }
                }
                Err(e) => {
                    return Err(RunnerError::ImagePullFailed(e.to_string()));
                }
            }
        }

        info!("Image {}:{} pulled successfully", image, tag);
        Ok(())
    }

    async fn launch(
        &self,
        spec: &PreviewSpec,
        options: &LaunchOptions,
    ) -> RunnerResult<LaunchedPreview> {
        if options.boot_timeout_seconds == 0 {
            return self.launch_inner(spec, options).await;
        }

        match timeout(
            Duration::from_secs(options.boot_timeout_seconds),
            self.launch_inner(spec, options),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => {
                self.remove_stale(&spec.name).await;
                Err(RunnerError::Timeout(options.boot_timeout_seconds))
            }
        }
    }

    async fn is_running(&self, container_id: &str) -> RunnerResult<bool> {
        match self
            .client
            .inspect_container(container_id, None::<InspectContainerOptions>)
            .await
        {
            Ok(inspect) => Ok(inspect
                .state
                .and_then(|s| s.running)
                .unwrap_or(false)),
            Err(bollard::errors::Error::DockerResponseServerError {
                status_code: 404, ..
            }) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn stop(&self, container_id: &str) -> RunnerResult<()> {
        self.client.stop_container(container_id, None).await?;
        self.client
            .remove_container(
                container_id,
                Some(RemoveContainerOptions {
                    force: true,
                    ..Default::default()
                }),
            )
            .await?;
        Ok(())
    }

    async fn logs(&self, container_id: &str) -> RunnerResult<String> {
        let options = LogsOptions::<String> {
            stdout: true,
            stderr: true,
            ..Default::default()
        };

        let mut output = String::new();
        let mut stream = self.client.logs(container_id, Some(options));

        while let Some(result) = stream.next().await {
            match result {
                Ok(LogOutput::StdOut { message }) | Ok(LogOutput::StdErr { message }) => {
                    output.push_str(&String::from_utf8_lossy(&message));
                }
                _ => {}
            }
        }

        Ok(output)
    }
}
