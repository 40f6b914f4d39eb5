//! Serve command - Run the preview service.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use glimpse_core::{RefreshBus, WorkspaceResolver};
use glimpse_runner::{DockerRuntime, PreviewRuntime};
use glimpse_server::{app, AppState, PreviewOrchestrator, ServerConfig};

#[derive(Args)]
pub struct ServeArgs {
    /// Port to listen on (overrides GLIMPSE_PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// Root directory holding project workspaces (overrides GLIMPSE_PROJECTS_ROOT)
    #[arg(long)]
    projects_root: Option<PathBuf>,

    /// Preview image (overrides GLIMPSE_PREVIEW_IMAGE)
    #[arg(long)]
    image: Option<String>,

    /// Docker host to connect to, e.g. http://localhost:2375
    #[arg(long)]
    docker_host: Option<String>,
}

pub async fn execute(args: ServeArgs) -> Result<()> {
    let mut config = ServerConfig::from_env();
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(root) = args.projects_root {
        config.projects_root = root;
    }
    if let Some(image) = args.image {
        config.image = image;
    }

    if !config.projects_root.is_dir() {
        anyhow::bail!(
            "Projects root {} does not exist",
            config.projects_root.display()
        );
    }

    let runtime: Arc<dyn PreviewRuntime> = match &args.docker_host {
        Some(host) => Arc::new(
            DockerRuntime::with_host(host)
                .await
                .context("Failed to connect to Docker")?,
        ),
        None => Arc::new(
            DockerRuntime::new()
                .await
                .context("Failed to connect to Docker")?,
        ),
    };

    let resolver = WorkspaceResolver::new(&config.projects_root);
    let orchestrator = Arc::new(PreviewOrchestrator::new(
        runtime,
        resolver.clone(),
        config.clone(),
    ));
    let bus = RefreshBus::default();
    let state = AppState::new(orchestrator, resolver, bus, config.clone());

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!(
        "Preview service listening on {} (projects root: {})",
        addr,
        config.projects_root.display()
    );

    axum::serve(listener, app(state))
        .await
        .context("Server error")?;

    Ok(())
}
