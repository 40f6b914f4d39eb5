//! Doctor command - Check the local environment.

use anyhow::Result;
use clap::Args;

use glimpse_core::RepoProbe;
use glimpse_runner::{DockerRuntime, PreviewRuntime};
use glimpse_server::ServerConfig;

#[derive(Args)]
pub struct DoctorArgs {
    /// Docker host to connect to, e.g. http://localhost:2375
    #[arg(long)]
    docker_host: Option<String>,
}

pub async fn execute(args: DoctorArgs) -> Result<()> {
    let config = ServerConfig::from_env();
    let mut healthy = true;

    println!("🔍 Checking environment...");

    // Container engine
    let runtime = match &args.docker_host {
        Some(host) => DockerRuntime::with_host(host).await,
        None => DockerRuntime::new().await,
    };
    match runtime {
        Ok(runtime) => match runtime.version().await {
            Ok(version) => println!("   ✅ Docker reachable ({})", version),
            Err(e) => {
                healthy = false;
                println!("   ❌ Docker reachable but not responding: {}", e);
            }
        },
        Err(e) => {
            healthy = false;
            println!("   ❌ Docker not reachable: {}", e);
        }
    }

    // Git, needed to validate workspaces
    if RepoProbe::is_git_available() {
        println!("   ✅ git available");
    } else {
        healthy = false;
        println!("   ❌ git not found on PATH");
    }

    // Projects root
    if config.projects_root.is_dir() {
        println!("   ✅ Projects root {}", config.projects_root.display());
    } else {
        healthy = false;
        println!(
            "   ❌ Projects root {} does not exist",
            config.projects_root.display()
        );
    }

    println!(
        "   ℹ️  Preview image: {}:{} (container port {})",
        config.image, config.image_tag, config.container_port
    );

    println!();
    if healthy {
        println!("✅ Environment looks good!");
        Ok(())
    } else {
        anyhow::bail!("Environment check failed. Fix the issues above.");
    }
}
