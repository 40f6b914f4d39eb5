//! Status command - Query a workspace's preview from a running service.

use anyhow::{Context, Result};
use clap::Args;

use glimpse_client::{EndpointError, HttpEndpoint, PreviewEndpoint};
use glimpse_core::WorkspaceKey;

#[derive(Args)]
pub struct StatusArgs {
    /// Project id
    #[arg(short, long)]
    project: i64,

    /// Session id (defaults to the project's default branch)
    #[arg(short, long)]
    session: Option<String>,

    /// Base URL of the preview service
    #[arg(long, default_value = "http://127.0.0.1:4100")]
    service: String,
}

pub async fn execute(args: StatusArgs) -> Result<()> {
    let key = WorkspaceKey::new(args.project, args.session).context("Invalid session id")?;
    let endpoint = HttpEndpoint::new(&args.service);

    match endpoint.fetch_status(&key).await {
        Ok(status) => {
            println!("Preview for {}", key);
            println!("   running:    {}", status.running);
            println!("   responding: {}", status.is_responding);
            match status.preview_url {
                Some(url) => println!("   url:        {}", url),
                None => println!("   url:        -"),
            }
            Ok(())
        }
        Err(EndpointError::WorkspaceNotFound) => {
            anyhow::bail!("Workspace not found for {}", key);
        }
        Err(e) => Err(e).context("Failed to query preview service"),
    }
}
