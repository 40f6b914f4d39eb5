//! Stop command - Tear down a workspace's preview.

use anyhow::{Context, Result};
use clap::Args;

use glimpse_core::WorkspaceKey;

#[derive(Args)]
pub struct StopArgs {
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

pub async fn execute(args: StopArgs) -> Result<()> {
    let key = WorkspaceKey::new(args.project, args.session).context("Invalid session id")?;

    let mut url = format!(
        "{}/previews/{}",
        args.service.trim_end_matches('/'),
        key.project_id
    );
    if let Some(session) = &key.session_id {
        url.push_str(&format!("?session={}", session));
    }

    let response = reqwest::Client::new()
        .delete(url)
        .send()
        .await
        .context("Failed to reach preview service")?;

    if !response.status().is_success() {
        anyhow::bail!("Stop request failed with {}", response.status());
    }

    let body: serde_json::Value = response.json().await.context("Malformed stop response")?;
    if body["stopped"].as_bool().unwrap_or(false) {
        println!("✅ Stopped preview for {}", key);
    } else {
        println!("ℹ️  No preview was running for {}", key);
    }

    Ok(())
}
