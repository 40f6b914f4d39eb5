//! Refresh command - Announce a workspace change to mounted previews.

use anyhow::{Context, Result};
use clap::Args;

use glimpse_core::RefreshEvent;

#[derive(Args)]
pub struct RefreshArgs {
    /// Project id
    #[arg(short, long)]
    project: i64,

    /// Session id (omit for the project's default branch)
    #[arg(short, long)]
    session: Option<String>,

    /// Base URL of the preview service
    #[arg(long, default_value = "http://127.0.0.1:4100")]
    service: String,
}

pub async fn execute(args: RefreshArgs) -> Result<()> {
    let event = RefreshEvent::new(args.project, args.session);

    let response = reqwest::Client::new()
        .post(format!(
            "{}/previews/refresh",
            args.service.trim_end_matches('/')
        ))
        .json(&event)
        .send()
        .await
        .context("Failed to reach preview service")?;

    if !response.status().is_success() {
        anyhow::bail!("Refresh request failed with {}", response.status());
    }

    let body: serde_json::Value = response.json().await.context("Malformed refresh response")?;
    let subscribers = body["subscribers"].as_u64().unwrap_or(0);
    println!("✅ Refresh published ({} subscriber(s))", subscribers);

    Ok(())
}
