//! CLI command definitions.
//!
//! Each subcommand maps to one way of interacting with the preview service:
//! run it, inspect it, or poke a running instance over HTTP.

use clap::{Parser, Subcommand};

pub mod doctor;
pub mod refresh;
pub mod serve;
pub mod status;
pub mod stop;

/// Glimpse - live previews for chat-driven code generation
#[derive(Parser)]
#[command(name = "glimpse")]
#[command(version, about = "Glimpse - live previews for chat-driven code generation")]
#[command(long_about = r#"
Glimpse runs one preview container per project workspace and keeps a
browser-facing health picture of each instance.

COMMANDS:
  serve    → Run the preview service (HTTP API + orchestrator)
  doctor   → Check the local environment (Docker, git, projects root)
  status   → Query a workspace's preview status from a running service
  stop     → Tear down a workspace's preview
  refresh  → Announce a workspace change to mounted previews

EXIT CODES:
  0 - Success
  1 - General error
  2 - Invalid arguments
  3 - Container engine error
  4 - Workspace error
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the preview service
    Serve(serve::ServeArgs),

    /// Check the local environment
    Doctor(doctor::DoctorArgs),

    /// Query preview status for a workspace
    Status(status::StatusArgs),

    /// Tear down a workspace's preview
    Stop(stop::StopArgs),

    /// Announce a workspace change
    Refresh(refresh::RefreshArgs),
}
