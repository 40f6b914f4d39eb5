//! # glimpse_runner
//!
//! Preview container runtime for Glimpse.
//!
//! This crate abstracts the container engine behind the [`PreviewRuntime`]
//! trait: launch a long-running dev-server container bound to a workspace
//! directory, ask whether it is still alive, and tear it down. The Docker
//! implementation talks to the daemon through bollard; the mock
//! implementation scripts launches for tests.
//!
//! # Example
//!
//! ```rust,no_run
//! use glimpse_runner::{DockerRuntime, LaunchOptions, PreviewRuntime, PreviewSpec};
//! use std::path::PathBuf;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let runtime = DockerRuntime::new().await?;
//!
//!     let spec = PreviewSpec::new("node", "glimpse-42-main")
//!         .tag("20-slim")
//!         .workspace(PathBuf::from("/srv/projects/project-42"))
//!         .container_port(3000)
//!         .env("NODE_ENV", "development");
//!
//!     let preview = runtime.launch(&spec, &LaunchOptions::default()).await?;
//!     println!("serving at {}", preview.url);
//!
//!     Ok(())
//! }
//! ```

pub mod docker;
pub mod error;
pub mod mock;
pub mod runner;
pub mod spec;

pub use docker::DockerRuntime;
pub use error::{RunnerError, RunnerResult};
pub use mock::{CapturedCall, MockRuntime};
pub use runner::{LaunchedPreview, PreviewRuntime};
pub use spec::{LaunchOptions, PreviewSpec};
