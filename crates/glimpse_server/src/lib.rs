//! # glimpse_server
//!
//! Preview orchestration and HTTP surface for Glimpse.
//!
//! The orchestrator owns the lifecycle of one preview container per
//! workspace: `start` is idempotent get-or-create serialized by a per-key
//! lock, `status` is a non-mutating read, `stop` tears down. The HTTP layer
//! exposes those operations plus a server-side health probe, so browsers
//! never have to reach a preview container across origins themselves.

pub mod config;
pub mod error;
pub mod orchestrator;
pub mod probe;
pub mod registry;
pub mod routes;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use orchestrator::{PreviewOrchestrator, PreviewStatus};
pub use probe::{HttpProbe, ProbeOutcome};
pub use registry::{InstanceRegistry, PreviewInstance};
pub use routes::{app, AppState};
