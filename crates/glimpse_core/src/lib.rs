//! # glimpse_core
//!
//! Shared foundation for the Glimpse preview service.
//!
//! This crate provides the pieces every other Glimpse crate builds on:
//!
//! - **Workspace resolution**: mapping a `(project, session)` pair to its
//!   git-backed directory on disk, and validating that the directory is a
//!   usable repository.
//! - **Refresh events**: the in-process publish/subscribe channel the agent
//!   pipeline uses to announce "files changed, re-check the preview".
//!
//! # Example
//!
//! ```rust,no_run
//! use glimpse_core::{WorkspaceKey, WorkspaceResolver};
//!
//! let resolver = WorkspaceResolver::new("/var/lib/glimpse/projects");
//! let key = WorkspaceKey::new(42, Some("feature-login"))?;
//!
//! let path = resolver.resolve(&key);
//! if resolver.validate(&key) {
//!     println!("workspace ready at {}", path.display());
//! }
//! # Ok::<(), glimpse_core::CoreError>(())
//! ```

pub mod error;
pub mod events;
pub mod workspace;

pub use error::{CoreError, CoreResult};
pub use events::{RefreshBus, RefreshEvent};
pub use workspace::{RepoProbe, WorkspaceKey, WorkspaceResolver};
