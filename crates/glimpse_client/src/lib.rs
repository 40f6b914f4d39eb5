//! # glimpse_client
//!
//! Client-side health checking for Glimpse previews.
//!
//! A [`PreviewMonitor`] drives the discovery-and-poll cycle for one mounted
//! preview view: resolve the instance address through the server, wait out
//! the boot grace period, then probe on a fixed retry schedule until the
//! preview answers or the attempts are exhausted. The resulting
//! [`HealthState`] (`loading` / `ready` / `error`) is published through a
//! watch channel for the surrounding UI.
//!
//! Refresh events from the agent pipeline re-trigger the cycle via
//! [`spawn_refresh_listener`]; duplicate triggers while a cycle is in
//! flight are no-ops.

pub mod endpoint;
pub mod monitor;
pub mod state;

pub use endpoint::{
    EndpointError, EndpointResult, HttpEndpoint, PreviewEndpoint, ProbeOutcome, StartOutcome,
    StatusSnapshot,
};
pub use monitor::{spawn_refresh_listener, PollPolicy, PreviewMonitor};
pub use state::{HealthState, Phase};
