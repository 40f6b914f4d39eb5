//! The discovery-and-poll control loop.
//!
//! One monitor belongs to one mounted preview view. A cycle resolves the
//! instance address, waits out the boot grace period, then probes
//! sequentially until the preview answers or attempts run out. Probes within
//! a cycle are strictly sequential; there is never more than one cycle in
//! flight per monitor.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use glimpse_core::{RefreshEvent, WorkspaceKey};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::endpoint::{EndpointError, PreviewEndpoint};
use crate::state::HealthState;

/// Retry schedule for one polling cycle.
///
/// The first few retries wait longer (the instance is likely still
/// compiling); later ones come faster to converge quickly once it is
/// plausibly close to ready.
#[derive(Debug, Clone)]
pub struct PollPolicy {
    /// Grace period between start returning and the first probe
    pub initial_delay: Duration,
    /// Delay after each of the first `early_attempts` failures
    pub early_delay: Duration,
    /// Delay after later failures
    pub late_delay: Duration,
    /// How many failures count as "early"
    pub early_attempts: u32,
    /// Probe budget for the whole cycle
    pub max_attempts: u32,
    /// Timeout for each individual probe
    pub probe_timeout: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(3),
            early_delay: Duration::from_secs(2),
            late_delay: Duration::from_secs(1),
            early_attempts: 3,
            max_attempts: 30,
            probe_timeout: Duration::from_secs(5),
        }
    }
}

impl PollPolicy {
    fn retry_delay(&self, attempts_so_far: u32) -> Duration {
        if attempts_so_far <= self.early_attempts {
            self.early_delay
        } else {
            self.late_delay
        }
    }
}

/// Drives the health-check state machine for one preview view.
pub struct PreviewMonitor<E: PreviewEndpoint> {
    key: WorkspaceKey,
    endpoint: Arc<E>,
    policy: PollPolicy,
    state_tx: watch::Sender<HealthState>,
    // Kept so the channel survives with zero external subscribers.
    state_rx: watch::Receiver<HealthState>,
    in_flight: AtomicBool,
    generation: AtomicU64,
}

impl<E: PreviewEndpoint> PreviewMonitor<E> {
    pub fn new(key: WorkspaceKey, endpoint: Arc<E>, policy: PollPolicy) -> Self {
        let (state_tx, state_rx) = watch::channel(HealthState::loading());
        Self {
            key,
            endpoint,
            policy,
            state_tx,
            state_rx,
            in_flight: AtomicBool::new(false),
            generation: AtomicU64::new(0),
        }
    }

    pub fn key(&self) -> &WorkspaceKey {
        &self.key
    }

    /// Current state snapshot.
    pub fn state(&self) -> HealthState {
        self.state_rx.borrow().clone()
    }

    /// Watch state transitions.
    pub fn subscribe(&self) -> watch::Receiver<HealthState> {
        self.state_tx.subscribe()
    }

    /// Whether a cycle is currently in flight.
    pub fn is_polling(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Stop the current cycle, if any. The cycle notices at its next
    /// checkpoint and schedules nothing further; an in-flight probe result
    /// is discarded.
    pub fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// Run one discovery-and-poll cycle to a terminal state.
    ///
    /// Re-entrant calls while a cycle is in flight are no-ops, so duplicate
    /// refresh triggers never overlap polls.
    pub async fn run_cycle(&self) {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            debug!("Poll cycle already in flight for {}, ignoring", self.key);
            return;
        }

        let generation = self.generation.load(Ordering::SeqCst);
        self.drive(generation).await;

        self.in_flight.store(false, Ordering::SeqCst);
    }

    async fn drive(&self, generation: u64) {
        self.set(generation, HealthState::loading());

        let url = match self.resolve_url().await {
            Ok(url) => url,
            Err(message) => {
                self.set(generation, HealthState::error(message, 0));
                return;
            }
        };

        // Grace period: the container was just started and is almost
        // certainly still booting.
        if self.sleep_cancelled(generation, self.policy.initial_delay).await {
            return;
        }

        let max = self.policy.max_attempts;
        let mut attempts = 0;

        while attempts < max {
            let outcome = self.endpoint.probe(&url, self.policy.probe_timeout).await;
            if self.cancelled(generation) {
                return;
            }

            if outcome.ok {
                self.set(generation, HealthState::ready(url, attempts));
                return;
            }

            attempts += 1;
            let progress = ((attempts as u64 * 100) / max as u64).min(90) as u8;
            self.set(
                generation,
                HealthState::polling(url.clone(), progress, attempts),
            );

            if attempts >= max {
                break;
            }
            if self
                .sleep_cancelled(generation, self.policy.retry_delay(attempts))
                .await
            {
                return;
            }
        }

        self.set(
            generation,
            HealthState::error(
                format!("Preview failed to start after {} attempts", max),
                attempts,
            ),
        );
    }

    /// Find the instance address: prefer a running instance's address, fall
    /// back to an explicit start. Returns a user-facing message on failure.
    async fn resolve_url(&self) -> Result<String, String> {
        match self.endpoint.fetch_status(&self.key).await {
            Ok(status) => {
                if status.running {
                    if let Some(url) = status.preview_url {
                        return Ok(url);
                    }
                }
            }
            Err(EndpointError::WorkspaceNotFound) => {
                return Err("Workspace not found for this session".to_string());
            }
            Err(e) => {
                debug!("Status fetch failed for {}: {}", self.key, e);
            }
        }

        match self.endpoint.start(&self.key).await {
            Ok(outcome) => match outcome.url {
                Some(url) if outcome.success => Ok(url),
                _ => Err(outcome
                    .error
                    .unwrap_or_else(|| "Preview could not be started".to_string())),
            },
            Err(EndpointError::WorkspaceNotFound) => {
                Err("Workspace not found for this session".to_string())
            }
            Err(e) => Err(format!("Preview could not be started: {}", e)),
        }
    }

    fn cancelled(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) != generation
    }

    /// Sleep, reporting whether the cycle was cancelled meanwhile.
    async fn sleep_cancelled(&self, generation: u64, delay: Duration) -> bool {
        tokio::time::sleep(delay).await;
        self.cancelled(generation)
    }

    fn set(&self, generation: u64, state: HealthState) {
        if !self.cancelled(generation) {
            let _ = self.state_tx.send(state);
        }
    }
}

/// Subscribe a monitor to refresh events for the lifetime of its view.
///
/// Only events matching the monitor's workspace re-trigger a cycle; the
/// default-branch equivalence (`None` vs. the branch's own name) is applied
/// in both directions. Abort the returned handle when the view unmounts.
pub fn spawn_refresh_listener<E>(
    monitor: Arc<PreviewMonitor<E>>,
    mut events: broadcast::Receiver<RefreshEvent>,
    default_branch: Option<String>,
) -> JoinHandle<()>
where
    E: PreviewEndpoint + 'static,
{
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    if event.matches(monitor.key(), default_branch.as_deref()) {
                        debug!("Refresh matched {}, re-running cycle", monitor.key());
                        monitor.run_cycle().await;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!("Refresh listener lagged, skipped {} events", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}
