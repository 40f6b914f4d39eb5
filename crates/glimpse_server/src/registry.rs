//! In-memory instance registry.
//!
//! The registry is the single source of truth for "does a preview instance
//! exist for this workspace". It also hands out the per-workspace start
//! locks that make concurrent start calls converge on one container.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use glimpse_core::WorkspaceKey;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

/// One registered preview instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewInstance {
    pub container_id: String,
    pub container_name: String,
    pub url: String,
    pub created_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
    /// Has passed an HTTP-level health probe at least once
    pub responding: bool,
}

impl PreviewInstance {
    pub fn new(
        container_id: impl Into<String>,
        container_name: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            container_id: container_id.into(),
            container_name: container_name.into(),
            url: url.into(),
            created_at: now,
            last_seen_at: now,
            responding: false,
        }
    }
}

/// Keyed table of live instances plus per-key start locks.
///
/// At most one instance may exist per workspace key; callers uphold this by
/// holding the key's start lock across the check-then-launch window.
#[derive(Default)]
pub struct InstanceRegistry {
    instances: DashMap<WorkspaceKey, PreviewInstance>,
    locks: DashMap<WorkspaceKey, Arc<Mutex<()>>>,
}

impl InstanceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &WorkspaceKey) -> Option<PreviewInstance> {
        self.instances.get(key).map(|e| e.value().clone())
    }

    pub fn insert(&self, key: WorkspaceKey, instance: PreviewInstance) {
        self.instances.insert(key, instance);
    }

    pub fn remove(&self, key: &WorkspaceKey) -> Option<PreviewInstance> {
        self.instances.remove(key).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Record a successful HTTP probe by address. Returns whether any
    /// registered instance owns that address.
    pub fn mark_responding_by_url(&self, url: &str) -> bool {
        let mut found = false;
        for mut entry in self.instances.iter_mut() {
            if entry.url == url {
                entry.responding = true;
                entry.last_seen_at = Utc::now();
                found = true;
            }
        }
        found
    }

    /// The start lock for a key. The same `Arc` is returned for the same key
    /// until the process exits, so two concurrent starts always contend on
    /// one mutex.
    pub fn start_lock(&self, key: &WorkspaceKey) -> Arc<Mutex<()>> {
        self.locks
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

impl std::fmt::Debug for InstanceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstanceRegistry")
            .field("instances", &self.instances.len())
            .finish()
    }
}
