//! Refresh event bus.
//!
//! The agent pipeline publishes a [`RefreshEvent`] once it has finished
//! writing files for a workspace. Mounted preview monitors subscribe and
//! re-run their discovery cycle when an event matches their own workspace.
//! Delivery is at-most-once to currently subscribed listeners; events carry
//! everything a consumer needs, so duplicates and reordering are harmless.

use crate::workspace::WorkspaceKey;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

/// Announcement that a workspace's files changed.
///
/// `session_id: None` denotes the project's default branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshEvent {
    #[serde(rename = "projectId")]
    pub project_id: i64,
    #[serde(rename = "sessionId", skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl RefreshEvent {
    pub fn new(project_id: i64, session_id: Option<impl Into<String>>) -> Self {
        Self {
            project_id,
            session_id: session_id.map(Into::into),
        }
    }

    /// Whether this event concerns the given workspace.
    ///
    /// "No session" and "the default branch's named session" refer to the
    /// same underlying workspace, so the match is symmetric: an event with no
    /// session matches a key naming the default branch, and an event naming
    /// the default branch matches a key with no session.
    pub fn matches(&self, key: &WorkspaceKey, default_branch: Option<&str>) -> bool {
        if self.project_id != key.project_id {
            return false;
        }

        match (self.session_id.as_deref(), key.session_id.as_deref()) {
            (Some(a), Some(b)) => a == b,
            (None, None) => true,
            (Some(a), None) => default_branch == Some(a),
            (None, Some(b)) => default_branch == Some(b),
        }
    }
}

/// Broadcast channel for refresh events.
///
/// Cloning the bus shares the underlying channel. Publishing with no
/// subscribers is not an error; the event is simply dropped.
#[derive(Debug, Clone)]
pub struct RefreshBus {
    tx: broadcast::Sender<RefreshEvent>,
}

impl RefreshBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publish an event to all current subscribers.
    ///
    /// Returns the number of subscribers that received it.
    pub fn publish(&self, event: RefreshEvent) -> usize {
        debug!(
            "Publishing refresh for project {} session {:?}",
            event.project_id, event.session_id
        );
        self.tx.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RefreshEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for RefreshBus {
    fn default() -> Self {
        Self::new(64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_same_session() {
        let event = RefreshEvent::new(7, Some("main"));
        let key = WorkspaceKey::new(7, Some("main")).unwrap();
        assert!(event.matches(&key, None));
    }

    #[test]
    fn test_match_both_default() {
        let event = RefreshEvent::new(7, None::<String>);
        let key = WorkspaceKey::default_branch(7);
        assert!(event.matches(&key, None));
    }

    #[test]
    fn test_match_named_default_against_no_session() {
        // Event names the default branch; the view has no explicit session.
        let event = RefreshEvent::new(7, Some("main"));
        let key = WorkspaceKey::default_branch(7);
        assert!(event.matches(&key, Some("main")));
        assert!(!event.matches(&key, Some("master")));
        assert!(!event.matches(&key, None));
    }

    #[test]
    fn test_match_no_session_against_named_default() {
        let event = RefreshEvent::new(7, None::<String>);
        let key = WorkspaceKey::new(7, Some("main")).unwrap();
        assert!(event.matches(&key, Some("main")));
        assert!(!event.matches(&key, Some("develop")));
    }

    #[test]
    fn test_no_match_other_project() {
        let event = RefreshEvent::new(8, Some("main"));
        let key = WorkspaceKey::new(7, Some("main")).unwrap();
        assert!(!event.matches(&key, Some("main")));
    }

    #[tokio::test]
    async fn test_bus_delivers_to_subscriber() {
        let bus = RefreshBus::new(8);
        let mut rx = bus.subscribe();

        let delivered = bus.publish(RefreshEvent::new(1, Some("s1")));
        assert_eq!(delivered, 1);

        let event = rx.recv().await.unwrap();
        assert_eq!(event.project_id, 1);
        assert_eq!(event.session_id.as_deref(), Some("s1"));
    }

    #[test]
    fn test_bus_publish_without_subscribers() {
        let bus = RefreshBus::new(8);
        assert_eq!(bus.publish(RefreshEvent::new(1, None::<String>)), 0);
    }
}
