//! Broadcast fabric adapter: named-group publish/subscribe.
//!
//! Each group is a `tokio::sync::broadcast` channel created on first join
//! and removed once its last subscriber leaves. Publications to a group
//! with no subscribers are dropped — the fabric does not retry or persist
//! undelivered messages.

use std::sync::Arc;

use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::broadcast;

use crate::models::UserId;

/// Capacity of each group channel. Subscribers that fall behind skip
/// messages (RecvError::Lagged).
const GROUP_CAPACITY: usize = 256;

/// A message published onto a group. `kind` becomes the `event` field of
/// the envelope relayed to subscribed connections.
#[derive(Debug, Clone)]
pub struct Publication {
    pub kind: String,
    pub payload: Value,
}

impl Publication {
    pub fn new(kind: &str, payload: Value) -> Self {
        Self {
            kind: kind.to_string(),
            payload,
        }
    }
}

/// Name of a user's personal broadcast group.
pub fn personal_group(user_id: UserId) -> String {
    format!("user:{user_id}")
}

/// The in-process broadcast fabric. Store in `AppState`.
pub struct BroadcastFabric {
    groups: DashMap<String, broadcast::Sender<Arc<Publication>>>,
}

impl BroadcastFabric {
    pub fn new() -> Self {
        Self {
            groups: DashMap::new(),
        }
    }

    /// Join a group, creating it if needed. The returned receiver is the
    /// subscription; dropping it unsubscribes.
    pub fn join(&self, group: &str) -> broadcast::Receiver<Arc<Publication>> {
        self.groups
            .entry(group.to_string())
            .or_insert_with(|| broadcast::channel(GROUP_CAPACITY).0)
            .subscribe()
    }

    /// Drop the group's channel if no subscribers remain. Callers drop
    /// their receiver first, then leave.
    pub fn leave(&self, group: &str) {
        self.groups
            .remove_if(group, |_, sender| sender.receiver_count() == 0);
    }

    /// Publish to all current subscribers of a group. A missing group or
    /// an empty one is a silent no-op.
    pub fn publish(&self, group: &str, publication: Publication) {
        if let Some(sender) = self.groups.get(group) {
            let _ = sender.send(Arc::new(publication));
        }
    }
}

impl Default for BroadcastFabric {
    fn default() -> Self {
        Self::new()
    }
}
