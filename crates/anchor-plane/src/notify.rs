//! Registry event notifications
//!
//! The coordinator publishes an event after each committed state transition.
//! Delivery is best effort: events fan out over a bounded broadcast channel,
//! a subscriber that falls behind loses the oldest events, and nothing is
//! replayed. Clients that reconnect re-read state through the query routes.

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;

use anchor_core::{Address, RootHash};
use anchor_ledger::TxHash;

/// Default number of events buffered per subscriber
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// One outstanding root approval
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingSummary {
    pub root: RootHash,
    pub first_admin: Address,
}

/// Events pushed to subscribers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RegistryEvent {
    /// The full list of roots awaiting a second signature
    PendingUpdates { pending: Vec<PendingSummary> },

    /// A root was committed on the ledger
    MerkleRootUpdated {
        root: RootHash,
        transaction_hash: TxHash,
    },
}

impl RegistryEvent {
    /// Event name used on the wire
    pub fn name(&self) -> &'static str {
        match self {
            RegistryEvent::PendingUpdates { .. } => "pending_updates",
            RegistryEvent::MerkleRootUpdated { .. } => "merkle_root_updated",
        }
    }
}

/// Sink for registry events
///
/// `publish` is synchronous and must not block; it is called after the
/// coordinator has released its lock.
pub trait Notifier: Send + Sync {
    fn publish(&self, event: RegistryEvent);
}

/// `Notifier` over a tokio broadcast channel
#[derive(Debug, Clone)]
pub struct BroadcastNotifier {
    sender: broadcast::Sender<RegistryEvent>,
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for BroadcastNotifier {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

impl Notifier for BroadcastNotifier {
    fn publish(&self, event: RegistryEvent) {
        let name = event.name();
        // Err only means nobody is listening
        match self.sender.send(event) {
            Ok(receivers) => debug!(event = name, receivers, "Published registry event"),
            Err(_) => debug!(event = name, "No subscribers for registry event"),
        }
    }
}
