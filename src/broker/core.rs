//! The broker itself.

use std::sync::Mutex;

use uuid::Uuid;

use crate::broker::registry::{AttachOutcome, Registry, SubscriberHandle};
use crate::observability::metrics;
use crate::replica::ReplicaInfo;
use crate::rotation::RotationBuffer;

/// Owns the current rotation buffer and the subscriber registry.
///
/// Invoked concurrently from the poller task (snapshot changes) and from any
/// number of session tasks (pulls, attach/detach). Rotation state and the
/// registry sit behind separate locks; broadcast holds the registry lock and
/// takes the rotation lock once per delivery, never the reverse order.
pub struct Broker {
    rotation: Mutex<RotationBuffer>,
    registry: Mutex<Registry>,
}

impl Broker {
    pub fn new() -> Self {
        Self {
            rotation: Mutex::new(RotationBuffer::empty()),
            registry: Mutex::new(Registry::default()),
        }
    }

    /// Register a subscriber. Duplicate registration of the same session is
    /// a benign no-op, reported as a warning.
    pub fn attach(&self, handle: SubscriberHandle) -> AttachOutcome {
        let id = handle.id();
        let outcome = {
            let mut registry = self.registry.lock().unwrap();
            let outcome = registry.attach(handle);
            metrics::set_subscribers(registry.len());
            outcome
        };
        match outcome {
            AttachOutcome::Registered => {
                tracing::info!(session_id = %id, "Subscriber attached");
            }
            AttachOutcome::Duplicate => {
                tracing::warn!(session_id = %id, "Duplicate attach attempt ignored");
            }
        }
        outcome
    }

    /// Remove a subscriber. Detaching an unknown session is a benign no-op,
    /// reported as a warning.
    pub fn detach(&self, id: Uuid) -> bool {
        let removed = {
            let mut registry = self.registry.lock().unwrap();
            let removed = registry.detach(id);
            metrics::set_subscribers(registry.len());
            removed
        };
        if removed {
            tracing::info!(session_id = %id, "Subscriber detached");
        } else {
            tracing::warn!(session_id = %id, "Detach for unknown subscriber");
        }
        removed
    }

    /// Install the rotation buffer for a changed snapshot and fan it out.
    ///
    /// An empty entity list is still installed (an all-writer or empty view
    /// is a valid state) but reported as an anomaly, as is a snapshot with
    /// no readers.
    pub fn on_snapshot_changed(&self, entities: Vec<ReplicaInfo>) {
        if entities.is_empty() {
            tracing::error!("Snapshot change carries no replicas, installing empty view");
        } else if !entities.iter().any(ReplicaInfo::is_reader) {
            tracing::error!(
                replicas = entities.len(),
                "No readers in snapshot, installing writer-only view"
            );
        }

        {
            let mut rotation = self.rotation.lock().unwrap();
            *rotation = RotationBuffer::from_entities(&entities);
        }

        self.broadcast();
    }

    /// Push the next rotation view to every registered subscriber, evicting
    /// any whose delivery fails. Failed subscribers get no retry; they are
    /// expected to re-attach.
    pub fn broadcast(&self) {
        let (delivered, evicted) = {
            let mut registry = self.registry.lock().unwrap();
            let counts = registry.broadcast(|| self.next_view());
            metrics::set_subscribers(registry.len());
            counts
        };
        metrics::record_broadcast(delivered, evicted);
        tracing::info!(delivered, evicted, "Broadcast complete");
    }

    /// Hand out the next view in rotation. Shared by push broadcast and the
    /// pull calls; every caller observes and advances the cursor in strict
    /// sequence.
    pub fn next_view(&self) -> Vec<ReplicaInfo> {
        self.rotation.lock().unwrap().next_view()
    }

    /// The single recommended replica within the next rotation view, or
    /// `None` when the snapshot has no readers.
    pub fn active_replica(&self) -> Option<ReplicaInfo> {
        self.next_view().into_iter().find(|e| e.active)
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry.lock().unwrap().len()
    }

    /// `(view_count, cursor)` of the installed buffer, for the status route.
    pub fn rotation_stats(&self) -> (usize, usize) {
        let rotation = self.rotation.lock().unwrap();
        (rotation.view_count(), rotation.cursor())
    }
}

impl Default for Broker {
    fn default() -> Self {
        Self::new()
    }
}
