//! Subscriber registry.

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::replica::ReplicaInfo;

/// Push-delivery handle for one attached subscriber.
///
/// Delivery is a non-blocking channel send: the session task that owns the
/// receiving end forwards views onto the wire. A failed send means that task
/// is gone and the subscriber is unreachable for good.
#[derive(Debug)]
pub struct SubscriberHandle {
    id: Uuid,
    tx: mpsc::UnboundedSender<Vec<ReplicaInfo>>,
}

impl SubscriberHandle {
    pub fn new(id: Uuid, tx: mpsc::UnboundedSender<Vec<ReplicaInfo>>) -> Self {
        Self { id, tx }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn deliver(&self, view: Vec<ReplicaInfo>) -> Result<(), ()> {
        self.tx.send(view).map_err(|_| ())
    }
}

/// Result of an attach attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachOutcome {
    Registered,
    Duplicate,
}

/// Membership-only set of attached subscribers, ordered by registration.
#[derive(Debug, Default)]
pub struct Registry {
    entries: Vec<SubscriberHandle>,
}

impl Registry {
    pub fn attach(&mut self, handle: SubscriberHandle) -> AttachOutcome {
        if self.entries.iter().any(|e| e.id == handle.id) {
            return AttachOutcome::Duplicate;
        }
        self.entries.push(handle);
        AttachOutcome::Registered
    }

    pub fn detach(&mut self, id: Uuid) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != id);
        self.entries.len() != before
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Deliver one view per subscriber, newest registration first, evicting
    /// every subscriber whose delivery fails. Iterating from the tail keeps
    /// in-place removal safe without reindexing.
    ///
    /// Returns `(delivered, evicted)` counts.
    pub fn broadcast(&mut self, mut next_view: impl FnMut() -> Vec<ReplicaInfo>) -> (usize, usize) {
        let mut delivered = 0;
        let mut evicted = 0;
        for index in (0..self.entries.len()).rev() {
            if self.entries[index].deliver(next_view()).is_ok() {
                delivered += 1;
            } else {
                let gone = self.entries.remove(index);
                evicted += 1;
                tracing::warn!(session_id = %gone.id, "Removed unreachable subscriber");
            }
        }
        (delivered, evicted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle() -> (SubscriberHandle, mpsc::UnboundedReceiver<Vec<ReplicaInfo>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (SubscriberHandle::new(Uuid::new_v4(), tx), rx)
    }

    #[test]
    fn duplicate_attach_is_rejected() {
        let mut registry = Registry::default();
        let (tx, _rx) = mpsc::unbounded_channel();
        let id = Uuid::new_v4();
        assert_eq!(
            registry.attach(SubscriberHandle::new(id, tx.clone())),
            AttachOutcome::Registered
        );
        assert_eq!(
            registry.attach(SubscriberHandle::new(id, tx)),
            AttachOutcome::Duplicate
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn detach_unknown_reports_not_found() {
        let mut registry = Registry::default();
        assert!(!registry.detach(Uuid::new_v4()));

        let (h, _rx) = handle();
        let id = h.id();
        registry.attach(h);
        assert!(registry.detach(id));
        assert!(!registry.detach(id));
    }

    #[test]
    fn broadcast_evicts_only_failed_deliveries() {
        let mut registry = Registry::default();
        let (h1, mut rx1) = handle();
        let (h2, rx2) = handle();
        let (h3, mut rx3) = handle();
        registry.attach(h1);
        registry.attach(h2);
        registry.attach(h3);

        drop(rx2);

        let (delivered, evicted) = registry.broadcast(Vec::new);
        assert_eq!((delivered, evicted), (2, 1));
        assert_eq!(registry.len(), 2);
        assert!(rx1.try_recv().is_ok());
        assert!(rx3.try_recv().is_ok());

        // The evicted subscriber stays gone on the next pass.
        let (delivered, evicted) = registry.broadcast(Vec::new);
        assert_eq!((delivered, evicted), (2, 0));
    }
}
