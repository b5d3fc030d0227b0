//! Shutdown coordination.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::broadcast;

/// Cooperative shutdown signal shared by the poller, the service endpoint
/// and client reconnect sleeps.
///
/// Triggering is idempotent and sticky: tasks that subscribe (or call
/// [`Shutdown::wait`]) after the trigger still observe it, which is what
/// lets a backoff sleep started mid-shutdown end immediately.
pub struct Shutdown {
    tx: broadcast::Sender<()>,
    fired: AtomicBool,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self {
            tx,
            fired: AtomicBool::new(false),
        }
    }

    /// Subscribe to the shutdown signal for use in a `select!` loop.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Fire the signal. Safe to call more than once.
    pub fn trigger(&self) {
        self.fired.store(true, Ordering::SeqCst);
        let _ = self.tx.send(());
    }

    /// Non-blocking check for loops that must not wait.
    pub fn is_triggered(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }

    /// Resolve once the signal has fired, immediately if it already has.
    pub async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        if self.is_triggered() {
            return;
        }
        let _ = rx.recv().await;
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn wait_resolves_for_late_subscribers() {
        let shutdown = Shutdown::new();
        shutdown.trigger();
        shutdown.trigger();
        assert!(shutdown.is_triggered());

        tokio::time::timeout(Duration::from_millis(100), shutdown.wait())
            .await
            .expect("wait after trigger must not block");
    }

    #[tokio::test]
    async fn subscribers_observe_the_trigger() {
        let shutdown = Shutdown::new();
        let mut rx = shutdown.subscribe();
        shutdown.trigger();
        tokio::time::timeout(Duration::from_millis(100), rx.recv())
            .await
            .expect("signal delivered")
            .expect("channel open");
    }
}
