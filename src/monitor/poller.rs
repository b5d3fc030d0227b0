//! Change-detection poll loop.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time;

use crate::broker::Broker;
use crate::monitor::signature::{build_signature, same_signature};
use crate::observability::metrics;
use crate::replica::ReplicaInfo;
use crate::source::{SnapshotSource, SourceError};

/// Polls the snapshot source on a fixed interval and surfaces changed
/// snapshots to the broker.
pub struct StatusPoller<S> {
    source: S,
    interval: Duration,
    last_signature: String,
}

impl<S: SnapshotSource> StatusPoller<S> {
    pub fn new(source: S, interval: Duration) -> Self {
        Self {
            source,
            interval,
            last_signature: String::new(),
        }
    }

    /// One poll tick.
    ///
    /// `Ok(None)` means the signature matched the previous poll and nothing
    /// else was done. `Ok(Some(entities))` means the signature changed, was
    /// retained, and the rows were parsed into the new entity list.
    pub async fn poll_once(&mut self) -> Result<Option<Vec<ReplicaInfo>>, SourceError> {
        let rows = self.source.fetch_replica_rows().await?;
        if rows.is_empty() {
            tracing::error!("Snapshot poll returned no replica rows");
        }

        let signature = build_signature(&rows);
        if same_signature(&signature, &self.last_signature) {
            return Ok(None);
        }
        self.last_signature = signature;

        let entities = rows.iter().map(ReplicaInfo::from_row).collect();
        Ok(Some(entities))
    }

    /// Run the poll loop until the shutdown signal fires.
    ///
    /// Fetch failures are reported and absorbed; the loop only exits on
    /// shutdown. An in-flight fetch is allowed to finish naturally.
    pub async fn run(mut self, broker: Arc<Broker>, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            interval_ms = self.interval.as_millis() as u64,
            "Status poller starting"
        );

        let mut ticker = time::interval(self.interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.poll_once().await {
                        Ok(Some(entities)) => {
                            metrics::record_poll(true);
                            tracing::info!(
                                replicas = entities.len(),
                                "Replica status changed"
                            );
                            broker.on_snapshot_changed(entities);
                        }
                        Ok(None) => metrics::record_poll(false),
                        Err(e) => {
                            metrics::record_poll_failure();
                            tracing::error!(error = %e, "Snapshot poll failed");
                        }
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Status poller received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    use crate::replica::{ReplicaRole, ReplicaRow};

    /// Source whose next result is swapped in by each test step.
    #[derive(Clone)]
    struct ScriptedSource {
        next: Arc<Mutex<Result<Vec<ReplicaRow>, String>>>,
    }

    impl ScriptedSource {
        fn new(rows: Vec<ReplicaRow>) -> Self {
            Self {
                next: Arc::new(Mutex::new(Ok(rows))),
            }
        }

        fn set(&self, rows: Vec<ReplicaRow>) {
            *self.next.lock().unwrap() = Ok(rows);
        }

        fn fail(&self, message: &str) {
            *self.next.lock().unwrap() = Err(message.to_string());
        }
    }

    #[async_trait]
    impl SnapshotSource for ScriptedSource {
        async fn fetch_replica_rows(&self) -> Result<Vec<ReplicaRow>, SourceError> {
            match &*self.next.lock().unwrap() {
                Ok(rows) => Ok(rows.clone()),
                Err(msg) => Err(SourceError::Query(msg.clone())),
            }
        }
    }

    fn row(host: &str, role_tag: &str) -> ReplicaRow {
        ReplicaRow {
            host: host.into(),
            database: "db1".into(),
            cube_name: "cubeA".into(),
            role_tag: role_tag.into(),
            last_schema_change: "2024-03-01 04:30:00".into(),
        }
    }

    #[tokio::test]
    async fn first_poll_is_a_change_and_repeat_is_not() {
        let source = ScriptedSource::new(vec![row("h1", "READER"), row("h2", "WRITER")]);
        let mut poller = StatusPoller::new(source.clone(), Duration::from_secs(1));

        let entities = poller.poll_once().await.unwrap().expect("first poll changes");
        assert_eq!(entities.len(), 2);
        assert_eq!(entities[0].role, ReplicaRole::Reader);
        assert_eq!(entities[1].role, ReplicaRole::Writer);

        assert!(poller.poll_once().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn casing_drift_is_not_a_change() {
        let source = ScriptedSource::new(vec![row("OLAP01", "READER")]);
        let mut poller = StatusPoller::new(source.clone(), Duration::from_secs(1));
        poller.poll_once().await.unwrap().expect("first poll changes");

        source.set(vec![row("olap01", "READER")]);
        assert!(poller.poll_once().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn role_flip_is_a_change() {
        let source = ScriptedSource::new(vec![row("h1", "READER")]);
        let mut poller = StatusPoller::new(source.clone(), Duration::from_secs(1));
        poller.poll_once().await.unwrap().expect("first poll changes");

        source.set(vec![row("h1", "WRITER")]);
        let entities = poller.poll_once().await.unwrap().expect("role flip changes");
        assert_eq!(entities[0].role, ReplicaRole::Writer);
    }

    #[tokio::test]
    async fn failed_tick_keeps_previous_signature() {
        let source = ScriptedSource::new(vec![row("h1", "READER")]);
        let mut poller = StatusPoller::new(source.clone(), Duration::from_secs(1));
        poller.poll_once().await.unwrap().expect("first poll changes");

        source.fail("connection reset");
        assert!(poller.poll_once().await.is_err());

        // Same data after recovery: still no spurious change event.
        source.set(vec![row("h1", "READER")]);
        assert!(poller.poll_once().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn zero_rows_after_data_is_a_change_to_empty() {
        let source = ScriptedSource::new(vec![row("h1", "READER")]);
        let mut poller = StatusPoller::new(source.clone(), Duration::from_secs(1));
        poller.poll_once().await.unwrap().expect("first poll changes");

        source.set(Vec::new());
        let entities = poller.poll_once().await.unwrap().expect("empty poll changes");
        assert!(entities.is_empty());
    }
}
