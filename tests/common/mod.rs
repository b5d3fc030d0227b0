//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpListener;

use cube_broker::broker::Broker;
use cube_broker::client::ClientOptions;
use cube_broker::config::ReconnectConfig;
use cube_broker::lifecycle::Shutdown;
use cube_broker::protocol::UsageRecord;
use cube_broker::replica::ReplicaRow;
use cube_broker::server::{self, AppState};
use cube_broker::source::{LoadStatusSource, SnapshotSource, SourceError, UsageSink};

/// Snapshot source whose rows tests swap at will.
#[derive(Clone, Default)]
#[allow(dead_code)]
pub struct ScriptedSource {
    rows: Arc<Mutex<Vec<ReplicaRow>>>,
}

#[allow(dead_code)]
impl ScriptedSource {
    pub fn new(rows: Vec<ReplicaRow>) -> Self {
        Self {
            rows: Arc::new(Mutex::new(rows)),
        }
    }

    pub fn set(&self, rows: Vec<ReplicaRow>) {
        *self.rows.lock().unwrap() = rows;
    }
}

#[async_trait]
impl SnapshotSource for ScriptedSource {
    async fn fetch_replica_rows(&self) -> Result<Vec<ReplicaRow>, SourceError> {
        Ok(self.rows.lock().unwrap().clone())
    }
}

/// Usage sink capturing every record for assertions.
#[derive(Default)]
#[allow(dead_code)]
pub struct CapturingUsageSink {
    pub records: Mutex<Vec<UsageRecord>>,
}

impl UsageSink for CapturingUsageSink {
    fn record(&self, record: &UsageRecord) {
        self.records.lock().unwrap().push(record.clone());
    }
}

#[allow(dead_code)]
pub fn row(host: &str, role_tag: &str) -> ReplicaRow {
    ReplicaRow {
        host: host.into(),
        database: "db1".into(),
        cube_name: "cubeA".into(),
        role_tag: role_tag.into(),
        last_schema_change: "2024-03-01 04:30:00".into(),
    }
}

/// Spawn a broker endpoint on an ephemeral port.
#[allow(dead_code)]
pub async fn spawn_broker() -> (SocketAddr, Arc<Broker>, Arc<Shutdown>) {
    spawn_broker_with(Arc::new(CapturingUsageSink::default()), None).await
}

/// Spawn a broker endpoint with explicit collaborators.
#[allow(dead_code)]
pub async fn spawn_broker_with(
    usage: Arc<dyn UsageSink>,
    load_status: Option<Arc<dyn LoadStatusSource>>,
) -> (SocketAddr, Arc<Broker>, Arc<Shutdown>) {
    let broker = Arc::new(Broker::new());
    let shutdown = Arc::new(Shutdown::new());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let state = AppState {
        broker: broker.clone(),
        load_status,
        usage,
        shutdown: shutdown.clone(),
    };
    tokio::spawn(async move {
        let _ = server::serve(listener, state).await;
    });

    (addr, broker, shutdown)
}

/// Respawn a broker endpoint on a specific address (restart scenarios).
/// Retries the bind while the previous listener is still draining.
#[allow(dead_code)]
pub async fn respawn_broker_at(addr: SocketAddr) -> (Arc<Broker>, Arc<Shutdown>) {
    let broker = Arc::new(Broker::new());
    let shutdown = Arc::new(Shutdown::new());
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    let listener = loop {
        match TcpListener::bind(addr).await {
            Ok(listener) => break listener,
            Err(e) if tokio::time::Instant::now() < deadline => {
                tracing::debug!(error = %e, "Bind retry while old listener drains");
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            Err(e) => panic!("could not rebind {addr}: {e}"),
        }
    };

    let state = AppState {
        broker: broker.clone(),
        load_status: None,
        usage: Arc::new(CapturingUsageSink::default()),
        shutdown: shutdown.clone(),
    };
    tokio::spawn(async move {
        let _ = server::serve(listener, state).await;
    });

    (broker, shutdown)
}

#[allow(dead_code)]
pub fn client_options(addr: SocketAddr, user_id: &str) -> ClientOptions {
    ClientOptions {
        endpoint: format!("ws://{addr}/subscribe"),
        user_id: user_id.to_string(),
        workstation: "test-ws".to_string(),
        application: "integration-test".to_string(),
        reconnect: ReconnectConfig {
            base_delay_ms: 50,
            max_delay_ms: 400,
        },
    }
}

/// Poll a condition with a deadline instead of a fixed sleep.
#[allow(dead_code)]
pub async fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    condition()
}
