//! Snapshot source boundary.

use async_trait::async_trait;
use thiserror::Error;

use crate::replica::ReplicaRow;

/// Failure fetching from an external collaborator. Always transient from the
/// core's point of view: the poll loop reports it and continues.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed source data: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("query failed: {0}")]
    Query(String),
}

/// Provider of the ordered replica rows polled every tick.
///
/// Row order is significant: it defines the index space for rotation views,
/// so implementations must return rows in a stable source-defined order.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn fetch_replica_rows(&self) -> Result<Vec<ReplicaRow>, SourceError>;
}
