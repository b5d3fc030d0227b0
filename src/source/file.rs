//! File-backed snapshot source.
//!
//! Reads a JSON array of replica rows from disk on every tick. This is the
//! source the bundled service binary runs with: the file is rewritten by
//! whatever operational process knows the real replica state, and the poller
//! picks the change up on its next tick.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::replica::ReplicaRow;
use crate::source::snapshot::{SnapshotSource, SourceError};

pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl SnapshotSource for JsonFileSource {
    async fn fetch_replica_rows(&self) -> Result<Vec<ReplicaRow>, SourceError> {
        let content = tokio::fs::read_to_string(&self.path).await?;
        let rows = serde_json::from_str(&content)?;
        Ok(rows)
    }
}
