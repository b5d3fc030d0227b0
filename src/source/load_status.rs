//! Load-status query boundary.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::protocol::LoadStatusSlice;
use crate::source::snapshot::SourceError;

/// Pass-through collaborator answering date-parameterized load-status
/// queries. Rows are opaque to the core and forwarded to clients verbatim.
#[async_trait]
pub trait LoadStatusSource: Send + Sync {
    async fn load_status(
        &self,
        slice: LoadStatusSlice,
        date: NaiveDate,
    ) -> Result<Vec<serde_json::Value>, SourceError>;
}
