//! Usage-tracking boundary.

use crate::protocol::UsageRecord;

/// Receiver for usage records forwarded by subscribers.
pub trait UsageSink: Send + Sync {
    fn record(&self, record: &UsageRecord);
}

/// Default sink: one structured log line per record.
pub struct LogUsageSink;

impl UsageSink for LogUsageSink {
    fn record(&self, record: &UsageRecord) {
        tracing::info!(
            user_id = %record.user_id,
            workstation = %record.workstation,
            path = %record.full_path,
            "Usage record received"
        );
    }
}
