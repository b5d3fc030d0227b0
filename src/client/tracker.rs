//! Usage tracking with path deduplication.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::client::connection::ClientConnection;
use crate::protocol::UsageRecord;

/// Client-side cache of workbook paths already reported to the broker.
///
/// The first sighting of a path sends one usage record; later sightings are
/// ignored. A failed send is logged and not retried, matching the
/// at-most-once semantics of the usage channel.
#[derive(Default)]
pub struct TrackedConnections {
    // path → successfully sent to the broker
    seen: Mutex<HashMap<String, bool>>,
}

impl TrackedConnections {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn track(&self, connection: &ClientConnection, full_path: &str) {
        {
            let mut seen = self.seen.lock().unwrap();
            if seen.contains_key(full_path) {
                return;
            }
            seen.insert(full_path.to_string(), false);
        }

        let options = connection.options();
        let record = UsageRecord {
            user_id: options.user_id.clone(),
            workstation: options.workstation.clone(),
            full_path: full_path.to_string(),
        };

        match connection.send_usage_record(record).await {
            Ok(()) => {
                self.seen.lock().unwrap().insert(full_path.to_string(), true);
            }
            Err(e) => {
                tracing::warn!(error = %e, path = %full_path, "Usage record not sent");
            }
        }
    }

    pub fn tracked_count(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}
