//! Duplex wire protocol between the broker service and its subscribers.
//!
//! One WebSocket session per client; every frame is a JSON-encoded tagged
//! message. `Attach` must be the first client frame on a session. `Update`
//! is the only server-initiated frame and carries no acknowledgment.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::replica::ReplicaInfo;

/// Which load-status slice a pass-through query asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadStatusSlice {
    ByDate,
    BySource,
    ByRegion,
}

/// A usage-tracking record forwarded to the external usage collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub user_id: String,
    pub workstation: String,
    pub full_path: String,
}

/// Client-to-server frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Attach {
        user_id: String,
        workstation: String,
        application: String,
    },
    Detach,
    GetAvailableCubeStatus,
    GetActiveReplica,
    GetLoadStatus {
        slice: LoadStatusSlice,
        date: NaiveDate,
    },
    SendUsageRecord {
        record: UsageRecord,
    },
}

/// Error codes surfaced to clients. Protocol misuse is benign: the session
/// stays usable unless the transport itself failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    NotAttached,
    BadRequest,
    Unavailable,
}

/// Server-to-client frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Attached {
        session_id: Uuid,
    },
    /// Pushed view update, fire-and-forget.
    Update {
        view: Vec<ReplicaInfo>,
    },
    CubeStatus {
        view: Vec<ReplicaInfo>,
    },
    ActiveReplica {
        replica: Option<ReplicaInfo>,
    },
    LoadStatus {
        rows: Vec<serde_json::Value>,
    },
    Detached,
    Error {
        code: ErrorCode,
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attach_frame_shape_is_stable() {
        let frame = ClientMessage::Attach {
            user_id: "u1".into(),
            workstation: "ws1".into(),
            application: "excel".into(),
        };
        let json = serde_json::to_string(&frame).unwrap();
        assert!(json.contains(r#""type":"attach""#), "got {json}");
        assert!(json.contains(r#""user_id":"u1""#));
    }

    #[test]
    fn update_is_distinguishable_from_pull_replies() {
        let update: ServerMessage =
            serde_json::from_str(r#"{"type":"update","view":[]}"#).unwrap();
        assert!(matches!(update, ServerMessage::Update { .. }));

        let reply: ServerMessage =
            serde_json::from_str(r#"{"type":"cube_status","view":[]}"#).unwrap();
        assert!(matches!(reply, ServerMessage::CubeStatus { .. }));
    }
}
