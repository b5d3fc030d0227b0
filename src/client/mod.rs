//! Subscriber client.
//!
//! # Data Flow
//! ```text
//! attach() → duplex session → Attach frame → Attached ack
//!     → read loop: Update frames → update callback
//!     → pull calls share the session, replies matched in order
//!
//! transport fault → Faulted → status callback "disconnected"
//!     → bounded backoff (cancellable by shutdown) → attach() again
//! ```
//!
//! # Design Decisions
//! - The reconnect loop is the only retry path; pulls fail fast when not
//!   connected instead of retrying internally
//! - A pushed update arriving after shutdown has begun is accepted and
//!   discarded; the local cache stops changing once shutdown starts
//! - Connection status reaches the embedding application only as
//!   connect/disconnect events, never as raw transport errors

pub mod connection;
pub mod tracker;

use thiserror::Error;

pub use connection::{ClientConnection, ClientOptions};
pub use tracker::TrackedConnections;

/// Client connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    /// Transient: a backoff-then-reconnect cycle is in progress, unless the
    /// client is shutting down.
    Faulted,
}

/// Client-side failures surfaced to the embedding application.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The session is not in the `Connected` state; pull calls are rejected
    /// with this rather than queued or retried.
    #[error("not connected to the broker")]
    NotConnected,
    #[error("transport failure: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("attach handshake timed out")]
    Timeout,
    #[error("invalid endpoint: {0}")]
    Endpoint(#[from] url::ParseError),
    #[error("broker rejected the request: {0}")]
    Rejected(String),
    #[error("protocol violation: {0}")]
    Protocol(String),
}
