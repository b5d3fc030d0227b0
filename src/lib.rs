//! Push-based status broker for a pool of OLAP cube replicas.
//!
//! # Architecture Overview
//!
//! ```text
//!   SnapshotSource ──▶ monitor (poll, detect change)
//!                          │ changed entity list
//!                          ▼
//!                      rotation (one view per reader)
//!                          │ RotationBuffer + cursor
//!                          ▼
//!   clients ◀── push ── broker ──▶ registry (attach/detach/evict)
//!       ▲                  ▲
//!       │ pull (same cursor)│
//!       └── client (duplex session, backoff reconnect)
//! ```
//!
//! The broker owns one rotation buffer, replaced wholesale on every detected
//! change, and rotates load-balanced views round-robin across push
//! deliveries and pull calls alike. Subscribers hold a persistent duplex
//! session and re-attach with bounded exponential backoff after a fault.

// Core pipeline
pub mod broker;
pub mod monitor;
pub mod replica;
pub mod rotation;

// Boundaries
pub mod client;
pub mod protocol;
pub mod server;
pub mod source;

// Cross-cutting concerns
pub mod config;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use broker::Broker;
pub use client::ClientConnection;
pub use config::BrokerConfig;
pub use lifecycle::Shutdown;
