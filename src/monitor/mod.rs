//! Replica status polling.
//!
//! # Data Flow
//! ```text
//! interval tick
//!     → SnapshotSource::fetch_replica_rows()
//!     → signature.rs (canonical comparable form)
//!     → unchanged? sleep until next tick
//!     → changed: parse rows → Broker::on_snapshot_changed(entities)
//! ```
//!
//! # Design Decisions
//! - One long-lived poll task, stopped cooperatively via the shutdown signal
//! - Fetch failures and zero-row results are reported, never fatal
//! - Change detection is a cheap case-insensitive string comparison; parsing
//!   only happens when something actually changed

pub mod poller;
pub mod signature;

pub use poller::StatusPoller;
