//! Replica data model.
//!
//! # Data Flow
//! ```text
//! SnapshotSource rows (raw strings)
//!     → info.rs (role classification, timestamp parsing)
//!     → ReplicaInfo (typed, wire-serializable)
//!     → rotation views / broker / clients
//! ```
//!
//! # Design Decisions
//! - Role is a closed two-variant enum; unrecognized tags fall back to Writer
//! - Timestamp parse failures keep the row and leave the epoch sentinel
//! - `active` is rotation-view state, never sourced from the poll itself

pub mod info;

pub use info::{ReplicaInfo, ReplicaRole, ReplicaRow};
