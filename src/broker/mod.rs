//! Broker: fan-out engine and subscriber registry.
//!
//! # Data Flow
//! ```text
//! poller change event
//!     → core.rs: install RotationBuffer + reset cursor (one region)
//!     → broadcast: newest-to-oldest over registry.rs entries
//!         → per subscriber: next_view() → push delivery
//!         → delivery failure → evict, no retry
//!
//! client pull (same rotation cursor):
//!     GetAvailableCubeStatus → next_view()
//!     GetActiveReplica → next_view() → single active entry
//! ```
//!
//! # Design Decisions
//! - Two exclusion regions: rotation (views + cursor) and registry; a slow
//!   subscriber can cost at most one `next_view` inside the registry region
//! - A broken push channel is assumed permanently broken; clients re-attach
//! - No ambient state: one `Broker` instance owns everything

pub mod core;
pub mod registry;

pub use core::Broker;
pub use registry::{AttachOutcome, SubscriberHandle};
