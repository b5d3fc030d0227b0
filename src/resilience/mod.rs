//! Client-side resilience.
//!
//! # Data Flow
//! ```text
//! Transport fault observed:
//!     → backoff.rs (next bounded delay)
//!     → cancellable sleep against the shutdown signal
//!     → re-attach end-to-end
//! ```
//!
//! # Design Decisions
//! - Unbounded attempts, bounded per-attempt delay
//! - Deterministic schedule, no jitter: clients are few and human-paced,
//!   and the delay sequence is part of the connection contract
//! - A successful attach is the only thing that resets the schedule

pub mod backoff;

pub use backoff::ReconnectBackoff;
