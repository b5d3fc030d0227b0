//! Lifecycle management.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → init observability → broker + poller → serve endpoint
//!
//! Shutdown (shutdown.rs):
//!     Signal fired → poller exits at next select point → endpoint drains →
//!     client backoff sleeps end early
//! ```
//!
//! # Design Decisions
//! - One coordinator instance per process (and one per client connection)
//! - The signal is sticky: late subscribers still observe it
//! - No forced-kill path; every loop exits at its next cooperative check

pub mod shutdown;

pub use shutdown::Shutdown;
