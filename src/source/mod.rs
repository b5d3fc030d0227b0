//! External collaborator boundaries.
//!
//! # Data Flow
//! ```text
//! SnapshotSource (snapshot.rs):
//!     poller tick → fetch_replica_rows() → raw rows → monitor
//!
//! LoadStatusSource (load_status.rs):
//!     client pull → date-parameterized slice query → opaque rows
//!
//! UsageSink (usage.rs):
//!     SendUsageRecord frame → record() → external usage tracker
//! ```
//!
//! # Design Decisions
//! - Query execution and connection management stay behind these traits;
//!   the core never sees a connection string
//! - `JsonFileSource` (file.rs) is the bundled snapshot source so the
//!   service runs and tests exercise the full pipeline without a database

pub mod file;
pub mod load_status;
pub mod snapshot;
pub mod usage;

pub use file::JsonFileSource;
pub use load_status::LoadStatusSource;
pub use snapshot::{SnapshotSource, SourceError};
pub use usage::{LogUsageSink, UsageSink};
