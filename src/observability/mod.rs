//! Observability.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (counters and gauges)
//!
//! Consumers:
//!     → stdout log aggregation
//!     → Prometheus scrape of the exporter endpoint
//! ```
//!
//! # Design Decisions
//! - Structured fields on every event; no free-form string concatenation
//! - Metric updates are cheap and fire even when no exporter is installed
//! - The exporter is opt-in via configuration

pub mod logging;
pub mod metrics;
