//! Configuration management.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → BrokerConfig (validated, immutable)
//!     → handed to subsystems as resolved values at construction
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - Every field has a default so a minimal (or absent) file works
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    BrokerConfig, ListenerConfig, ObservabilityConfig, PollerConfig, ReconnectConfig,
    SourceConfig,
};
