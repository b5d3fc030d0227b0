//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the broker service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct BrokerConfig {
    /// Service endpoint (bind address).
    pub listener: ListenerConfig,

    /// Snapshot polling settings.
    pub poller: PollerConfig,

    /// Client reconnect backoff settings.
    pub reconnect: ReconnectConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Snapshot source settings.
    pub source: SourceConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:9400").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:9400".to_string(),
        }
    }
}

/// Snapshot poller configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PollerConfig {
    /// Poll interval in milliseconds.
    pub interval_ms: u64,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval_ms: 20_000,
        }
    }
}

/// Reconnect backoff configuration for subscriber clients.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReconnectConfig {
    /// Delay before the first reattach attempt, in milliseconds.
    pub base_delay_ms: u64,

    /// Cap on the doubled delay, in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: 1_000,
            max_delay_ms: 360_000,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable the Prometheus metrics exporter.
    pub metrics_enabled: bool,

    /// Metrics exporter bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Snapshot source configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Path to the JSON replica-status document polled each tick.
    pub status_path: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            status_path: "replica-status.json".to_string(),
        }
    }
}
