//! Configuration validation.
//!
//! Semantic checks on top of serde's syntactic ones. Returns all violations,
//! not just the first.

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::BrokerConfig;

/// One semantic violation, as `field: problem`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub problem: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.problem)
    }
}

pub fn validate_config(config: &BrokerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError {
            field: "listener.bind_address",
            problem: format!("not a socket address: {:?}", config.listener.bind_address),
        });
    }

    if config.poller.interval_ms == 0 {
        errors.push(ValidationError {
            field: "poller.interval_ms",
            problem: "must be greater than zero".to_string(),
        });
    }

    if config.reconnect.base_delay_ms == 0 {
        errors.push(ValidationError {
            field: "reconnect.base_delay_ms",
            problem: "must be greater than zero".to_string(),
        });
    }
    if config.reconnect.max_delay_ms < config.reconnect.base_delay_ms {
        errors.push(ValidationError {
            field: "reconnect.max_delay_ms",
            problem: "must not be below base_delay_ms".to_string(),
        });
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError {
            field: "observability.metrics_address",
            problem: format!(
                "not a socket address: {:?}",
                config.observability.metrics_address
            ),
        });
    }

    if config.source.status_path.trim().is_empty() {
        errors.push(ValidationError {
            field: "source.status_path",
            problem: "must not be empty".to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate_cleanly() {
        assert!(validate_config(&BrokerConfig::default()).is_ok());
    }

    #[test]
    fn collects_every_violation() {
        let mut config = BrokerConfig::default();
        config.listener.bind_address = "not-an-address".into();
        config.poller.interval_ms = 0;
        config.reconnect.base_delay_ms = 5_000;
        config.reconnect.max_delay_ms = 1_000;

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            [
                "listener.bind_address",
                "poller.interval_ms",
                "reconnect.max_delay_ms"
            ]
        );
    }
}
