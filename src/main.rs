//! Broker service entry point.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;

use cube_broker::broker::Broker;
use cube_broker::config::{load_config, BrokerConfig};
use cube_broker::lifecycle::Shutdown;
use cube_broker::monitor::StatusPoller;
use cube_broker::observability::{logging, metrics};
use cube_broker::server::{self, AppState};
use cube_broker::source::{JsonFileSource, LogUsageSink};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_logging("info");

    tracing::info!("cube-broker v0.1.0 starting");

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "broker.toml".to_string());
    let config = if Path::new(&config_path).exists() {
        load_config(Path::new(&config_path))?
    } else {
        tracing::warn!(path = %config_path, "No config file found, using defaults");
        BrokerConfig::default()
    };

    tracing::info!(
        bind_address = %config.listener.bind_address,
        poll_interval_ms = config.poller.interval_ms,
        status_path = %config.source.status_path,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Arc::new(Shutdown::new());
    let broker = Arc::new(Broker::new());

    // Snapshot poll loop on its own task.
    let poller = StatusPoller::new(
        JsonFileSource::new(&config.source.status_path),
        Duration::from_millis(config.poller.interval_ms),
    );
    tokio::spawn(poller.run(broker.clone(), shutdown.subscribe()));

    // Ctrl+C triggers the cooperative shutdown.
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Shutdown signal received");
                shutdown.trigger();
            }
        });
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let state = AppState {
        broker,
        load_status: None,
        usage: Arc::new(LogUsageSink),
        shutdown,
    };
    server::serve(listener, state).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
