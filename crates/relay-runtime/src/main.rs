//! # MQ Relay
//!
//! Routes partner messages to their recipients and dispatches internal
//! events to handlers.
//!
//! ## Startup Sequence
//!
//! 1. Load configuration from the environment
//! 2. Initialize logging and metrics
//! 3. Declare the broker topology
//! 4. Start inbound consumers and the dispatcher
//! 5. Wait for Ctrl+C, then shut down in reverse order

use anyhow::{Context, Result};
use mq_telemetry::init_telemetry;
use relay_runtime::{RelayRuntime, RuntimeConfig};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let config = RuntimeConfig::from_env().context("Invalid relay configuration")?;
    let _telemetry = init_telemetry(&config.telemetry).context("Failed to initialize telemetry")?;

    let registrations = RelayRuntime::default_registrations(&config);
    let mut runtime = RelayRuntime::new(config);
    runtime
        .start(registrations)
        .context("Failed to start relay runtime")?;

    info!("Relay is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;

    runtime.shutdown().await;
    Ok(())
}
