//! Driving Behavior Processor Service
//!
//! Loads configuration, initializes logging, and runs the processor on the
//! MQTT bus until Ctrl-C.

mod settings;

pub use settings::{
    load_config, AppConfig, ConfigError, LoggingConfig, DEFAULT_CONFIG_FILE, ENV_PREFIX,
};

use mqtt_bridge::MqttBridge;
use processor::DrivingBehaviorProcessor;
use tracing::{error, info};
use tracing_subscriber::FmtSubscriber;

/// Initialize logging
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let builder = FmtSubscriber::builder()
        .with_max_level(config.max_level()?)
        .with_target(true);

    if config.json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

/// Resolves on Ctrl-C; never resolves if the signal handler cannot be installed
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl-C"),
        Err(e) => {
            error!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

/// Run the processor until shutdown
pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    let processor = DrivingBehaviorProcessor::new(config.processor)?;
    let bridge = MqttBridge::new(config.broker);

    bridge.run(&processor, shutdown_signal()).await;
    Ok(())
}
