//! Driving Behavior Processor - Main Entry Point

use app::{init_logging, load_config, run};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args().nth(1);
    let config = load_config(config_path.as_deref())?;
    init_logging(&config.logging)?;

    info!("=== Driving Behavior Processor v{} ===", env!("CARGO_PKG_VERSION"));
    run(config).await
}
