//! Layered service configuration

use mqtt_bridge::{BrokerConfig, VEHICLE_ID_PLACEHOLDER};
use processor::ProcessorConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::Level;

/// Config file read when no path is given on the command line
pub const DEFAULT_CONFIG_FILE: &str = "driving-behavior.toml";

/// Environment variable prefix (`DBP_BROKER__HOST`, `DBP_PROCESSOR__STATE_EXPIRY_SECONDS`, ...)
pub const ENV_PREFIX: &str = "DBP";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Maximum level: trace, debug, info, warn, error
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl LoggingConfig {
    pub fn max_level(&self) -> Result<Level, ConfigError> {
        self.level
            .parse::<Level>()
            .map_err(|_| ConfigError::Invalid(format!("unknown log level '{}'", self.level)))
    }
}

/// Complete service configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub broker: BrokerConfig,
    pub processor: ProcessorConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Check values the individual components cannot check themselves
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.broker.port == 0 {
            return Err(ConfigError::Invalid("broker.port must be non-zero".to_string()));
        }
        if self.broker.channel_capacity == 0 {
            return Err(ConfigError::Invalid(
                "broker.channel_capacity must be at least 1".to_string(),
            ));
        }
        if !self.broker.output_topic.contains(VEHICLE_ID_PLACEHOLDER) {
            return Err(ConfigError::Invalid(format!(
                "broker.output_topic must contain {}",
                VEHICLE_ID_PLACEHOLDER
            )));
        }
        self.logging.max_level()?;
        Ok(())
    }
}

/// Load configuration: defaults, then the TOML file, then `DBP_*` environment
/// variables. An explicitly given file must exist; the default one is optional.
pub fn load_config(path: Option<&str>) -> Result<AppConfig, ConfigError> {
    let defaults = config::Config::try_from(&AppConfig::default())?;

    let settings = config::Config::builder()
        .add_source(defaults)
        .add_source(
            config::File::with_name(path.unwrap_or(DEFAULT_CONFIG_FILE)).required(path.is_some()),
        )
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let app: AppConfig = settings.try_deserialize()?;
    app.validate()?;
    Ok(app)
}
