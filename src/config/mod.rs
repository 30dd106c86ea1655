//! Application configuration module
//!
//! Configuration is loaded from environment variables with the `MIRROR_SYNC`
//! prefix using the `config` and `dotenvy` crates. Nested values use double
//! underscores as separators. Every value has a default, so an empty
//! environment yields a valid configuration.
//!
//! # Example
//!
//! ```no_run
//! use mirror_sync::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! config.logging.init_tracing().expect("Failed to install tracing");
//! ```

mod error;
mod logging;
mod session;

pub use error::{ConfigError, ValidationError};
pub use logging::{LogFormat, LoggingConfig};
pub use session::SessionConfig;

use serde::Deserialize;
use std::path::Path;

const ENV_PREFIX: &str = "MIRROR_SYNC";

/// Root application configuration
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    /// Session limits and timeouts
    #[serde(default)]
    pub session: SessionConfig,

    /// Tracing subscriber settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// Loads a `.env` file if present, then reads `MIRROR_SYNC__*` variables.
    ///
    /// # Environment Variable Format
    ///
    /// - `MIRROR_SYNC__SESSION__POLL_WAIT_SECS=30` -> `session.poll_wait_secs = 30`
    /// - `MIRROR_SYNC__LOGGING__FORMAT=json` -> `logging.format = Json`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if values cannot be parsed into expected types.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_environment()
    }

    /// Like [`AppConfig::load`], but reads the given env file instead of `.env`
    ///
    /// Variables already present in the process environment take precedence.
    pub fn load_from_env_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        dotenvy::from_path(path.as_ref())?;
        Self::from_environment()
    }

    fn from_environment() -> Result<Self, ConfigError> {
        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix(ENV_PREFIX)
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.session.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}
