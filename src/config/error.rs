//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Environment file could not be read: {0}")]
    EnvFile(#[from] dotenvy::Error),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),

    #[error("Tracing subscriber could not be installed: {0}")]
    TracingInit(String),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Poll wait must be between 1 and 300 seconds")]
    InvalidPollWait,

    #[error("Response history size must be at least 1")]
    InvalidHistorySize,

    #[error("Max events per batch must be at least 1")]
    InvalidBatchLimit,

    #[error("Idle timeout must be greater than zero")]
    InvalidIdleTimeout,

    #[error("Invalid log filter directive: {0}")]
    InvalidLogFilter(String),
}
