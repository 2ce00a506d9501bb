//! Error types for the logging subsystem

use thiserror::Error;

/// Errors raised while installing the global subscriber
#[derive(Debug, Clone, Error)]
pub enum LoggingError {
    /// A global subscriber is already installed, or installation failed
    #[error("Failed to initialize logging: {0}")]
    InitializationFailed(String),

    /// The filter directive could not be parsed
    #[error("Invalid logging configuration: {0}")]
    InvalidConfiguration(String),
}
