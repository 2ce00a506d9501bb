//! Logging subsystem for GitID
//!
//! Diagnostics go through the `tracing` crate and are written to stderr, so
//! command output on stdout stays machine-readable. The `GITID_LOG`
//! environment variable takes precedence over the configured level and
//! accepts any `EnvFilter` directive (for example `gitid_core=debug`).

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

mod error;
mod level;

pub use error::LoggingError;
pub use level::LogLevel;

/// Environment variable holding a filter directive override
pub const LOG_ENV_VAR: &str = "GITID_LOG";

/// How diagnostics are filtered and rendered on stderr
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: LogLevel,
    /// Prefix each line with a timestamp; off for interactive use
    pub with_timestamp: bool,
    /// Show the emitting module, e.g. `gitid_core::editor::file_editor`
    pub with_target: bool,
    /// One JSON object per event instead of human-readable lines
    pub json_format: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Warn,
            with_timestamp: false,
            with_target: false,
            json_format: false,
        }
    }
}

impl LogConfig {
    /// Defaults with a different threshold
    pub fn new(level: LogLevel) -> Self {
        Self {
            level,
            ..Default::default()
        }
    }

    /// Toggle timestamps
    pub fn with_timestamp(mut self, enabled: bool) -> Self {
        self.with_timestamp = enabled;
        self
    }

    /// Toggle module targets
    pub fn with_target(mut self, enabled: bool) -> Self {
        self.with_target = enabled;
        self
    }

    /// Toggle JSON output
    pub fn json_format(mut self, enabled: bool) -> Self {
        self.json_format = enabled;
        self
    }

    fn env_filter(&self) -> Result<EnvFilter, LoggingError> {
        match EnvFilter::try_from_env(LOG_ENV_VAR) {
            Ok(filter) => Ok(filter),
            Err(_) => EnvFilter::try_new(self.level.as_str())
                .map_err(|e| LoggingError::InvalidConfiguration(e.to_string())),
        }
    }
}

/// Initialize logging with the CLI defaults (warnings and errors only)
pub fn init_logging() -> Result<(), LoggingError> {
    init_logging_with_config(LogConfig::default())
}

/// Initialize logging with a custom configuration
///
/// Fails if a global subscriber has already been installed.
///
/// # Example
/// ```
/// use gitid_core::logging::{init_logging_with_config, LogConfig, LogLevel};
///
/// let config = LogConfig::new(LogLevel::Debug).with_target(true);
/// init_logging_with_config(config).expect("Failed to initialize logging");
/// ```
pub fn init_logging_with_config(config: LogConfig) -> Result<(), LoggingError> {
    let env_filter = config.env_filter()?;

    let fmt_layer = match (config.json_format, config.with_timestamp) {
        (true, true) => fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(config.with_target)
            .boxed(),
        (true, false) => fmt::layer()
            .json()
            .without_time()
            .with_writer(std::io::stderr)
            .with_target(config.with_target)
            .boxed(),
        (false, true) => fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(config.with_target)
            .boxed(),
        (false, false) => fmt::layer()
            .without_time()
            .with_writer(std::io::stderr)
            .with_target(config.with_target)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter)
        .try_init()
        .map_err(|e| LoggingError::InitializationFailed(e.to_string()))
}
