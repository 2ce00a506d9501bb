//! Configuration management for GitID
//!
//! Settings are resolved in three layers, later layers winning:
//!
//! 1. defaults derived from the home directory
//! 2. an optional TOML file (`<config dir>/gitid/config.toml` unless given)
//! 3. environment variables of the form `GITID_<KEY>`
//!
//! Derived paths follow the home directory: overriding only `home_dir` moves
//! the global config and the identity directory with it.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::logging::{LogConfig, LogLevel};

mod error;

pub use error::ConfigError;

/// Name of the global Git configuration file inside the home directory
pub const GLOBAL_CONFIG_FILE_NAME: &str = ".gitconfig";

pub const ENV_HOME: &str = "GITID_HOME";
pub const ENV_GLOBAL_CONFIG: &str = "GITID_GLOBAL_CONFIG";
pub const ENV_IDENTITY_DIR: &str = "GITID_IDENTITY_DIR";
pub const ENV_LOG_LEVEL: &str = "GITID_LOG_LEVEL";
pub const ENV_LOG_JSON: &str = "GITID_LOG_JSON";

/// Main application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GitIdConfig {
    /// File locations
    pub paths: PathsConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Where the managed files live
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Home directory used to expand `~/` in identity paths
    pub home_dir: PathBuf,

    /// Global Git configuration file holding the managed section
    pub global_config: PathBuf,

    /// Directory holding the per-identity credential files
    pub identity_dir: PathBuf,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Enable JSON formatting
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::default().as_str().to_string(),
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// Builder input for `logging::init_logging_with_config`
    pub fn log_config(&self) -> LogConfig {
        LogConfig::new(LogLevel::from_str(&self.level).unwrap_or_default())
            .json_format(self.json_format)
    }
}

/// Partial settings read from a file or the environment
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigOverrides {
    paths: PathOverrides,
    logging: LoggingOverrides,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct PathOverrides {
    home_dir: Option<PathBuf>,
    global_config: Option<PathBuf>,
    identity_dir: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct LoggingOverrides {
    level: Option<String>,
    json_format: Option<bool>,
}

impl ConfigOverrides {
    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&contents).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    fn merge_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(home) = lookup(ENV_HOME) {
            self.paths.home_dir = Some(PathBuf::from(home));
        }
        if let Some(global) = lookup(ENV_GLOBAL_CONFIG) {
            self.paths.global_config = Some(PathBuf::from(global));
        }
        if let Some(dir) = lookup(ENV_IDENTITY_DIR) {
            self.paths.identity_dir = Some(PathBuf::from(dir));
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            self.logging.level = Some(level);
        }
        if let Some(json) = lookup(ENV_LOG_JSON) {
            let parsed = json.parse().map_err(|e| ConfigError::InvalidValue {
                key: ENV_LOG_JSON.to_string(),
                message: format!("{}", e),
            })?;
            self.logging.json_format = Some(parsed);
        }
        Ok(())
    }

    fn resolve<H>(self, detect_home: H) -> Result<GitIdConfig, ConfigError>
    where
        H: FnOnce() -> Option<PathBuf>,
    {
        let home = match self.paths.home_dir {
            Some(home) => home,
            None => detect_home().ok_or(ConfigError::HomeDirUnavailable)?,
        };

        let mut config = GitIdConfig::for_home(home);
        if let Some(global) = self.paths.global_config {
            config.paths.global_config = global;
        }
        if let Some(dir) = self.paths.identity_dir {
            config.paths.identity_dir = dir;
        }
        if let Some(level) = self.logging.level {
            config.logging.level = level;
        }
        if let Some(json) = self.logging.json_format {
            config.logging.json_format = json;
        }
        Ok(config)
    }
}

impl GitIdConfig {
    /// Defaults for a given home directory
    pub fn for_home(home: impl Into<PathBuf>) -> Self {
        let home_dir = home.into();
        Self {
            paths: PathsConfig {
                global_config: home_dir.join(GLOBAL_CONFIG_FILE_NAME),
                identity_dir: home_dir.clone(),
                home_dir,
            },
            logging: LoggingConfig::default(),
        }
    }

    /// Default location of the optional settings file
    pub fn default_config_file() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("gitid").join("config.toml"))
    }

    /// Resolve configuration from the process environment
    ///
    /// `file` names an explicit settings file, which must exist. Without it
    /// the default settings file is used when present.
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match file {
            Some(path) => Some(path.to_path_buf()),
            None => Self::default_config_file().filter(|path| path.is_file()),
        };
        Self::load_with(file.as_deref(), |key| env::var(key).ok(), dirs::home_dir)
    }

    /// Resolve configuration with injectable environment and home lookups
    pub fn load_with<F, H>(file: Option<&Path>, lookup: F, detect_home: H) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
        H: FnOnce() -> Option<PathBuf>,
    {
        let mut overrides = match file {
            Some(path) => ConfigOverrides::from_file(path)?,
            None => ConfigOverrides::default(),
        };
        overrides.merge_env(lookup)?;

        let config = overrides.resolve(detect_home)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a complete configuration from a TOML file, without env overrides
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::load_with(Some(path.as_ref()), |_| None, || None)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let paths = [
            ("home_dir", &self.paths.home_dir),
            ("global_config", &self.paths.global_config),
            ("identity_dir", &self.paths.identity_dir),
        ];
        for (key, path) in paths {
            if !path.is_absolute() {
                return Err(ConfigError::ValidationFailed(format!(
                    "{} must be an absolute path, got {}",
                    key,
                    path.display()
                )));
            }
        }

        if LogLevel::from_str(&self.logging.level).is_none() {
            return Err(ConfigError::ValidationFailed(format!(
                "Invalid log level: {}",
                self.logging.level
            )));
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let contents =
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::FileWrite {
                path: path.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(path, contents).map_err(|source| ConfigError::FileWrite {
            path: path.to_path_buf(),
            source,
        })
    }
}
