//! Configuration error types.

use thiserror::Error;

/// Errors from loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A named config file does not exist.
    #[error("config file not found: {0}")]
    NotFound(String),

    /// A config file failed to read.
    #[error("config i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// A config file is not valid TOML.
    #[error("failed to parse {path}: {source}")]
    Parse {
        /// The offending file.
        path: String,
        /// The TOML parser's diagnosis.
        source: toml::de::Error,
    },

    /// The merged configuration is semantically invalid.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;
