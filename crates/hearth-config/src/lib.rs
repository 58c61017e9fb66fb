//! hearth-config — layered configuration for the hearth daemon.
//!
//! Embedded defaults, merged with an optional system file, an optional user
//! (or explicit `--config`) file, and `HEARTH_*` environment overrides for
//! the common single fields.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod error;
mod loader;
mod types;

pub use error::{ConfigError, ConfigResult};
pub use loader::{load, resolve_data_dir};
pub use types::{HearthConfig, LoggingConfig, PluginsConfig, RpcConfig, ServerConfig};
