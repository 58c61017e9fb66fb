//! Configuration shapes.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// The daemon's full configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HearthConfig {
    /// Server identity and storage.
    #[serde(default)]
    pub server: ServerConfig,
    /// Logging setup.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Plugin host tuning.
    #[serde(default)]
    pub plugins: PluginsConfig,
    /// JSON-RPC boundary.
    #[serde(default)]
    pub rpc: RpcConfig,
}

/// Server identity and storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Instance name, shown to clients.
    #[serde(default = "default_name")]
    pub name: String,
    /// Where thing and rule records persist. Defaults to the platform data
    /// directory.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            data_dir: None,
        }
    }
}

fn default_name() -> String {
    "hearth".to_string()
}

/// Logging setup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// An `EnvFilter` directive string, e.g. `info,rule_engine=debug`.
    #[serde(default = "default_filter")]
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
        }
    }
}

fn default_filter() -> String {
    "info".to_string()
}

/// Plugin host tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PluginsConfig {
    /// Extra directories scanned for plugin metadata.
    #[serde(default)]
    pub dirs: Vec<PathBuf>,
    /// Watchdog deadline for setup, pairing, and discovery.
    #[serde(default = "default_setup_timeout")]
    pub setup_timeout_secs: u64,
    /// Watchdog deadline for actions.
    #[serde(default = "default_action_timeout")]
    pub action_timeout_secs: u64,
}

impl Default for PluginsConfig {
    fn default() -> Self {
        Self {
            dirs: Vec::new(),
            setup_timeout_secs: default_setup_timeout(),
            action_timeout_secs: default_action_timeout(),
        }
    }
}

fn default_setup_timeout() -> u64 {
    30
}

fn default_action_timeout() -> u64 {
    45
}

/// JSON-RPC boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RpcConfig {
    /// Whether the boundary is served at all.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Listen address.
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            listen: default_listen(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_listen() -> String {
    "127.0.0.1:4444".to_string()
}
