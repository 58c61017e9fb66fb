//! Config discovery and layered loading.
//!
//! Precedence, lowest first:
//!
//! 1. embedded `defaults.toml`
//! 2. `/etc/hearth/hearthd.conf` (system)
//! 3. `~/.config/hearth/hearthd.conf` (user), or an explicit `--config`
//! 4. `HEARTH_*` environment variables for single fields

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{ConfigError, ConfigResult};
use crate::types::HearthConfig;

/// Embedded default configuration.
const DEFAULTS_TOML: &str = include_str!("defaults.toml");

const SYSTEM_PATH: &str = "/etc/hearth/hearthd.conf";

/// Load the merged configuration.
///
/// `explicit_path` (from `--config`) replaces the user layer; system and
/// default layers always apply. A named but missing explicit file is an
/// error, while missing system/user files are simply skipped.
///
/// # Errors
///
/// Malformed TOML anywhere, or a missing explicit config file.
pub fn load(explicit_path: Option<&Path>) -> ConfigResult<HearthConfig> {
    let mut merged: toml::Value = toml::from_str(DEFAULTS_TOML).map_err(|e| {
        ConfigError::Parse {
            path: "<embedded defaults>".to_string(),
            source: e,
        }
    })?;

    if let Some(overlay) = try_load_file(Path::new(SYSTEM_PATH))? {
        deep_merge(&mut merged, overlay);
        info!(path = SYSTEM_PATH, "loaded system config");
    }

    match explicit_path {
        Some(path) => {
            let overlay = try_load_file(path)?
                .ok_or_else(|| ConfigError::NotFound(path.display().to_string()))?;
            deep_merge(&mut merged, overlay);
            info!(path = %path.display(), "loaded config");
        },
        None => {
            if let Some(path) = user_config_path()
                && let Some(overlay) = try_load_file(&path)?
            {
                deep_merge(&mut merged, overlay);
                info!(path = %path.display(), "loaded user config");
            }
        },
    }

    let mut config: HearthConfig = merged
        .try_into()
        .map_err(|e| ConfigError::Invalid(e.to_string()))?;
    apply_env_overrides(&mut config);
    validate(&config)?;
    Ok(config)
}

/// The data directory to use: configured, or the platform default.
#[must_use]
pub fn resolve_data_dir(config: &HearthConfig) -> PathBuf {
    if let Some(dir) = &config.server.data_dir {
        return dir.clone();
    }
    directories::ProjectDirs::from("io", "hearth", "hearthd")
        .map_or_else(|| PathBuf::from("./hearth-data"), |dirs| dirs.data_dir().to_path_buf())
}

fn user_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("io", "hearth", "hearthd")
        .map(|dirs| dirs.config_dir().join("hearthd.conf"))
}

fn try_load_file(path: &Path) -> ConfigResult<Option<toml::Value>> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(ConfigError::Io(e)),
    };
    let value = toml::from_str(&text).map_err(|e| ConfigError::Parse {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(Some(value))
}

fn deep_merge(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, value) in overlay_table {
                match base_table.get_mut(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        base_table.insert(key, value);
                    },
                }
            }
        },
        (base_slot, overlay_value) => *base_slot = overlay_value,
    }
}

fn apply_env_overrides(config: &mut HearthConfig) {
    if let Ok(name) = std::env::var("HEARTH_NAME") {
        debug!("HEARTH_NAME overrides server.name");
        config.server.name = name;
    }
    if let Ok(dir) = std::env::var("HEARTH_DATA_DIR") {
        debug!("HEARTH_DATA_DIR overrides server.data_dir");
        config.server.data_dir = Some(PathBuf::from(dir));
    }
    if let Ok(filter) = std::env::var("HEARTH_LOG") {
        debug!("HEARTH_LOG overrides logging.filter");
        config.logging.filter = filter;
    }
    if let Ok(listen) = std::env::var("HEARTH_RPC_LISTEN") {
        debug!("HEARTH_RPC_LISTEN overrides rpc.listen");
        config.rpc.listen = listen;
    }
}

fn validate(config: &HearthConfig) -> ConfigResult<()> {
    if config.server.name.is_empty() {
        return Err(ConfigError::Invalid("server.name must not be empty".into()));
    }
    if config.plugins.setup_timeout_secs == 0 || config.plugins.action_timeout_secs == 0 {
        return Err(ConfigError::Invalid(
            "plugin timeouts must be positive".into(),
        ));
    }
    if config.rpc.enabled && config.rpc.listen.parse::<std::net::SocketAddr>().is_err() {
        return Err(ConfigError::Invalid(format!(
            "rpc.listen is not a socket address: {}",
            config.rpc.listen
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_parse_and_validate() {
        let config = load(None).unwrap();
        assert_eq!(config.server.name, "hearth");
        assert_eq!(config.plugins.setup_timeout_secs, 30);
        assert_eq!(config.plugins.action_timeout_secs, 45);
        assert!(config.rpc.enabled);
    }

    #[test]
    fn test_explicit_file_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[server]\nname = \"cabin\"\n\n[logging]\nfilter = \"debug\""
        )
        .unwrap();

        let config = load(Some(file.path())).unwrap();
        assert_eq!(config.server.name, "cabin");
        assert_eq!(config.logging.filter, "debug");
        // Untouched layers keep their defaults.
        assert_eq!(config.plugins.action_timeout_secs, 45);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let err = load(Some(Path::new("/nonexistent/hearthd.conf"))).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "server = [not toml").unwrap();
        assert!(matches!(
            load(Some(file.path())).unwrap_err(),
            ConfigError::Parse { .. }
        ));
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nnmae = \"typo\"").unwrap();
        assert!(matches!(
            load(Some(file.path())).unwrap_err(),
            ConfigError::Invalid(_)
        ));
    }

    #[test]
    fn test_bad_listen_address_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[rpc]\nlisten = \"not-an-addr\"").unwrap();
        assert!(matches!(
            load(Some(file.path())).unwrap_err(),
            ConfigError::Invalid(_)
        ));
    }
}
