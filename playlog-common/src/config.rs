//! Configuration loading and default path resolution
//!
//! Settings resolve in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! This module owns tiers 3 and 4 plus the generic tier walk; the
//! command-line layer lives with each binary.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Directory name used under the platform config/data directories
pub const APP_DIR_NAME: &str = "playlog";

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "PLAYLOG_CONFIG";

/// File name of the SQLite store
pub const DATABASE_FILE_NAME: &str = "my_recently_played_tracks.sqlite";

/// File name of the OAuth token cache
pub const TOKEN_CACHE_FILE_NAME: &str = "token_cache.json";

/// Contents of `config.toml`
///
/// Every field is optional; a missing key falls through to the compiled
/// default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub redirect_uri: Option<String>,
    pub database: Option<PathBuf>,
    pub token_cache: Option<PathBuf>,
    pub api_base_url: Option<String>,
    pub accounts_base_url: Option<String>,
    pub request_timeout_secs: Option<u64>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// `[logging]` table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default tracing filter directive (e.g. "info", "playlog_etl=debug")
    pub level: Option<String>,
}

/// OS-dependent compiled defaults
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledDefaults {
    pub database_path: PathBuf,
    pub token_cache_path: PathBuf,
    pub log_level: String,
    pub request_timeout_secs: u64,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        let data_dir = default_data_dir();
        Self {
            database_path: data_dir.join(DATABASE_FILE_NAME),
            token_cache_path: data_dir.join(TOKEN_CACHE_FILE_NAME),
            log_level: "info".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Where a config file was (or was not) found
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    /// Loaded from this file
    File(PathBuf),
    /// A path was resolved but no file exists there
    Missing(PathBuf),
    /// No config directory could be determined for this platform
    NoPath,
}

/// Result of [`load_or_default`]
///
/// Returned instead of logging directly because the config is loaded before
/// the tracing subscriber exists (it may carry the log level).
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: TomlConfig,
    pub source: ConfigSource,
}

/// Platform data directory for the store and token cache
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join(APP_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from(".").join(APP_DIR_NAME))
}

/// Default config file location (`<config_dir>/playlog/config.toml`)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR_NAME).join("config.toml"))
}

/// Pick the config file path: explicit argument, then `PLAYLOG_CONFIG`, then
/// the platform default
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    default_config_path()
}

/// Read and parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)?;
    toml::from_str(&content).map_err(|e| Error::ConfigParse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Load the config file if present
///
/// A missing file is not an error: defaults apply. A file that exists but
/// does not parse is.
pub fn load_or_default(path: Option<PathBuf>) -> Result<LoadedConfig> {
    let Some(path) = path else {
        return Ok(LoadedConfig {
            config: TomlConfig::default(),
            source: ConfigSource::NoPath,
        });
    };

    if !path.exists() {
        return Ok(LoadedConfig {
            config: TomlConfig::default(),
            source: ConfigSource::Missing(path),
        });
    }

    let config = load_toml_config(&path)?;
    Ok(LoadedConfig {
        config,
        source: ConfigSource::File(path),
    })
}

/// Non-empty, non-whitespace
pub fn is_valid_value(value: &str) -> bool {
    !value.trim().is_empty()
}

/// Which tier supplied a setting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingSource {
    CommandLine,
    Environment,
    ConfigFile,
}

impl std::fmt::Display for SettingSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettingSource::CommandLine => write!(f, "command line"),
            SettingSource::Environment => write!(f, "environment"),
            SettingSource::ConfigFile => write!(f, "config file"),
        }
    }
}

/// Walk command line → environment → config file, skipping blank values
///
/// Returns `None` when no tier has a usable value; the caller applies the
/// compiled default.
pub fn resolve_setting(
    cli_value: Option<&str>,
    env_var: &str,
    toml_value: Option<&str>,
) -> Option<(String, SettingSource)> {
    if let Some(value) = cli_value.filter(|v| is_valid_value(v)) {
        return Some((value.to_string(), SettingSource::CommandLine));
    }

    if let Ok(value) = std::env::var(env_var) {
        if is_valid_value(&value) {
            return Some((value, SettingSource::Environment));
        }
    }

    toml_value
        .filter(|v| is_valid_value(v))
        .map(|v| (v.to_string(), SettingSource::ConfigFile))
}
