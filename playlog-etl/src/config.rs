//! Settings resolution for the ETL binary
//!
//! Each setting walks command line → environment → config.toml → compiled
//! default. Credentials have no default: they stay `None` until a command
//! that needs them asks for [`Settings::oauth_credentials`].

use crate::services::auth::{AuthError, OAuthCredentials, SPOTIFY_ACCOUNTS_BASE_URL};
use crate::services::spotify_client::SPOTIFY_API_BASE_URL;
use playlog_common::config::{resolve_setting, CompiledDefaults, TomlConfig};
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

pub const CLIENT_ID_ENV: &str = "SPOTIFY_CLIENT_ID";
pub const CLIENT_SECRET_ENV: &str = "SPOTIFY_CLIENT_SECRET";
pub const REDIRECT_URI_ENV: &str = "SPOTIFY_REDIRECT_URI";
pub const DATABASE_ENV: &str = "PLAYLOG_DATABASE";
pub const TOKEN_CACHE_ENV: &str = "PLAYLOG_TOKEN_CACHE";

/// Values given on the command line
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub redirect_uri: Option<String>,
    pub database: Option<PathBuf>,
}

/// Fully resolved settings for one run
#[derive(Debug, Clone)]
pub struct Settings {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub redirect_uri: Option<String>,
    pub database: PathBuf,
    pub token_cache: PathBuf,
    pub api_base_url: String,
    pub accounts_base_url: String,
    pub request_timeout: Duration,
}

impl Settings {
    pub fn resolve(cli: &CliOverrides, toml: &TomlConfig) -> Self {
        let defaults = CompiledDefaults::for_current_platform();

        let client_id = credential(
            "client id",
            cli.client_id.as_deref(),
            CLIENT_ID_ENV,
            toml.client_id.as_deref(),
        );
        let client_secret = credential(
            "client secret",
            cli.client_secret.as_deref(),
            CLIENT_SECRET_ENV,
            toml.client_secret.as_deref(),
        );
        let redirect_uri = credential(
            "redirect uri",
            cli.redirect_uri.as_deref(),
            REDIRECT_URI_ENV,
            toml.redirect_uri.as_deref(),
        );

        let database = path_setting(
            "database",
            cli.database.as_ref(),
            DATABASE_ENV,
            toml.database.as_ref(),
        )
        .unwrap_or(defaults.database_path);

        let token_cache = path_setting("token cache", None, TOKEN_CACHE_ENV, toml.token_cache.as_ref())
            .unwrap_or(defaults.token_cache_path);

        let timeout_secs = toml
            .request_timeout_secs
            .filter(|secs| *secs > 0)
            .unwrap_or(defaults.request_timeout_secs);

        Self {
            client_id,
            client_secret,
            redirect_uri,
            database,
            token_cache,
            api_base_url: toml
                .api_base_url
                .clone()
                .unwrap_or_else(|| SPOTIFY_API_BASE_URL.to_string()),
            accounts_base_url: toml
                .accounts_base_url
                .clone()
                .unwrap_or_else(|| SPOTIFY_ACCOUNTS_BASE_URL.to_string()),
            request_timeout: Duration::from_secs(timeout_secs),
        }
    }

    /// All three OAuth values, or the first one missing
    pub fn oauth_credentials(&self) -> Result<OAuthCredentials, AuthError> {
        Ok(OAuthCredentials {
            client_id: self
                .client_id
                .clone()
                .ok_or(AuthError::MissingCredential("client id"))?,
            client_secret: self
                .client_secret
                .clone()
                .ok_or(AuthError::MissingCredential("client secret"))?,
            redirect_uri: self
                .redirect_uri
                .clone()
                .ok_or(AuthError::MissingCredential("redirect uri"))?,
        })
    }
}

fn credential(
    label: &str,
    cli_value: Option<&str>,
    env_var: &str,
    toml_value: Option<&str>,
) -> Option<String> {
    resolve_setting(cli_value, env_var, toml_value).map(|(value, source)| {
        // Values are secrets; log only where they came from
        debug!("{} loaded from {}", label, source);
        value
    })
}

fn path_setting(
    label: &str,
    cli_value: Option<&PathBuf>,
    env_var: &str,
    toml_value: Option<&PathBuf>,
) -> Option<PathBuf> {
    let cli_value = cli_value.map(|p| p.to_string_lossy().into_owned());
    let toml_value = toml_value.map(|p| p.to_string_lossy().into_owned());

    resolve_setting(cli_value.as_deref(), env_var, toml_value.as_deref()).map(|(value, source)| {
        debug!("{} path {} (from {})", label, value, source);
        PathBuf::from(value)
    })
}
