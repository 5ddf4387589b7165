//! Spotify OAuth (authorization code flow) and token cache
//!
//! `playlog authorize` runs the interactive half once: print the authorize
//! URL, take back the redirect, exchange the code. Every later run only
//! loads the cached token and refreshes it when it is about to expire.

use chrono::{DateTime, Duration, Utc};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

pub const SPOTIFY_ACCOUNTS_BASE_URL: &str = "https://accounts.spotify.com";

/// Permissions requested from the user
pub const SCOPE: &str = "user-library-read user-read-recently-played";

/// Refresh this long before the token actually expires
const EXPIRY_SKEW_SECS: i64 = 60;

/// OAuth errors
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing {0}; set it on the command line, in the environment or in config.toml")]
    MissingCredential(&'static str),

    #[error("No cached token at {0}; run `playlog authorize` first")]
    NotAuthorized(PathBuf),

    #[error("Authorization was denied: {0}")]
    Denied(String),

    #[error("Could not find an authorization code in {0:?}")]
    InvalidRedirect(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Token endpoint returned {0}: {1}")]
    TokenEndpoint(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Token cache {path}: {source}")]
    Cache {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Application credentials registered with Spotify
#[derive(Debug, Clone, PartialEq)]
pub struct OAuthCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

/// Token as persisted in the cache file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedToken {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub scope: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl CachedToken {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(EXPIRY_SKEW_SECS) >= self.expires_at
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
    refresh_token: Option<String>,
    scope: Option<String>,
}

impl TokenResponse {
    fn into_cached(self, now: DateTime<Utc>, previous_refresh: Option<String>) -> CachedToken {
        CachedToken {
            access_token: self.access_token,
            // Refresh responses may omit the refresh token; keep the old one
            refresh_token: self.refresh_token.or(previous_refresh),
            scope: self.scope,
            expires_at: now + Duration::seconds(self.expires_in),
        }
    }
}

/// Runs the OAuth exchanges and owns the token cache file
pub struct Authenticator {
    http_client: reqwest::Client,
    accounts_base_url: String,
    credentials: OAuthCredentials,
    cache_path: PathBuf,
}

impl Authenticator {
    pub fn new(
        accounts_base_url: impl Into<String>,
        credentials: OAuthCredentials,
        cache_path: impl Into<PathBuf>,
        timeout: std::time::Duration,
    ) -> Result<Self, AuthError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AuthError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            accounts_base_url: accounts_base_url.into().trim_end_matches('/').to_string(),
            credentials,
            cache_path: cache_path.into(),
        })
    }

    pub fn cache_path(&self) -> &Path {
        &self.cache_path
    }

    /// URL the user opens in a browser to grant access
    pub fn authorize_url(&self) -> Result<Url, AuthError> {
        let mut url = Url::parse(&format!("{}/authorize", self.accounts_base_url))
            .map_err(|e| AuthError::Parse(e.to_string()))?;

        url.query_pairs_mut()
            .append_pair("client_id", &self.credentials.client_id)
            .append_pair("response_type", "code")
            .append_pair("redirect_uri", &self.credentials.redirect_uri)
            .append_pair("scope", SCOPE);

        Ok(url)
    }

    /// Pull the `code` out of a pasted redirect URL, or accept a bare code
    pub fn extract_code(input: &str) -> Result<String, AuthError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(AuthError::InvalidRedirect(input.to_string()));
        }

        let Ok(url) = Url::parse(input) else {
            if input.contains(char::is_whitespace) {
                return Err(AuthError::InvalidRedirect(input.to_string()));
            }
            return Ok(input.to_string());
        };

        let mut code = None;
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "error" => return Err(AuthError::Denied(value.into_owned())),
                "code" => code = Some(value.into_owned()),
                _ => {}
            }
        }

        code.filter(|c| !c.is_empty())
            .ok_or_else(|| AuthError::InvalidRedirect(input.to_string()))
    }

    async fn request_token(&self, form: &[(&str, &str)]) -> Result<TokenResponse, AuthError> {
        let url = format!("{}/api/token", self.accounts_base_url);
        debug!(url = %url, grant_type = form[0].1, "Requesting token");

        let response = self
            .http_client
            .post(&url)
            .basic_auth(
                &self.credentials.client_id,
                Some(&self.credentials.client_secret),
            )
            .form(form)
            .send()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AuthError::TokenEndpoint(status.as_u16(), error_text));
        }

        response
            .json()
            .await
            .map_err(|e| AuthError::Parse(e.to_string()))
    }

    /// Trade an authorization code for tokens and cache them
    pub async fn exchange_code(&self, code: &str) -> Result<CachedToken, AuthError> {
        let response = self
            .request_token(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", self.credentials.redirect_uri.as_str()),
            ])
            .await?;

        let token = response.into_cached(Utc::now(), None);
        self.save_cache(&token)?;
        info!(cache = %self.cache_path.display(), "Authorization complete, token cached");
        Ok(token)
    }

    /// Refresh an expired token and rewrite the cache
    pub async fn refresh(&self, token: &CachedToken) -> Result<CachedToken, AuthError> {
        let refresh_token = token
            .refresh_token
            .as_deref()
            .ok_or_else(|| AuthError::NotAuthorized(self.cache_path.clone()))?;

        let response = self
            .request_token(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ])
            .await?;

        let refreshed = response.into_cached(Utc::now(), token.refresh_token.clone());
        self.save_cache(&refreshed)?;
        info!("Access token refreshed");
        Ok(refreshed)
    }

    /// A currently valid access token, refreshing if needed
    pub async fn access_token(&self) -> Result<String, AuthError> {
        let token = self
            .load_cache()?
            .ok_or_else(|| AuthError::NotAuthorized(self.cache_path.clone()))?;

        if token.is_expired(Utc::now()) {
            debug!(expires_at = %token.expires_at, "Cached token expired");
            return Ok(self.refresh(&token).await?.access_token);
        }

        Ok(token.access_token)
    }

    pub fn load_cache(&self) -> Result<Option<CachedToken>, AuthError> {
        let content = match std::fs::read_to_string(&self.cache_path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(AuthError::Cache {
                    path: self.cache_path.clone(),
                    source,
                })
            }
        };

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| AuthError::Parse(format!("{}: {}", self.cache_path.display(), e)))
    }

    pub fn save_cache(&self, token: &CachedToken) -> Result<(), AuthError> {
        let cache_err = |source: std::io::Error| AuthError::Cache {
            path: self.cache_path.clone(),
            source,
        };

        if let Some(parent) = self.cache_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(cache_err)?;
            }
        }

        let content =
            serde_json::to_string_pretty(token).map_err(|e| AuthError::Parse(e.to_string()))?;
        std::fs::write(&self.cache_path, content).map_err(cache_err)
    }
}
