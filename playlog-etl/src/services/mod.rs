//! External collaborators: the play-history source and OAuth
//!
//! The pipeline only sees [`PlaySource`]; which implementation backs it is
//! decided once in `main`.

pub mod auth;
pub mod file_source;
pub mod spotify_client;

pub use auth::{AuthError, Authenticator, CachedToken, OAuthCredentials};
pub use file_source::FileSource;
pub use spotify_client::SpotifyClient;

use crate::models::RecentlyPlayedPage;
use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;

/// Most plays the recently-played endpoint returns in one page
pub const MAX_RECENTLY_PLAYED_LIMIT: u32 = 50;

/// Fetch errors
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Access token rejected (HTTP {0}); run `playlog authorize`")]
    Unauthorized(u16),

    #[error("Rate limited by Spotify (retry after {0:?} s)")]
    RateLimited(Option<u64>),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid limit {0}: must be between 1 and {MAX_RECENTLY_PLAYED_LIMIT}")]
    InvalidLimit(u32),

    #[error("Could not read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Source of recently-played pages
#[async_trait]
pub trait PlaySource: Send + Sync {
    /// Short label for log lines
    fn name(&self) -> &str;

    /// Fetch up to `limit` of the most recent plays, most recent first
    async fn recently_played(&self, limit: u32) -> Result<RecentlyPlayedPage, FetchError>;
}

/// Reject limits the endpoint would refuse
pub fn check_limit(limit: u32) -> Result<u32, FetchError> {
    if (1..=MAX_RECENTLY_PLAYED_LIMIT).contains(&limit) {
        Ok(limit)
    } else {
        Err(FetchError::InvalidLimit(limit))
    }
}
