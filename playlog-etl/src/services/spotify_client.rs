//! Spotify Web API client
//!
//! Only the one endpoint this job needs: the caller's recently played
//! tracks. A single page, no cursor following, no retry.

use super::{check_limit, FetchError, PlaySource};
use crate::models::RecentlyPlayedPage;
use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;

pub const SPOTIFY_API_BASE_URL: &str = "https://api.spotify.com/v1";
const USER_AGENT: &str = concat!("playlog/", env!("CARGO_PKG_VERSION"));

/// Authenticated Spotify API client
pub struct SpotifyClient {
    http_client: reqwest::Client,
    base_url: String,
    access_token: String,
}

impl SpotifyClient {
    pub fn new(
        base_url: impl Into<String>,
        access_token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
        })
    }

    /// `GET /me/player/recently-played?limit=N`
    pub async fn fetch_recently_played(&self, limit: u32) -> Result<RecentlyPlayedPage, FetchError> {
        let limit = check_limit(limit)?;
        let url = format!("{}/me/player/recently-played", self.base_url);

        tracing::debug!(url = %url, limit, "Querying Spotify API");

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&self.access_token)
            .query(&[("limit", limit)])
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = response.status();

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(FetchError::Unauthorized(status.as_u16()));
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            return Err(FetchError::RateLimited(retry_after));
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(FetchError::Api(status.as_u16(), error_text));
        }

        let page: RecentlyPlayedPage = response
            .json()
            .await
            .map_err(|e| FetchError::Parse(e.to_string()))?;

        tracing::info!(
            items = page.items.len(),
            has_more = page.next.is_some(),
            "Retrieved recently played tracks from Spotify"
        );

        Ok(page)
    }
}

#[async_trait]
impl PlaySource for SpotifyClient {
    fn name(&self) -> &str {
        "Spotify"
    }

    async fn recently_played(&self, limit: u32) -> Result<RecentlyPlayedPage, FetchError> {
        self.fetch_recently_played(limit).await
    }
}
