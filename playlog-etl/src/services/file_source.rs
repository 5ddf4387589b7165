//! Replay a saved recently-played response from disk

use super::{check_limit, FetchError, PlaySource};
use crate::models::RecentlyPlayedPage;
use async_trait::async_trait;
use std::path::PathBuf;

/// Reads a JSON page in the same shape the API returns
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl PlaySource for FileSource {
    fn name(&self) -> &str {
        "file"
    }

    async fn recently_played(&self, limit: u32) -> Result<RecentlyPlayedPage, FetchError> {
        let limit = check_limit(limit)?;

        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| FetchError::Io {
                path: self.path.clone(),
                source,
            })?;

        let mut page: RecentlyPlayedPage =
            serde_json::from_str(&content).map_err(|e| FetchError::Parse(e.to_string()))?;

        page.items.truncate(limit as usize);

        tracing::info!(
            path = %self.path.display(),
            items = page.items.len(),
            "Loaded recently played tracks from file"
        );

        Ok(page)
    }
}
