//! Shared fixtures for playlog-etl integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use playlog_etl::models::{PlayRecord, RecentlyPlayedPage};
use playlog_etl::services::{FetchError, PlaySource};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

/// One recently-played item as the API returns it
pub fn play_item(track_id: &str, played_at: &str, artists: &[&str]) -> Value {
    json!({
        "track": {
            "id": track_id,
            "name": format!("Song {}", track_id),
            "duration_ms": 200000,
            "album": {"name": "Album", "release_date": "2020-01-01"},
            "artists": artists.iter().map(|name| json!({"name": name})).collect::<Vec<_>>()
        },
        "played_at": played_at,
        "context": null
    })
}

pub fn page(items: Vec<Value>) -> RecentlyPlayedPage {
    RecentlyPlayedPage {
        limit: Some(50),
        items,
        ..Default::default()
    }
}

pub fn record(track_id: &str, played_at: &str) -> PlayRecord {
    PlayRecord {
        track_id: track_id.to_string(),
        track_album_release_date: "2020-01-01".to_string(),
        played_at: played_at.to_string(),
        context: None,
        track_duration_ms: 200000,
        track_artists: "Artist A".to_string(),
        track_name: format!("Song {}", track_id),
        track_album_name: "Album".to_string(),
    }
}

/// In-memory source returning a fixed page and remembering the requested limit
pub struct StaticSource {
    page: RecentlyPlayedPage,
    requested_limit: Arc<Mutex<Option<u32>>>,
}

impl StaticSource {
    pub fn new(page: RecentlyPlayedPage) -> Self {
        Self {
            page,
            requested_limit: Arc::new(Mutex::new(None)),
        }
    }

    /// Handle that still reads the limit after the source is boxed
    pub fn limit_handle(&self) -> Arc<Mutex<Option<u32>>> {
        Arc::clone(&self.requested_limit)
    }
}

#[async_trait]
impl PlaySource for StaticSource {
    fn name(&self) -> &str {
        "static"
    }

    async fn recently_played(&self, limit: u32) -> Result<RecentlyPlayedPage, FetchError> {
        *self.requested_limit.lock().unwrap() = Some(limit);
        Ok(self.page.clone())
    }
}

/// Source that always fails the way an unreachable API does
pub struct FailingSource;

#[async_trait]
impl PlaySource for FailingSource {
    fn name(&self) -> &str {
        "failing"
    }

    async fn recently_played(&self, _limit: u32) -> Result<RecentlyPlayedPage, FetchError> {
        Err(FetchError::Network("connection refused".to_string()))
    }
}

/// Serve `router` on an ephemeral local port; returns `http://127.0.0.1:<port>`
pub async fn spawn_server(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    format!("http://{}", addr)
}
