//! Data model for the recently-played pipeline
//!
//! Three shapes, one per stage boundary:
//! - [`RecentlyPlayedPage`] / [`PlayEvent`]: the nested API response
//! - [`FlatPlay`]: one normalized row, columns named by dotted path
//! - [`PlayRecord`]: the renamed eight-column projection that gets persisted

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One page of `GET /me/player/recently-played`
///
/// `items` stay as raw JSON until normalization so shape errors can name the
/// offending event. The pagination fields are carried but never followed.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RecentlyPlayedPage {
    pub items: Vec<Value>,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub cursors: Option<Cursors>,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub href: Option<String>,
}

/// Cursor pair returned with each page
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Cursors {
    pub after: Option<String>,
    pub before: Option<String>,
}

/// A single play as reported by the API
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlayEvent {
    pub track: Track,
    /// ISO-8601 timestamp; the natural key once persisted
    pub played_at: String,
    /// Playlist/album/artist the track was played from; null when unknown
    #[serde(default)]
    pub context: Option<Value>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Track {
    pub id: String,
    pub name: String,
    pub duration_ms: u64,
    pub album: Album,
    pub artists: Vec<ArtistRef>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Album {
    pub name: String,
    pub release_date: String,
}

/// Artist entry inside `track.artists`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ArtistRef {
    pub name: String,
}

/// Normalized row: nested fields flattened into dotted column names
///
/// Serializing a `FlatPlay` yields an object keyed by the dotted paths
/// (`track.id`, `track.album.name`, ...).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlatPlay {
    #[serde(rename = "track.id")]
    pub track_id: String,
    #[serde(rename = "track.name")]
    pub track_name: String,
    #[serde(rename = "track.duration_ms")]
    pub track_duration_ms: u64,
    #[serde(rename = "track.album.name")]
    pub track_album_name: String,
    #[serde(rename = "track.album.release_date")]
    pub track_album_release_date: String,
    #[serde(rename = "track.artists")]
    pub track_artists: Vec<ArtistRef>,
    pub played_at: String,
    pub context: Option<Value>,
}

impl FlatPlay {
    /// Dotted column names in normalized order
    pub const COLUMNS: [&'static str; 8] = [
        "track.id",
        "track.name",
        "track.duration_ms",
        "track.album.name",
        "track.album.release_date",
        "track.artists",
        "played_at",
        "context",
    ];

}

#[cfg(test)]
impl FlatPlay {
    /// Look up a column by its dotted name
    pub fn column(&self, name: &str) -> Option<Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(mut map)) => map.remove(name),
            _ => None,
        }
    }
}

impl From<PlayEvent> for FlatPlay {
    fn from(event: PlayEvent) -> Self {
        let PlayEvent {
            track,
            played_at,
            context,
        } = event;

        Self {
            track_id: track.id,
            track_name: track.name,
            track_duration_ms: track.duration_ms,
            track_album_name: track.album.name,
            track_album_release_date: track.album.release_date,
            track_artists: track.artists,
            played_at,
            context: context.filter(|c| !c.is_null()),
        }
    }
}

/// Normalized table: one [`FlatPlay`] per play event, API order preserved
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayTable {
    rows: Vec<FlatPlay>,
}

impl PlayTable {
    pub fn new(rows: Vec<FlatPlay>) -> Self {
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn columns(&self) -> &'static [&'static str] {
        &FlatPlay::COLUMNS
    }

    pub fn rows(&self) -> &[FlatPlay] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<FlatPlay> {
        self.rows
    }
}

/// Persisted projection, in table column order
#[derive(Debug, Clone, PartialEq)]
pub struct PlayRecord {
    pub track_id: String,
    pub track_album_release_date: String,
    pub played_at: String,
    pub context: Option<Value>,
    pub track_duration_ms: u64,
    /// First artist's name only
    pub track_artists: String,
    pub track_name: String,
    pub track_album_name: String,
}

impl PlayRecord {
    /// `context` as stored: JSON text, or NULL when absent
    pub fn context_text(&self) -> Option<String> {
        self.context.as_ref().map(Value::to_string)
    }
}

/// A row read back from the store; every column is TEXT
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct StoredPlay {
    pub track_id: Option<String>,
    pub track_album_release_date: Option<String>,
    pub played_at: String,
    pub context: Option<String>,
    pub track_duration_ms: Option<String>,
    pub track_artists: Option<String>,
    pub track_name: Option<String>,
    pub track_album_name: Option<String>,
}
