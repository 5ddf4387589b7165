//! Project normalized rows onto the persisted eight-column schema

use super::ShapeError;
use crate::models::{FlatPlay, PlayRecord, PlayTable};

/// One [`PlayRecord`] per row, same order
///
/// Fails on the first row whose artist list is empty; there is no first
/// artist to keep.
pub fn transform(table: PlayTable) -> Result<Vec<PlayRecord>, ShapeError> {
    table
        .into_rows()
        .into_iter()
        .enumerate()
        .map(|(index, row)| to_record(index, row))
        .collect()
}

fn to_record(index: usize, row: FlatPlay) -> Result<PlayRecord, ShapeError> {
    let FlatPlay {
        track_id,
        track_name,
        track_duration_ms,
        track_album_name,
        track_album_release_date,
        track_artists,
        played_at,
        context,
    } = row;

    let Some(first_artist) = track_artists.into_iter().next() else {
        return Err(ShapeError::NoArtists { index, played_at });
    };

    Ok(PlayRecord {
        track_id,
        track_album_release_date,
        played_at,
        context,
        track_duration_ms,
        track_artists: first_artist.name,
        track_name,
        track_album_name,
    })
}
