//! Flatten the nested API page into one row per play

use super::ShapeError;
use crate::models::{FlatPlay, PlayEvent, PlayTable, RecentlyPlayedPage};
use tracing::{debug, info};

/// One [`FlatPlay`] per item, in API order
///
/// Every item must have the full nested shape; the first one that does not
/// aborts normalization with its index.
pub fn normalize(page: &RecentlyPlayedPage) -> Result<PlayTable, ShapeError> {
    info!("Data retrieved, normalizing {} play events", page.items.len());

    let rows = page
        .items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            serde_json::from_value::<PlayEvent>(item.clone())
                .map(FlatPlay::from)
                .map_err(|e| ShapeError::Malformed {
                    index,
                    reason: e.to_string(),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let table = PlayTable::new(rows);
    debug!(columns = ?table.columns(), rows = table.len(), "Normalized play table");

    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn item(id: &str, played_at: &str) -> Value {
        json!({
            "track": {
                "id": id,
                "name": format!("Song {id}"),
                "duration_ms": 180000,
                "album": {"name": "Album", "release_date": "2019-05-05"},
                "artists": [{"name": "Artist"}]
            },
            "played_at": played_at,
            "context": {"type": "album", "uri": "spotify:album:1"}
        })
    }

    fn page(items: Vec<Value>) -> RecentlyPlayedPage {
        RecentlyPlayedPage {
            items,
            ..Default::default()
        }
    }

    #[test]
    fn test_one_row_per_item_in_order() {
        let table = normalize(&page(vec![
            item("a", "2024-01-02T00:00:00Z"),
            item("b", "2024-01-01T00:00:00Z"),
        ]))
        .unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[0].track_id, "a");
        assert_eq!(table.rows()[1].track_id, "b");
        assert_eq!(table.rows()[0].column("track.album.name"), Some(json!("Album")));
    }

    #[test]
    fn test_empty_page_gives_empty_table() {
        let table = normalize(&page(vec![])).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn test_missing_nested_field_names_index() {
        let mut broken = item("b", "2024-01-01T00:00:00Z");
        broken["track"]["album"]
            .as_object_mut()
            .unwrap()
            .remove("release_date");

        let err = normalize(&page(vec![item("a", "2024-01-02T00:00:00Z"), broken])).unwrap_err();

        match err {
            ShapeError::Malformed { index, reason } => {
                assert_eq!(index, 1);
                assert!(reason.contains("release_date"), "reason was {reason}");
            }
            other => panic!("Expected Malformed, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_context_is_allowed() {
        let mut no_context = item("a", "2024-01-02T00:00:00Z");
        no_context.as_object_mut().unwrap().remove("context");

        let table = normalize(&page(vec![no_context])).unwrap();
        assert_eq!(table.rows()[0].context, None);
    }
}
