//! Non-emptiness gate between normalization and transform

use crate::models::PlayTable;
use tracing::info;

/// `None` when nothing was downloaded; the caller stops there
pub fn validate(table: PlayTable) -> Option<PlayTable> {
    if table.is_empty() {
        info!("No songs downloaded");
        return None;
    }

    info!("Downloaded {} songs, beginning transform", table.len());
    Some(table)
}
