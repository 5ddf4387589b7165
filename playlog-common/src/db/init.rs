//! Store initialization
//!
//! One SQLite file, one table. Every run opens a single connection (no pool)
//! and the caller closes it when done.

use crate::{Error, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
use sqlx::{Connection, Executor, Sqlite};
use std::path::Path;
use tracing::{debug, info};

/// Column order of `my_recently_played_tracks`, shared by inserts and reads
pub const RECENTLY_PLAYED_COLUMNS: [&str; 8] = [
    "track_id",
    "track_album_release_date",
    "played_at",
    "context",
    "track_duration_ms",
    "track_artists",
    "track_name",
    "track_album_name",
];

/// Open (creating if needed) the SQLite file at `db_path`
pub async fn open_connection(db_path: &Path) -> Result<SqliteConnection> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true);

    debug!("Connecting to database: {}", db_path.display());
    let conn = SqliteConnection::connect_with(&options).await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        debug!("Opened existing database: {}", db_path.display());
    }

    Ok(conn)
}

/// Open an existing SQLite file for reading only
///
/// Never creates the file or its parent directories; a missing file is
/// [`Error::StoreNotFound`].
pub async fn open_read_only(db_path: &Path) -> Result<SqliteConnection> {
    if !db_path.is_file() {
        return Err(Error::StoreNotFound(db_path.to_path_buf()));
    }

    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .read_only(true)
        .create_if_missing(false);

    debug!("Connecting to database (read-only): {}", db_path.display());
    Ok(SqliteConnection::connect_with(&options).await?)
}

/// Whether `my_recently_played_tracks` has been created yet
pub async fn recently_played_table_exists<'e, E>(executor: E) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'my_recently_played_tracks'",
    )
    .fetch_one(executor)
    .await?;

    Ok(count > 0)
}

/// Create the play record table if it does not exist
///
/// All columns are TEXT (duration included). `played_at` carries the
/// uniqueness constraint that makes appends idempotent.
pub async fn create_recently_played_table<'e, E>(executor: E) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    executor
        .execute(
            r#"
            CREATE TABLE IF NOT EXISTS my_recently_played_tracks (
                track_id TEXT,
                track_album_release_date TEXT,
                played_at TEXT,
                context TEXT,
                track_duration_ms TEXT,
                track_artists TEXT,
                track_name TEXT,
                track_album_name TEXT,
                CONSTRAINT primary_key_constraint PRIMARY KEY (played_at)
            )
            "#,
        )
        .await?;

    Ok(())
}
