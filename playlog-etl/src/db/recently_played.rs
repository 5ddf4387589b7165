//! Play record persistence
//!
//! Each call opens its own connection and closes it before returning, on
//! the error paths too. If a caller panics mid-way the connection is still
//! released when it drops. Reads open the file read-only and never create
//! it.

use super::{InsertPolicy, LoadError, LoadSummary, StoreError};
use crate::models::{PlayRecord, StoredPlay};
use playlog_common::db::{
    create_recently_played_table, open_connection, open_read_only, recently_played_table_exists,
};
use sqlx::sqlite::SqliteConnection;
use sqlx::Connection;
use std::path::Path;
use tracing::{debug, error, info};

const INSERT_SQL: &str = r#"
    INSERT INTO my_recently_played_tracks (
        track_id, track_album_release_date, played_at, context,
        track_duration_ms, track_artists, track_name, track_album_name
    ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
"#;

const INSERT_OR_SKIP_SQL: &str = r#"
    INSERT INTO my_recently_played_tracks (
        track_id, track_album_release_date, played_at, context,
        track_duration_ms, track_artists, track_name, track_album_name
    ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
    ON CONFLICT(played_at) DO NOTHING
"#;

/// Ensure the table exists, then append `records` under `policy`
pub async fn load_records(
    db_path: &Path,
    records: &[PlayRecord],
    policy: InsertPolicy,
) -> Result<LoadSummary, LoadError> {
    let mut conn = connect(db_path).await?;

    let outcome = append(&mut conn, records, policy).await;
    close(conn, outcome).await
}

/// Most recently played stored rows, newest first
///
/// A missing database file is [`StoreError::Open`]; a database without the
/// table yet reads as empty.
pub async fn fetch_recent(db_path: &Path, limit: u32) -> Result<Vec<StoredPlay>, StoreError> {
    let mut conn = open_read_only(db_path)
        .await
        .map_err(|source| StoreError::Open {
            path: db_path.to_path_buf(),
            source,
        })?;

    let outcome = select_recent(&mut conn, limit).await;
    close(conn, outcome).await
}

async fn connect(db_path: &Path) -> Result<SqliteConnection, StoreError> {
    let conn = open_connection(db_path)
        .await
        .map_err(|source| StoreError::Open {
            path: db_path.to_path_buf(),
            source,
        })?;

    info!("Database opened successfully: {}", db_path.display());
    Ok(conn)
}

/// Close the connection and hand back `outcome`
///
/// A close failure only replaces a successful outcome; an earlier error wins.
async fn close<T, E>(conn: SqliteConnection, outcome: Result<T, E>) -> Result<T, E>
where
    E: From<StoreError>,
{
    match conn.close().await {
        Ok(()) => info!("Database closed successfully"),
        Err(e) => {
            error!("Could not close database: {}", e);
            if outcome.is_ok() {
                return Err(StoreError::Close(e).into());
            }
        }
    }

    outcome
}

async fn append(
    conn: &mut SqliteConnection,
    records: &[PlayRecord],
    policy: InsertPolicy,
) -> Result<LoadSummary, LoadError> {
    create_recently_played_table(&mut *conn)
        .await
        .map_err(StoreError::CreateTable)?;

    match policy {
        InsertPolicy::Row => insert_or_skip(conn, records).await,
        InsertPolicy::Batch => insert_all_or_nothing(conn, records).await,
    }
}

async fn insert_or_skip(
    conn: &mut SqliteConnection,
    records: &[PlayRecord],
) -> Result<LoadSummary, LoadError> {
    let mut tx = conn.begin().await.map_err(StoreError::Insert)?;
    let mut summary = LoadSummary::default();

    for record in records {
        let affected = insert_record(&mut *tx, INSERT_OR_SKIP_SQL, record)
            .await
            .map_err(StoreError::Insert)?;

        if affected == 0 {
            debug!(played_at = %record.played_at, "Already stored, skipping");
            summary.skipped += 1;
        } else {
            summary.inserted += 1;
        }
    }

    tx.commit().await.map_err(StoreError::Insert)?;

    info!(
        inserted = summary.inserted,
        skipped = summary.skipped,
        "Appended play records"
    );
    Ok(summary)
}

async fn insert_all_or_nothing(
    conn: &mut SqliteConnection,
    records: &[PlayRecord],
) -> Result<LoadSummary, LoadError> {
    let mut tx = conn.begin().await.map_err(StoreError::Insert)?;

    for record in records {
        match insert_record(&mut *tx, INSERT_SQL, record).await {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => {
                tx.rollback().await.map_err(StoreError::Insert)?;
                return Err(LoadError::ConstraintViolation {
                    played_at: record.played_at.clone(),
                    batch_size: records.len(),
                });
            }
            // Dropping the transaction rolls it back
            Err(e) => return Err(StoreError::Insert(e).into()),
        }
    }

    tx.commit().await.map_err(StoreError::Insert)?;

    info!(inserted = records.len(), "Appended play records as one batch");
    Ok(LoadSummary {
        inserted: records.len(),
        skipped: 0,
    })
}

async fn insert_record(
    conn: &mut SqliteConnection,
    sql: &str,
    record: &PlayRecord,
) -> Result<u64, sqlx::Error> {
    let done = sqlx::query(sql)
        .bind(&record.track_id)
        .bind(&record.track_album_release_date)
        .bind(&record.played_at)
        .bind(record.context_text())
        .bind(record.track_duration_ms.to_string())
        .bind(&record.track_artists)
        .bind(&record.track_name)
        .bind(&record.track_album_name)
        .execute(&mut *conn)
        .await?;

    Ok(done.rows_affected())
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .map(|e| e.is_unique_violation())
        .unwrap_or(false)
}

async fn select_recent(
    conn: &mut SqliteConnection,
    limit: u32,
) -> Result<Vec<StoredPlay>, StoreError> {
    let exists = recently_played_table_exists(&mut *conn)
        .await
        .map_err(StoreError::Query)?;
    if !exists {
        return Ok(Vec::new());
    }

    sqlx::query_as::<_, StoredPlay>(
        r#"
        SELECT track_id, track_album_release_date, played_at, context,
               track_duration_ms, track_artists, track_name, track_album_name
        FROM my_recently_played_tracks
        ORDER BY played_at DESC
        LIMIT ?
        "#,
    )
    .bind(i64::from(limit))
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| StoreError::Query(e.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(played_at: &str) -> PlayRecord {
        PlayRecord {
            track_id: "t1".into(),
            track_album_release_date: "2020-01-01".into(),
            played_at: played_at.into(),
            context: None,
            track_duration_ms: 200000,
            track_artists: "Artist A".into(),
            track_name: "Song".into(),
            track_album_name: "Album".into(),
        }
    }

    #[tokio::test]
    async fn test_duplicate_within_one_batch_is_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("plays.sqlite");

        let records = vec![record("2024-01-01T00:00:00Z"), record("2024-01-01T00:00:00Z")];
        let summary = load_records(&db_path, &records, InsertPolicy::Row)
            .await
            .unwrap();

        assert_eq!(summary, LoadSummary { inserted: 1, skipped: 1 });
    }

    #[tokio::test]
    async fn test_fetch_recent_without_table_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("plays.sqlite");
        open_connection(&db_path).await.unwrap().close().await.unwrap();

        let rows = fetch_recent(&db_path, 10).await.unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_recent_never_creates_the_store() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("nested").join("typo.sqlite");

        let result = fetch_recent(&db_path, 5).await;

        assert!(matches!(
            result,
            Err(StoreError::Open {
                source: playlog_common::Error::StoreNotFound(_),
                ..
            })
        ));
        assert!(!db_path.exists());
        assert!(!temp_dir.path().join("nested").exists());
    }

    #[tokio::test]
    async fn test_open_failure_is_store_error() {
        let temp_dir = TempDir::new().unwrap();
        // A directory cannot be opened as a database file
        let result = load_records(temp_dir.path(), &[record("x")], InsertPolicy::Row).await;

        assert!(matches!(
            result,
            Err(LoadError::Store(StoreError::Open { .. }))
        ));
    }
}
