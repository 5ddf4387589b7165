//! End-to-end pipeline tests against an in-memory play source

mod helpers;

use helpers::{page, play_item, FailingSource, StaticSource};
use playlog_etl::db::{fetch_recent, InsertPolicy, LoadError, LoadSummary};
use playlog_etl::error::exit_code;
use playlog_etl::pipeline::ShapeError;
use playlog_etl::services::FetchError;
use playlog_etl::{run_pipeline, EtlContext, EtlError, RunOutcome};
use serde_json::json;
use std::path::PathBuf;
use tempfile::TempDir;

fn context(source: impl playlog_etl::services::PlaySource + 'static, database: PathBuf) -> EtlContext {
    EtlContext {
        source: Box::new(source),
        database,
        limit: 50,
        policy: InsertPolicy::Row,
    }
}

#[tokio::test]
async fn test_single_play_lands_as_flat_row() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("plays.sqlite");

    let source = StaticSource::new(page(vec![json!({
        "track": {
            "id": "t1",
            "name": "Song",
            "album": {"name": "Album", "release_date": "2020-01-01"},
            "duration_ms": 200000,
            "artists": [{"name": "Artist A"}, {"name": "Artist B"}]
        },
        "played_at": "2024-01-01T00:00:00Z",
        "context": null
    })]));

    let outcome = run_pipeline(&context(source, db_path.clone())).await.unwrap();
    assert_eq!(
        outcome,
        RunOutcome::Loaded(LoadSummary { inserted: 1, skipped: 0 })
    );

    let rows = fetch_recent(&db_path, 10).await.unwrap();
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(row.track_id.as_deref(), Some("t1"));
    assert_eq!(row.track_album_release_date.as_deref(), Some("2020-01-01"));
    assert_eq!(row.played_at, "2024-01-01T00:00:00Z");
    assert_eq!(row.context, None);
    assert_eq!(row.track_duration_ms.as_deref(), Some("200000"));
    assert_eq!(row.track_artists.as_deref(), Some("Artist A"));
    assert_eq!(row.track_name.as_deref(), Some("Song"));
    assert_eq!(row.track_album_name.as_deref(), Some("Album"));
}

#[tokio::test]
async fn test_requested_limit_reaches_source() {
    let temp_dir = TempDir::new().unwrap();
    let source = StaticSource::new(page(vec![]));
    let requested = source.limit_handle();

    let mut ctx = context(source, temp_dir.path().join("plays.sqlite"));
    ctx.limit = 7;
    run_pipeline(&ctx).await.unwrap();

    assert_eq!(*requested.lock().unwrap(), Some(7));
}

#[tokio::test]
async fn test_empty_page_short_circuits_before_store() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("plays.sqlite");

    let outcome = run_pipeline(&context(StaticSource::new(page(vec![])), db_path.clone()))
        .await
        .unwrap();

    assert_eq!(outcome, RunOutcome::NothingDownloaded);
    assert!(!db_path.exists(), "store must not be opened for an empty page");
}

#[tokio::test]
async fn test_plays_are_stored_in_response_order() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("plays.sqlite");

    let source = StaticSource::new(page(vec![
        play_item("t3", "2024-01-01T00:03:00Z", &["C"]),
        play_item("t2", "2024-01-01T00:02:00Z", &["B", "X"]),
        play_item("t1", "2024-01-01T00:01:00Z", &["A"]),
    ]));
    run_pipeline(&context(source, db_path.clone())).await.unwrap();

    let rows = fetch_recent(&db_path, 10).await.unwrap();
    let ids: Vec<_> = rows.iter().map(|r| r.track_id.as_deref().unwrap()).collect();
    let artists: Vec<_> = rows.iter().map(|r| r.track_artists.as_deref().unwrap()).collect();
    assert_eq!(ids, vec!["t3", "t2", "t1"]);
    assert_eq!(artists, vec!["C", "B", "A"]);
}

#[tokio::test]
async fn test_malformed_event_is_shape_error() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("plays.sqlite");

    let source = StaticSource::new(page(vec![
        play_item("t1", "2024-01-01T00:00:00Z", &["A"]),
        json!({"played_at": "2024-01-01T00:01:00Z"}),
    ]));
    let err = run_pipeline(&context(source, db_path.clone()))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        EtlError::Shape(ShapeError::Malformed { index: 1, .. })
    ));
    assert_eq!(err.exit_code(), exit_code::SHAPE);
    assert!(!db_path.exists());
}

#[tokio::test]
async fn test_empty_artist_list_is_shape_error() {
    let temp_dir = TempDir::new().unwrap();
    let source = StaticSource::new(page(vec![play_item("t1", "2024-01-01T00:00:00Z", &[])]));

    let err = run_pipeline(&context(source, temp_dir.path().join("plays.sqlite")))
        .await
        .unwrap_err();

    assert!(matches!(err, EtlError::Shape(ShapeError::NoArtists { .. })));
}

#[tokio::test]
async fn test_fetch_failure_aborts_run() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("plays.sqlite");

    let err = run_pipeline(&context(FailingSource, db_path.clone()))
        .await
        .unwrap_err();

    assert!(matches!(err, EtlError::Fetch(FetchError::Network(_))));
    assert_eq!(err.exit_code(), exit_code::FETCH);
    assert!(!db_path.exists());
}

#[tokio::test]
async fn test_second_run_with_same_page() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("plays.sqlite");
    let items = vec![
        play_item("t2", "2024-01-01T00:02:00Z", &["B"]),
        play_item("t1", "2024-01-01T00:01:00Z", &["A"]),
    ];

    run_pipeline(&context(StaticSource::new(page(items.clone())), db_path.clone()))
        .await
        .unwrap();

    // Row policy: nothing new, both skipped
    let outcome = run_pipeline(&context(StaticSource::new(page(items.clone())), db_path.clone()))
        .await
        .unwrap();
    assert_eq!(
        outcome,
        RunOutcome::Loaded(LoadSummary { inserted: 0, skipped: 2 })
    );

    // Batch policy: the collision is reported and maps to a clean exit
    let mut ctx = context(StaticSource::new(page(items)), db_path.clone());
    ctx.policy = InsertPolicy::Batch;
    let err = run_pipeline(&ctx).await.unwrap_err();
    assert!(matches!(
        err,
        EtlError::Load(LoadError::ConstraintViolation { batch_size: 2, .. })
    ));
    assert_eq!(err.exit_code(), exit_code::SUCCESS);

    assert_eq!(fetch_recent(&db_path, 10).await.unwrap().len(), 2);
}
