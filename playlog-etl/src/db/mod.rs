//! Store access for the ETL job
//!
//! Append-only: records are inserted, read back for display, never updated
//! or deleted.

pub mod recently_played;

pub use recently_played::{fetch_recent, load_records};

use std::path::PathBuf;
use thiserror::Error;

/// Store failures; all of them abort the run
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Could not open database {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: playlog_common::Error,
    },

    #[error("Could not create table: {0}")]
    CreateTable(#[source] playlog_common::Error),

    #[error("Problem inserting data into database: {0}")]
    Insert(#[source] sqlx::Error),

    #[error("Query failed: {0}")]
    Query(#[source] playlog_common::Error),

    #[error("Could not close database: {0}")]
    Close(#[source] sqlx::Error),
}

/// Loader outcome errors
#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Batch policy only: a record collided with a stored `played_at`, so
    /// the whole batch was rolled back
    #[error("Play at {played_at} already exists; batch of {batch_size} rolled back")]
    ConstraintViolation { played_at: String, batch_size: usize },
}

/// How the loader treats `played_at` collisions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InsertPolicy {
    /// Skip colliding rows, insert the rest
    #[default]
    Row,
    /// Any collision rejects the whole batch
    Batch,
}

/// Result of a successful load
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoadSummary {
    pub inserted: usize,
    pub skipped: usize,
}
