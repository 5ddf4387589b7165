//! Common error types for playlog

use std::path::PathBuf;
use thiserror::Error;

/// Common result type for playlog operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by the playlog crates
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Read-only open of a database file that does not exist
    #[error("No database at {0}")]
    StoreNotFound(PathBuf),

    /// TOML config file could not be parsed
    #[error("Invalid config file {path}: {message}")]
    ConfigParse { path: PathBuf, message: String },
}
