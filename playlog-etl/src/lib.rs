//! playlog-etl library interface
//!
//! Fetches the user's recently played tracks, reshapes them into play
//! records and appends them to the local SQLite store. Exposed as a library
//! so integration tests can drive the pipeline with their own source.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;

pub use crate::error::EtlError;

use crate::db::{InsertPolicy, LoadSummary};
use crate::services::PlaySource;
use std::path::PathBuf;
use tracing::info;

/// Everything one pipeline run needs
pub struct EtlContext {
    pub source: Box<dyn PlaySource>,
    pub database: PathBuf,
    pub limit: u32,
    pub policy: InsertPolicy,
}

/// How a run ended when nothing failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The source returned no plays; the store was not touched
    NothingDownloaded,
    Loaded(LoadSummary),
}

/// Fetch → normalize → validate → transform → load
///
/// Stages run strictly in order and the first failure ends the run.
pub async fn run_pipeline(ctx: &EtlContext) -> Result<RunOutcome, EtlError> {
    info!(
        "Accessing {} to get recently played tracks...",
        ctx.source.name()
    );
    let page = ctx.source.recently_played(ctx.limit).await?;

    let table = pipeline::normalize(&page)?;

    let Some(table) = pipeline::validate(table) else {
        return Ok(RunOutcome::NothingDownloaded);
    };

    let records = pipeline::transform(table)?;

    let summary = db::load_records(&ctx.database, &records, ctx.policy).await?;
    Ok(RunOutcome::Loaded(summary))
}
