//! Top-level error type and exit codes
//!
//! Each stage has its own error enum; `EtlError` only gathers them so the
//! command layer can decide per kind whether the run failed and how to exit.

use crate::db::{LoadError, StoreError};
use crate::pipeline::ShapeError;
use crate::services::{AuthError, FetchError};
use thiserror::Error;

/// Process exit codes
pub mod exit_code {
    pub const SUCCESS: u8 = 0;
    /// Configuration, authorization or anything without a dedicated code
    pub const GENERAL: u8 = 1;
    /// The source returned no plays
    pub const NO_DATA: u8 = 2;
    pub const FETCH: u8 = 3;
    pub const SHAPE: u8 = 4;
    pub const STORE: u8 = 5;
}

#[derive(Debug, Error)]
pub enum EtlError {
    #[error(transparent)]
    Config(#[from] playlog_common::Error),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Shape(#[from] ShapeError),

    #[error(transparent)]
    Load(#[from] LoadError),
}

impl From<StoreError> for EtlError {
    fn from(err: StoreError) -> Self {
        EtlError::Load(LoadError::Store(err))
    }
}

impl EtlError {
    /// Exit code for a run that ended with this error
    ///
    /// A batch-policy collision is reported but is not a failed run: the
    /// store already holds those plays.
    pub fn exit_code(&self) -> u8 {
        match self {
            EtlError::Config(_) | EtlError::Auth(_) => exit_code::GENERAL,
            EtlError::Fetch(_) => exit_code::FETCH,
            EtlError::Shape(_) => exit_code::SHAPE,
            EtlError::Load(LoadError::Store(_)) => exit_code::STORE,
            EtlError::Load(LoadError::ConstraintViolation { .. }) => exit_code::SUCCESS,
        }
    }
}
