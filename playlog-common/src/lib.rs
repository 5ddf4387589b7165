//! # playlog common library
//!
//! Shared code for the playlog workspace:
//! - Error types
//! - Configuration loading (TOML file + compiled defaults)
//! - Store connection and schema initialization

pub mod config;
pub mod db;
pub mod error;

pub use error::{Error, Result};
