//! Store connection and schema

pub mod init;

pub use init::*;
