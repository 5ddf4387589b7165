//! Normalize → validate → transform
//!
//! Pure, synchronous stages between the fetched page and the loader.

pub mod normalize;
pub mod transform;
pub mod validate;

pub use normalize::normalize;
pub use transform::transform;
pub use validate::validate;

use thiserror::Error;

/// Data-shape errors: the response did not look like play events
#[derive(Debug, Error)]
pub enum ShapeError {
    /// An item is missing a nested field or has the wrong type
    #[error("Malformed play event at index {index}: {reason}")]
    Malformed { index: usize, reason: String },

    /// `track.artists` was an empty list, so there is no first artist
    #[error("Play event at index {index} ({played_at}) has no artists")]
    NoArtists { index: usize, played_at: String },
}
