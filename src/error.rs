//! Error types shared across the crate.

use thiserror::Error;

use crate::parts::PartId;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Base image and mask do not share a pixel grid.
    #[error("dimension mismatch: base image is {}x{}, mask is {}x{}", .base.0, .base.1, .mask.0, .mask.1)]
    DimensionMismatch { base: (u32, u32), mask: (u32, u32) },

    #[error("opacity {value} for part {part} is outside [0, 1]")]
    InvalidOpacity { part: PartId, value: f32 },

    #[error("no image is loaded")]
    NoActiveSession,

    #[error("decode error: {0}")]
    Decode(String),

    #[error("no precomputed mask for session {0}")]
    MaskNotFound(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl From<image::ImageError> for Error {
    fn from(e: image::ImageError) -> Self {
        Error::Decode(e.to_string())
    }
}

/// Failures at the session store boundary.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("no saved session {0}")]
    NotFound(String),

    #[error("invalid session id {0:?}")]
    InvalidSessionId(String),

    #[error("invalid part key {0:?}")]
    InvalidKey(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
