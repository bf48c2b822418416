//! Error handling for FBMKit
//!
//! Errors surface only at the edges of a recognition run:
//! - Load errors (shape snapshot could not be read or parsed)
//! - Geometry errors (a snapshot violates a structural invariant)
//!
//! Recognition itself never fails on loadable geometry. Degenerate faces,
//! collinear points and unknown surface tags are skipped, not reported.

use thiserror::Error;

/// Errors raised while loading or validating a shape snapshot
#[derive(Error, Debug)]
pub enum Error {
    /// The shape could not be loaded
    #[error("Failed to load shape: {reason}")]
    Load {
        /// The reason the load failed.
        reason: String,
    },

    /// The snapshot is structurally invalid
    #[error("Invalid geometry in {entity}: {reason}")]
    InvalidGeometry {
        /// The face or edge that failed validation.
        entity: String,
        /// Why the entity is invalid.
        reason: String,
    },

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an error from a string message
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    /// Create a load error
    pub fn load(reason: impl Into<String>) -> Self {
        Error::Load {
            reason: reason.into(),
        }
    }

    /// Check if this error happened while loading input
    pub fn is_load_error(&self) -> bool {
        matches!(self, Error::Load { .. } | Error::Io(_) | Error::Json(_))
    }
}

/// Result type using Error
pub type Result<T> = std::result::Result<T, Error>;
