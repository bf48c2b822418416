//! Error types for the recognition pipeline.
//!
//! Recognition itself never fails on loadable geometry; these errors cover
//! setup (configuration, detector registry) and input loading.

use fbmkit_core::Error as CoreError;
use fbmkit_settings::SettingsError;
use thiserror::Error;

/// Recognition pipeline errors
#[derive(Error, Debug)]
pub enum RecognitionError {
    /// The configuration failed validation
    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    /// The shape could not be loaded
    #[error("Shape error: {0}")]
    Core(#[from] CoreError),

    /// The pipeline was assembled in an unusable way
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl RecognitionError {
    /// True when the failure happened before any geometry was examined
    pub fn is_setup_error(&self) -> bool {
        matches!(self, Self::Settings(_) | Self::InvalidConfiguration(_))
    }
}

/// Result type for recognition operations
pub type RecognitionResult<T> = Result<T, RecognitionError>;
