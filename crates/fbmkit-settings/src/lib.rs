//! FBMKit Settings Crate
//!
//! Holds the named thresholds that drive feature recognition and handles
//! loading and saving them as JSON or TOML.

pub mod config;
pub mod error;

pub use config::{
    AdjacencySettings, AnalysisSettings, ClassificationSettings, DetectionSettings,
    MachinabilitySettings, PatternSettings, RecognitionConfig,
};
pub use error::{SettingsError, SettingsResult};
