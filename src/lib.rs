//! # FBMKit
//!
//! Feature-based machining recognition for B-rep shapes:
//! - Shape-wide manufacturability analysis (undercuts, thin walls, draft, accessibility)
//! - Machining features: holes, pockets, slots, bosses, ribs, grooves, edges
//! - Fuzzy hole/pocket classification and multi-criteria decisions
//! - Linear, circular, grid and mirror patterns
//! - Feature relationships, clusters and machinability scores
//!
//! ## Architecture
//!
//! FBMKit is organized as a workspace with multiple crates:
//!
//! 1. **fbmkit-core** - Geometry primitives, topology accessor, shape snapshots
//! 2. **fbmkit-settings** - Recognition thresholds and config persistence
//! 3. **fbmkit-recognition** - Analyzer, detectors, classifier, patterns, pipeline
//! 4. **fbmkit** - Command line binary that integrates all crates

// Re-export member crates for main.rs
pub use fbmkit_core as geometry;
pub use fbmkit_recognition as recognition;
pub use fbmkit_settings as settings;

pub use fbmkit_core::{Error, Result, ShapeBuilder, ShapeSnapshot, TopologyAccessor};

pub use fbmkit_recognition::{
    Feature, FeaturePattern, FeatureRecognitionEngine, FeatureType, MachinabilityScore,
    PatternType, RecognitionError, RecognitionPipeline, RecognitionReport, ReportSummary,
};

pub use fbmkit_settings::{RecognitionConfig, SettingsError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize logging with the default configuration
///
/// Sets up structured logging with:
/// - Output on stderr, so stdout stays clean for reports
/// - RUST_LOG environment variable support
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
