//! # FBMKit Recognition
//!
//! Turns a B-rep shape into machining semantics:
//! - Shape-wide manufacturability analysis
//! - Typed, confidence-scored machining features from a battery of detectors
//! - Fuzzy and multi-criteria classification
//! - Feature relationships, clusters and patterns
//! - Per-feature machinability scores

pub mod adjacency;
pub mod classifier;
pub mod engine;
pub mod error;
pub mod feature;
pub mod geometry_analyzer;
pub mod machinability;
pub mod patterns;
pub mod pipeline;

pub use adjacency::{
    AdjacencyAnalyzer, BoundsGapDistance, CenterDistance, DistanceMetric, FeatureGraph,
    FeatureRelationship, GraphEdge, GraphNode, RelationshipType,
};
pub use classifier::{
    ClassificationResult, CriteriaDecision, CriteriaWeights, Criterion, Decision, FeatureClass,
    FeatureClassifier, FeatureProperties, VolumeClass,
};
pub use engine::{
    default_detectors, DetectionContext, DetectorHandle, FeatureDetector,
    FeatureRecognitionEngine,
};

// Re-export the built-in detectors for custom batteries
pub use engine::{
    thread_designation, BossDetector, ChamferDetector, CounterboreDetector, CountersinkDetector,
    FilletDetector, GrooveDetector, HoleDetector, IslandPocketDetector, MultiLevelPocketDetector,
    PlanarFaceDetector, PocketDetector, RibDetector, SlotDetector, StudDetector, TSlotDetector,
};
pub use error::{RecognitionError, RecognitionResult};
pub use feature::{
    Accessibility, Dimensions, Feature, FeatureGeometry, FeatureId, FeatureIdAllocator,
    FeatureType, PatternId, ToleranceClass,
};
pub use geometry_analyzer::{
    FeatureAccessibility, GeometryAnalysis, GeometryAnalyzer, ManufacturingRisk,
};
pub use machinability::{Difficulty, MachinabilityScore, MachinabilityScorer};
pub use patterns::{
    assign_pattern_ids, FeaturePattern, MirrorPlane, PatternRecognizer, PatternType,
};
pub use pipeline::{RecognitionPipeline, RecognitionReport, ReportSummary};
