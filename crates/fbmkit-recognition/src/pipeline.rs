//! End-to-end recognition over one shape.
//!
//! The pipeline wires the analyzers together in a fixed order: geometry
//! analysis, feature detection, patterns, relationships, then the per-feature
//! passes (classification, decisions, volume class, accessibility and
//! machinability). Every stage is deterministic, so the same shape and
//! configuration always produce the same report.

use crate::adjacency::{AdjacencyAnalyzer, DistanceMetric, FeatureGraph, FeatureRelationship};
use crate::classifier::{
    ClassificationResult, CriteriaDecision, CriteriaWeights, FeatureClassifier, VolumeClass,
};
use crate::engine::{base_height, FeatureRecognitionEngine};
use crate::error::{RecognitionError, RecognitionResult};
use crate::feature::{Feature, FeatureId};
use crate::geometry_analyzer::{FeatureAccessibility, GeometryAnalysis, GeometryAnalyzer};
use crate::machinability::{MachinabilityScore, MachinabilityScorer};
use crate::patterns::{assign_pattern_ids, FeaturePattern, PatternRecognizer};
use fbmkit_core::{ShapeSnapshot, TopologyAccessor};
use fbmkit_settings::RecognitionConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

/// Counts for a quick look at a report
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub feature_count: usize,
    /// Keyed by the kebab-case feature type
    pub features_by_type: BTreeMap<String, usize>,
    pub pattern_count: usize,
    pub relationship_count: usize,
    pub cluster_count: usize,
    /// 0 when there are no features
    pub mean_confidence: f64,
}

impl ReportSummary {
    fn build(
        features: &[Feature],
        patterns: &[FeaturePattern],
        relationships: &[FeatureRelationship],
        clusters: &[Vec<FeatureId>],
    ) -> Self {
        let mut features_by_type = BTreeMap::new();
        for f in features {
            *features_by_type.entry(f.feature_type.key().to_string()).or_insert(0) += 1;
        }
        let mean_confidence = if features.is_empty() {
            0.0
        } else {
            features.iter().map(|f| f.confidence).sum::<f64>() / features.len() as f64
        };
        Self {
            feature_count: features.len(),
            features_by_type,
            pattern_count: patterns.len(),
            relationship_count: relationships.len(),
            cluster_count: clusters.len(),
            mean_confidence,
        }
    }
}

/// Everything recognized on one shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognitionReport {
    pub analysis: GeometryAnalysis,
    pub features: Vec<Feature>,
    pub patterns: Vec<FeaturePattern>,
    pub relationships: Vec<FeatureRelationship>,
    pub clusters: Vec<Vec<FeatureId>>,
    pub graph: FeatureGraph,
    /// Fuzzy hole/pocket classification of features with a diameter and depth
    pub classifications: Vec<ClassificationResult>,
    /// Accept/uncertain gating over the cylindrical, deep and large criteria
    pub decisions: BTreeMap<FeatureId, CriteriaDecision>,
    /// Relative to the highest base face
    pub volume_classes: BTreeMap<FeatureId, VolumeClass>,
    pub accessibility: BTreeMap<FeatureId, FeatureAccessibility>,
    pub machinability: BTreeMap<FeatureId, MachinabilityScore>,
    pub summary: ReportSummary,
}

impl RecognitionReport {
    pub fn feature(&self, id: FeatureId) -> Option<&Feature> {
        self.features.iter().find(|f| f.id == id)
    }

    pub fn to_json(&self, pretty: bool) -> serde_json::Result<String> {
        if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        }
    }
}

/// Explicitly constructed recognition services for one configuration
pub struct RecognitionPipeline {
    config: RecognitionConfig,
    analyzer: GeometryAnalyzer,
    engine: FeatureRecognitionEngine,
    classifier: FeatureClassifier,
    weights: CriteriaWeights,
    adjacency: AdjacencyAnalyzer,
    patterns: PatternRecognizer,
    scorer: MachinabilityScorer,
}

impl RecognitionPipeline {
    /// Pipeline with every built-in detector. Fails if the configuration
    /// does not validate.
    pub fn new(config: RecognitionConfig) -> RecognitionResult<Self> {
        let engine = FeatureRecognitionEngine::with_default_detectors(config.clone());
        Self::with_engine(config, engine)
    }

    /// Pipeline around a custom detector battery
    pub fn with_engine(
        config: RecognitionConfig,
        engine: FeatureRecognitionEngine,
    ) -> RecognitionResult<Self> {
        config.validate()?;
        if engine.enabled_detector_count() == 0 {
            return Err(RecognitionError::InvalidConfiguration(
                "engine has no enabled detectors".to_string(),
            ));
        }

        Ok(Self {
            analyzer: GeometryAnalyzer::new(config.analysis.clone()),
            classifier: FeatureClassifier::new(config.classification.clone()),
            weights: CriteriaWeights::new(),
            adjacency: AdjacencyAnalyzer::new(config.adjacency.clone()),
            patterns: PatternRecognizer::new(config.patterns.clone()),
            scorer: MachinabilityScorer::new(config.machinability.clone()),
            engine,
            config,
        })
    }

    /// Replace the distance used for adjacency
    pub fn with_distance_metric(mut self, metric: Arc<dyn DistanceMetric>) -> Self {
        self.adjacency = AdjacencyAnalyzer::with_metric(self.config.adjacency.clone(), metric);
        self
    }

    /// Per-criterion weights for the accept/uncertain decision. Criteria
    /// without a weight use the configured default.
    pub fn with_criteria_weights(mut self, weights: CriteriaWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn config(&self) -> &RecognitionConfig {
        &self.config
    }

    pub fn engine(&self) -> &FeatureRecognitionEngine {
        &self.engine
    }

    pub fn run(&self, shape: &dyn TopologyAccessor) -> RecognitionReport {
        let analysis = self.analyzer.analyze(shape);
        let mut features = self.engine.recognize(shape);

        let patterns = self.patterns.recognize_all_patterns(&features);
        assign_pattern_ids(&mut features, &patterns);

        let relationships = self.adjacency.analyze_adjacency(&features);
        link_related(&mut features, &relationships);

        let classifications = features
            .iter()
            .filter_map(|f| self.classifier.classify_feature(f))
            .collect();
        let decisions = features
            .iter()
            .map(|f| (f.id, self.classifier.multi_criteria_decision(f, &self.weights)))
            .collect();
        let base_z = base_height(shape, &self.config).unwrap_or(0.0);
        let volume_classes = features
            .iter()
            .map(|f| (f.id, self.classifier.classify_by_volume(&f.bounds, base_z)))
            .collect();
        let accessibility = features
            .iter()
            .map(|f| (f.id, self.analyzer.feature_accessibility(f)))
            .collect();
        let machinability = features
            .iter()
            .map(|f| (f.id, self.scorer.score_with_default_material(f)))
            .collect();

        let clusters = AdjacencyAnalyzer::clusters_from(&features, &relationships);
        let graph = AdjacencyAnalyzer::graph_from(&features, &relationships);
        let summary = ReportSummary::build(&features, &patterns, &relationships, &clusters);

        tracing::info!(
            "Recognized {} features, {} patterns, {} relationships, {} clusters",
            summary.feature_count,
            summary.pattern_count,
            summary.relationship_count,
            summary.cluster_count
        );

        RecognitionReport {
            analysis,
            features,
            patterns,
            relationships,
            clusters,
            graph,
            classifications,
            decisions,
            volume_classes,
            accessibility,
            machinability,
            summary,
        }
    }

    /// Load a JSON shape snapshot and run the pipeline over it
    pub fn run_snapshot_file(&self, path: &Path) -> RecognitionResult<RecognitionReport> {
        let shape = ShapeSnapshot::load_from_file(path)?;
        Ok(self.run(&shape))
    }
}

/// Mirror every relationship into both features' related ids
fn link_related(features: &mut [Feature], relationships: &[FeatureRelationship]) {
    let mut related: BTreeMap<FeatureId, Vec<FeatureId>> = BTreeMap::new();
    for r in relationships {
        related.entry(r.feature1_id).or_default().push(r.feature2_id);
        related.entry(r.feature2_id).or_default().push(r.feature1_id);
    }
    for feature in features.iter_mut() {
        if let Some(ids) = related.get(&feature.id) {
            feature.related_feature_ids.extend(ids.iter().copied());
        }
    }
}
