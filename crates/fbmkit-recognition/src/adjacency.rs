//! Feature relationships, clusters and the feature graph.
//!
//! Every unordered pair of features gets at most one relationship. The
//! lower id is always `feature1_id`.

use crate::feature::{Feature, FeatureId, FeatureType};
use fbmkit_settings::AdjacencySettings;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;
use std::sync::Arc;

/// Distance between two features, used for the adjacency test
pub trait DistanceMetric: Send + Sync {
    fn name(&self) -> &str;

    fn distance(&self, a: &Feature, b: &Feature) -> f64;
}

/// Euclidean distance between feature centers
#[derive(Debug, Clone, Copy, Default)]
pub struct CenterDistance;

impl DistanceMetric for CenterDistance {
    fn name(&self) -> &str {
        "center"
    }

    fn distance(&self, a: &Feature, b: &Feature) -> f64 {
        (a.center - b.center).norm()
    }
}

/// Gap between feature bounding boxes; zero when they touch or overlap
#[derive(Debug, Clone, Copy, Default)]
pub struct BoundsGapDistance;

impl DistanceMetric for BoundsGapDistance {
    fn name(&self) -> &str {
        "bounds_gap"
    }

    fn distance(&self, a: &Feature, b: &Feature) -> f64 {
        let gap = |lo_a: f64, hi_a: f64, lo_b: f64, hi_b: f64| (lo_b - hi_a).max(lo_a - hi_b).max(0.0);
        let (p, q) = (&a.bounds, &b.bounds);
        let dx = gap(p.min.x, p.max.x, q.min.x, q.max.x);
        let dy = gap(p.min.y, p.max.y, q.min.y, q.max.y);
        let dz = gap(p.min.z, p.max.z, q.min.z, q.max.z);
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationshipType {
    Adjacent,
    Contained,
    Overlapping,
}

impl fmt::Display for RelationshipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Adjacent => "adjacent",
            Self::Contained => "contained",
            Self::Overlapping => "overlapping",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRelationship {
    pub feature1_id: FeatureId,
    pub feature2_id: FeatureId,
    pub relationship_type: RelationshipType,
    /// In [0, 1]
    pub strength: f64,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: FeatureId,
    pub feature_type: FeatureType,
    pub depth: Option<f64>,
    pub diameter: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source: FeatureId,
    pub target: FeatureId,
    pub relationship_type: RelationshipType,
    pub strength: f64,
}

/// Node/edge view of the relationships
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

pub struct AdjacencyAnalyzer {
    settings: AdjacencySettings,
    metric: Arc<dyn DistanceMetric>,
}

impl AdjacencyAnalyzer {
    /// Analyzer using center-to-center distance
    pub fn new(settings: AdjacencySettings) -> Self {
        Self::with_metric(settings, Arc::new(CenterDistance))
    }

    pub fn with_metric(settings: AdjacencySettings, metric: Arc<dyn DistanceMetric>) -> Self {
        Self { settings, metric }
    }

    pub fn metric_name(&self) -> &str {
        self.metric.name()
    }

    /// Relationship between every pair of features that has one
    pub fn analyze_adjacency(&self, features: &[Feature]) -> Vec<FeatureRelationship> {
        let threshold = self.settings.proximity_threshold;
        let tolerance = self.settings.containment_tolerance;
        let mut seen = BTreeSet::new();
        let mut relationships = Vec::new();

        for (i, a) in features.iter().enumerate() {
            for b in &features[i + 1..] {
                let (lo, hi) = (a.id.min(b.id), a.id.max(b.id));
                if lo == hi || !seen.insert((lo, hi)) {
                    continue;
                }

                let distance = self.metric.distance(a, b);
                let (relationship_type, strength) = if distance.is_finite() && distance < threshold {
                    (RelationshipType::Adjacent, 1.0 - distance / threshold)
                } else if a.bounds.contains_box(&b.bounds, tolerance)
                    || b.bounds.contains_box(&a.bounds, tolerance)
                {
                    (RelationshipType::Contained, 1.0)
                } else if a.bounds.intersects(&b.bounds) {
                    (RelationshipType::Overlapping, 0.8)
                } else {
                    continue;
                };

                relationships.push(FeatureRelationship {
                    feature1_id: lo,
                    feature2_id: hi,
                    relationship_type,
                    strength: strength.clamp(0.0, 1.0),
                    notes: format!("Distance: {:.1}mm", distance),
                });
            }
        }

        tracing::debug!(
            "Found {} relationships among {} features",
            relationships.len(),
            features.len()
        );
        relationships
    }

    /// Connected components of two or more features
    pub fn find_feature_clusters(&self, features: &[Feature]) -> Vec<Vec<FeatureId>> {
        let relationships = self.analyze_adjacency(features);
        Self::clusters_from(features, &relationships)
    }

    /// Connected components over precomputed relationships, in feature order.
    /// Each cluster is sorted by id.
    pub fn clusters_from(
        features: &[Feature],
        relationships: &[FeatureRelationship],
    ) -> Vec<Vec<FeatureId>> {
        let mut neighbours: BTreeMap<FeatureId, Vec<FeatureId>> = BTreeMap::new();
        for r in relationships {
            neighbours.entry(r.feature1_id).or_default().push(r.feature2_id);
            neighbours.entry(r.feature2_id).or_default().push(r.feature1_id);
        }

        let mut visited = BTreeSet::new();
        let mut clusters = Vec::new();
        for feature in features {
            if !visited.insert(feature.id) {
                continue;
            }
            let mut cluster = vec![feature.id];
            let mut queue = VecDeque::from([feature.id]);
            while let Some(id) = queue.pop_front() {
                for &next in neighbours.get(&id).into_iter().flatten() {
                    if visited.insert(next) {
                        cluster.push(next);
                        queue.push_back(next);
                    }
                }
            }
            if cluster.len() > 1 {
                cluster.sort_unstable();
                clusters.push(cluster);
            }
        }
        clusters
    }

    pub fn build_feature_graph(&self, features: &[Feature]) -> FeatureGraph {
        let relationships = self.analyze_adjacency(features);
        Self::graph_from(features, &relationships)
    }

    pub fn graph_from(features: &[Feature], relationships: &[FeatureRelationship]) -> FeatureGraph {
        FeatureGraph {
            nodes: features
                .iter()
                .map(|f| GraphNode {
                    id: f.id,
                    feature_type: f.feature_type,
                    depth: f.dimensions.depth,
                    diameter: f.dimensions.diameter,
                })
                .collect(),
            edges: relationships
                .iter()
                .map(|r| GraphEdge {
                    source: r.feature1_id,
                    target: r.feature2_id,
                    relationship_type: r.relationship_type,
                    strength: r.strength,
                })
                .collect(),
        }
    }
}

impl Default for AdjacencyAnalyzer {
    fn default() -> Self {
        Self::new(AdjacencySettings::default())
    }
}

impl fmt::Debug for AdjacencyAnalyzer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdjacencyAnalyzer")
            .field("settings", &self.settings)
            .field("metric", &self.metric.name())
            .finish()
    }
}
