//! Fuzzy and multi-criteria feature classification.
//!
//! The classifier is stateless apart from its thresholds. Results are
//! produced on demand and never stored on the feature they describe.

use crate::feature::{Feature, FeatureId};
use fbmkit_core::BoundingBox;
use fbmkit_settings::ClassificationSettings;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Classes the fuzzy classifier distinguishes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureClass {
    Hole,
    Pocket,
}

impl fmt::Display for FeatureClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hole => write!(f, "hole"),
            Self::Pocket => write!(f, "pocket"),
        }
    }
}

/// Inputs to [`FeatureClassifier::fuzzy_classify`]
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FeatureProperties {
    pub id: FeatureId,
    pub depth: f64,
    pub diameter: f64,
}

impl FeatureProperties {
    pub fn new(id: FeatureId, depth: f64, diameter: f64) -> Self {
        Self {
            id,
            depth,
            diameter,
        }
    }
}

/// Outcome of a fuzzy classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub feature_id: FeatureId,
    pub primary_classification: FeatureClass,
    /// Membership of the primary class
    pub confidence: f64,
    /// Other classes above the alternative threshold, strongest first
    pub alternative_classifications: Vec<(FeatureClass, f64)>,
    pub reasoning: Vec<String>,
}

/// Criteria used by the multi-criteria decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Criterion {
    Cylindrical,
    Deep,
    Large,
}

/// Caller-supplied weights; missing criteria use the default weight
pub type CriteriaWeights = BTreeMap<Criterion, f64>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Accept,
    Uncertain,
}

/// Outcome of a multi-criteria decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriteriaDecision {
    /// Only the criteria that could be evaluated for the feature
    pub criteria_scores: BTreeMap<Criterion, f64>,
    pub weighted_score: f64,
    pub decision: Decision,
}

/// Whether a feature adds or removes material relative to a base surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VolumeClass {
    Additive,
    Subtractive,
    Unknown,
}

#[derive(Debug, Clone, Default)]
pub struct FeatureClassifier {
    settings: ClassificationSettings,
}

impl FeatureClassifier {
    pub fn new(settings: ClassificationSettings) -> Self {
        Self { settings }
    }

    /// Hole membership for a depth/diameter ratio: 1 above 2, linear on (1, 2]
    pub fn hole_membership(ratio: f64) -> f64 {
        if ratio > 2.0 {
            1.0
        } else if ratio > 1.0 {
            ratio - 1.0
        } else {
            0.0
        }
    }

    /// Pocket membership for a depth/diameter ratio: 1 below 0.5, linear on [0.5, 1)
    pub fn pocket_membership(ratio: f64) -> f64 {
        if ratio < 0.5 {
            1.0
        } else if ratio < 1.0 {
            (1.0 - ratio) / 0.5
        } else {
            0.0
        }
    }

    /// Hole vs pocket by aspect ratio. Ties go to hole.
    pub fn fuzzy_classify(&self, props: &FeatureProperties) -> ClassificationResult {
        let ratio = props.depth / (props.diameter + 0.001);
        let ratio = if ratio.is_finite() { ratio } else { 0.0 };

        let hole = Self::hole_membership(ratio);
        let pocket = Self::pocket_membership(ratio);
        let memberships = [(FeatureClass::Hole, hole), (FeatureClass::Pocket, pocket)];

        let (primary, confidence) = memberships
            .iter()
            .copied()
            .fold(None::<(FeatureClass, f64)>, |best, (class, m)| match best {
                Some((_, b)) if b >= m => best,
                _ => Some((class, m)),
            })
            .unwrap_or((FeatureClass::Hole, 0.0));

        let mut alternatives: Vec<(FeatureClass, f64)> = memberships
            .iter()
            .copied()
            .filter(|&(class, m)| class != primary && m > self.settings.alternative_threshold)
            .collect();
        alternatives.sort_by(|a, b| b.1.total_cmp(&a.1));

        ClassificationResult {
            feature_id: props.id,
            primary_classification: primary,
            confidence,
            alternative_classifications: alternatives,
            reasoning: vec![
                format!("Aspect ratio: {:.2}", ratio),
                format!("Hole membership: {:.2}", hole),
                format!("Pocket membership: {:.2}", pocket),
            ],
        }
    }

    /// Fuzzy classification of a feature that has both a diameter and a depth
    pub fn classify_feature(&self, feature: &Feature) -> Option<ClassificationResult> {
        let d = &feature.dimensions;
        match (d.depth, d.diameter) {
            (Some(depth), Some(diameter)) => {
                Some(self.fuzzy_classify(&FeatureProperties::new(feature.id, depth, diameter)))
            }
            _ => None,
        }
    }

    /// Weighted sum over the cylindrical, deep and large criteria
    pub fn multi_criteria_decision(
        &self,
        feature: &Feature,
        weights: &CriteriaWeights,
    ) -> CriteriaDecision {
        let d = &feature.dimensions;
        let mut scores = BTreeMap::new();

        let cylindrical = d.diameter.is_some_and(|dia| dia > 0.0);
        scores.insert(Criterion::Cylindrical, if cylindrical { 1.0 } else { 0.0 });

        if let (Some(depth), Some(width)) = (d.depth, d.width) {
            scores.insert(Criterion::Deep, if depth > width { 1.0 } else { 0.0 });
        }

        if let Some(area) = d.area {
            let large = if area > self.settings.large_area {
                1.0
            } else if area > self.settings.medium_area {
                0.5
            } else {
                0.0
            };
            scores.insert(Criterion::Large, large);
        }

        let weighted_score: f64 = scores
            .iter()
            .map(|(criterion, score)| {
                score * weights.get(criterion).copied().unwrap_or(self.settings.default_weight)
            })
            .sum();

        CriteriaDecision {
            criteria_scores: scores,
            weighted_score,
            decision: if weighted_score > self.settings.accept_threshold {
                Decision::Accept
            } else {
                Decision::Uncertain
            },
        }
    }

    /// Additive when the volume rises above the base surface by more than the
    /// margin, subtractive when it dips below it
    pub fn classify_by_volume(&self, bounds: &BoundingBox, base_z: f64) -> VolumeClass {
        let margin = self.settings.volume_margin;
        if bounds.max.z > base_z + margin {
            VolumeClass::Additive
        } else if bounds.min.z < base_z - margin {
            VolumeClass::Subtractive
        } else {
            VolumeClass::Unknown
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::{Dimensions, FeatureGeometry, FeatureType};
    use fbmkit_core::{FaceId, Point3D, Vector3D};

    fn classifier() -> FeatureClassifier {
        FeatureClassifier::new(ClassificationSettings::default())
    }

    fn feature_with(dimensions: Dimensions) -> Feature {
        Feature::new(
            7,
            FeatureType::PocketRectangular,
            FeatureGeometry::Face {
                face: FaceId(0),
                normal: Vector3D::new(0.0, 0.0, 1.0),
            },
            Point3D::origin(),
            BoundingBox::new(Point3D::origin(), Point3D::new(1.0, 1.0, 1.0)),
        )
        .with_dimensions(dimensions)
    }

    #[test]
    fn test_deep_narrow_is_hole() {
        let result = classifier().fuzzy_classify(&FeatureProperties::new(1, 30.0, 5.0));
        assert_eq!(result.primary_classification, FeatureClass::Hole);
        assert_eq!(result.confidence, 1.0);
        assert!(result.alternative_classifications.is_empty());
        assert_eq!(result.reasoning.len(), 3);
    }

    #[test]
    fn test_shallow_wide_is_pocket() {
        let result = classifier().fuzzy_classify(&FeatureProperties::new(2, 2.0, 40.0));
        assert_eq!(result.primary_classification, FeatureClass::Pocket);
        assert_eq!(result.confidence, 1.0);
    }

    #[test]
    fn test_borderline_ratio_keeps_pocket_alternative() {
        // ratio ~0.8: pocket 0.4, hole 0
        let result = classifier().fuzzy_classify(&FeatureProperties::new(3, 8.0, 10.0));
        assert_eq!(result.primary_classification, FeatureClass::Pocket);
        assert!((result.confidence - 0.4).abs() < 1e-3);
        assert!(result.alternative_classifications.is_empty());
        assert_eq!(result.feature_id, 3);
    }

    #[test]
    fn test_degenerate_input_does_not_panic() {
        let result = classifier().fuzzy_classify(&FeatureProperties::new(4, f64::NAN, 0.0));
        assert_eq!(result.primary_classification, FeatureClass::Pocket);
        assert_eq!(result.confidence, 1.0);
    }

    #[test]
    fn test_multi_criteria_only_scores_known_criteria() {
        let f = feature_with(Dimensions {
            diameter: Some(6.0),
            ..Dimensions::default()
        });
        let decision = classifier().multi_criteria_decision(&f, &CriteriaWeights::new());
        assert_eq!(decision.criteria_scores.len(), 1);
        assert!((decision.weighted_score - 0.33).abs() < 1e-12);
        assert_eq!(decision.decision, Decision::Uncertain);
    }

    #[test]
    fn test_multi_criteria_accepts_with_weights() {
        let f = feature_with(Dimensions {
            diameter: Some(6.0),
            depth: Some(20.0),
            width: Some(6.0),
            area: Some(150.0),
            ..Dimensions::default()
        });
        let weights = CriteriaWeights::from([(Criterion::Cylindrical, 0.4), (Criterion::Deep, 0.4)]);
        let decision = classifier().multi_criteria_decision(&f, &weights);
        assert_eq!(decision.criteria_scores[&Criterion::Large], 0.5);
        // 0.4 + 0.4 + 0.5 * 0.33
        assert!((decision.weighted_score - 0.965).abs() < 1e-12);
        assert_eq!(decision.decision, Decision::Accept);
    }

    #[test]
    fn test_classify_by_volume() {
        let c = classifier();
        let above = BoundingBox::new(Point3D::new(0.0, 0.0, 10.0), Point3D::new(5.0, 5.0, 15.0));
        let below = BoundingBox::new(Point3D::new(0.0, 0.0, 2.0), Point3D::new(5.0, 5.0, 10.0));
        let flush = BoundingBox::new(Point3D::new(0.0, 0.0, 9.8), Point3D::new(5.0, 5.0, 10.2));
        assert_eq!(c.classify_by_volume(&above, 10.0), VolumeClass::Additive);
        assert_eq!(c.classify_by_volume(&below, 10.0), VolumeClass::Subtractive);
        assert_eq!(c.classify_by_volume(&flush, 10.0), VolumeClass::Unknown);
    }
}
