use super::common::{composite_part, holes_at};
use fbmkit_recognition::{
    AdjacencyAnalyzer, FeatureClassifier, FeatureProperties, PatternRecognizer,
    RecognitionPipeline, RecognitionReport,
};
use fbmkit_settings::{AdjacencySettings, ClassificationSettings, PatternSettings, RecognitionConfig};
use proptest::prelude::*;
use std::collections::BTreeSet;

fn composite_report() -> RecognitionReport {
    RecognitionPipeline::new(RecognitionConfig::default())
        .unwrap()
        .run(&composite_part())
}

#[test]
fn test_recognition_is_deterministic() {
    assert_eq!(composite_report(), composite_report());
}

#[test]
fn test_feature_ids_are_unique_and_dense() {
    let report = composite_report();
    let ids: Vec<u32> = report.features.iter().map(|f| f.id).collect();
    let expected: Vec<u32> = (1..=report.features.len() as u32).collect();
    assert_eq!(ids, expected);
}

#[test]
fn test_feature_scores_stay_in_range() {
    for feature in composite_report().features {
        assert!((0.0..=1.0).contains(&feature.confidence), "{:?}", feature);
        assert!((1..=10).contains(&feature.complexity_rating), "{:?}", feature);
    }
}

#[test]
fn test_patterns_reference_existing_features() {
    let report = composite_report();
    let pattern_ids: BTreeSet<u32> = report.patterns.iter().map(|p| p.id).collect();
    assert_eq!(pattern_ids.len(), report.patterns.len());

    for pattern in &report.patterns {
        assert_eq!(pattern.pattern_count, pattern.feature_ids.len());
        for id in &pattern.feature_ids {
            let member = report.feature(*id).unwrap();
            assert_eq!(member.feature_type, pattern.feature_type);
        }
    }
    for feature in &report.features {
        if let Some(pid) = feature.pattern_id {
            let pattern = report.patterns.iter().find(|p| p.id == pid).unwrap();
            assert!(pattern.feature_ids.contains(&feature.id));
        }
    }
}

#[test]
fn test_relationships_are_ordered_and_unique() {
    let report = composite_report();
    let mut pairs = BTreeSet::new();
    for r in &report.relationships {
        assert!(r.feature1_id < r.feature2_id);
        assert!(pairs.insert((r.feature1_id, r.feature2_id)));
        assert!((0.0..=1.0).contains(&r.strength));
        assert!(report.feature(r.feature1_id).unwrap().related_feature_ids.contains(&r.feature2_id));
    }
}

#[test]
fn test_machinability_scores_stay_in_range() {
    for score in composite_report().machinability.values() {
        assert!((1.0..=10.0).contains(&score.score));
    }
}

fn point() -> impl Strategy<Value = (f64, f64)> {
    (-100.0..100.0f64, -100.0..100.0f64)
}

proptest! {
    #[test]
    fn prop_hole_membership_rises_with_aspect_ratio(a in 0.0..10.0f64, b in 0.0..10.0f64) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(FeatureClassifier::hole_membership(lo) <= FeatureClassifier::hole_membership(hi));
        prop_assert!(FeatureClassifier::pocket_membership(lo) >= FeatureClassifier::pocket_membership(hi));
    }

    #[test]
    fn prop_fuzzy_confidence_is_a_membership(depth in 0.0..500.0f64, diameter in 0.0..500.0f64) {
        let classifier = FeatureClassifier::new(ClassificationSettings::default());
        let result = classifier.fuzzy_classify(&FeatureProperties::new(1, depth, diameter));
        prop_assert!((0.0..=1.0).contains(&result.confidence));
        for (class, membership) in &result.alternative_classifications {
            prop_assert!(*class != result.primary_classification);
            prop_assert!(*membership <= result.confidence);
        }
    }

    #[test]
    fn prop_pattern_members_are_distinct_known_features(points in prop::collection::vec(point(), 0..12)) {
        let features = holes_at(&points);
        let patterns = PatternRecognizer::new(PatternSettings::default()).recognize_all_patterns(&features);
        for (index, pattern) in patterns.iter().enumerate() {
            prop_assert_eq!(pattern.id as usize, index + 1);
            prop_assert!(pattern.feature_ids.len() >= 2);
            let unique: BTreeSet<_> = pattern.feature_ids.iter().collect();
            prop_assert_eq!(unique.len(), pattern.feature_ids.len());
            prop_assert!(pattern.feature_ids.iter().all(|id| (1..=features.len() as u32).contains(id)));
            prop_assert!((0.0..=1.0).contains(&pattern.confidence));
        }
    }

    #[test]
    fn prop_relationships_cover_each_pair_once(points in prop::collection::vec(point(), 0..12)) {
        let features = holes_at(&points);
        let relationships = AdjacencyAnalyzer::new(AdjacencySettings::default()).analyze_adjacency(&features);
        let mut pairs = BTreeSet::new();
        for r in &relationships {
            prop_assert!(r.feature1_id < r.feature2_id);
            prop_assert!(pairs.insert((r.feature1_id, r.feature2_id)));
            prop_assert!((0.0..=1.0).contains(&r.strength));
        }
    }
}
