use super::common::{hole_at, holes_at};
use fbmkit_recognition::{
    FeatureClass, FeatureClassifier, FeaturePattern, FeatureProperties, MirrorPlane,
    PatternRecognizer, PatternType,
};
use fbmkit_settings::{ClassificationSettings, PatternSettings};

fn recognizer() -> PatternRecognizer {
    PatternRecognizer::new(PatternSettings::default())
}

fn of_type(patterns: &[FeaturePattern], kind: PatternType) -> Vec<&FeaturePattern> {
    patterns.iter().filter(|p| p.pattern_type == kind).collect()
}

#[test]
fn test_row_of_four_holes_is_one_linear_pattern() {
    let features = holes_at(&[(0.0, 0.0), (10.0, 0.0), (20.0, 0.0), (30.0, 0.0)]);
    let patterns = recognizer().recognize_all_patterns(&features);

    assert_eq!(patterns.len(), 1);
    let row = &patterns[0];
    assert_eq!(row.pattern_type, PatternType::Linear);
    assert_eq!(row.feature_ids.len(), 4);
    assert_eq!(row.pattern_count, 4);
    assert!((row.spacing.unwrap_or_default() - 10.0).abs() < 1e-9);
    assert!(row.confidence > 0.95);
}

#[test]
fn test_bolt_circle_of_six_holes() {
    let points: Vec<(f64, f64)> = (0..6)
        .map(|i| {
            let a = (60.0 * i as f64).to_radians();
            (50.0 + 20.0 * a.cos(), 50.0 + 20.0 * a.sin())
        })
        .collect();
    let features = holes_at(&points);
    let patterns = recognizer().recognize_all_patterns(&features);

    let circular = of_type(&patterns, PatternType::Circular);
    assert_eq!(circular.len(), 1);
    assert_eq!(circular[0].pattern_count, 6);
    assert!((circular[0].angle.unwrap_or_default() - 60.0).abs() < 1e-9);

    let center = circular[0].center.unwrap_or_else(|| panic!("circle without center"));
    assert!((center.x - 50.0).abs() < 1e-6);
    assert!((center.y - 50.0).abs() < 1e-6);
}

#[test]
fn test_two_by_two_grid() {
    let features = holes_at(&[(10.0, 10.0), (25.0, 10.0), (10.0, 30.0), (25.0, 30.0)]);
    let patterns = recognizer().recognize_all_patterns(&features);

    let grids = of_type(&patterns, PatternType::Grid);
    assert_eq!(grids.len(), 1);
    assert_eq!(grids[0].feature_ids, vec![1, 2, 3, 4]);
    assert!((grids[0].spacing.unwrap_or_default() - 15.0).abs() < 1e-9);
}

#[test]
fn test_mirrored_pair_across_yz() {
    let features = holes_at(&[(10.0, 5.0), (-10.0, 5.0)]);
    let patterns = recognizer().recognize_all_patterns(&features);

    let mirrors = of_type(&patterns, PatternType::Mirror);
    assert_eq!(mirrors.len(), 1);
    assert_eq!(mirrors[0].mirror_plane, Some(MirrorPlane::YZ));
    assert_eq!(mirrors[0].feature_ids.len(), 2);
}

#[test]
fn test_single_hole_has_no_patterns() {
    let features = vec![hole_at(1, 12.0, 7.0, 0.0)];
    let patterns = recognizer().recognize_all_patterns(&features);
    assert!(patterns.is_empty());
}

#[test]
fn test_patterns_never_mix_feature_types() {
    let mut features = holes_at(&[(0.0, 0.0), (10.0, 0.0), (20.0, 0.0)]);
    features[1].feature_type = fbmkit_recognition::FeatureType::HoleBlind;

    let patterns = recognizer().recognize_all_patterns(&features);
    for pattern in &patterns {
        for id in &pattern.feature_ids {
            let member = features.iter().find(|f| f.id == *id);
            assert_eq!(member.map(|f| f.feature_type), Some(pattern.feature_type));
        }
    }
}

#[test]
fn test_fuzzy_classification_of_medium_aspect_ratio() {
    let classifier = FeatureClassifier::new(ClassificationSettings::default());
    let result = classifier.fuzzy_classify(&FeatureProperties::new(3, 15.0, 10.0));

    assert_eq!(result.feature_id, 3);
    assert_eq!(result.primary_classification, FeatureClass::Hole);
    assert!(result.confidence > 0.0 && result.confidence < 1.0);
    assert!((result.confidence - 0.5).abs() < 1e-3);
    assert!(result
        .alternative_classifications
        .iter()
        .all(|(class, m)| *class == FeatureClass::Pocket && *m > 0.3));
}

#[test]
fn test_shallow_feature_is_a_pocket_with_hole_alternative() {
    let classifier = FeatureClassifier::new(ClassificationSettings::default());
    let result = classifier.fuzzy_classify(&FeatureProperties::new(1, 3.0, 20.0));

    assert_eq!(result.primary_classification, FeatureClass::Pocket);
    assert_eq!(result.confidence, 1.0);
    assert!(result.alternative_classifications.is_empty());
}
