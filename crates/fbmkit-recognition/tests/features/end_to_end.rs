use super::common::{composite_part, drilled_plate};
use fbmkit_core::SurfaceKind;
use fbmkit_recognition::{
    Accessibility, CriteriaWeights, Criterion, Decision, FeatureClass, FeatureRecognitionEngine,
    FeatureType, HoleDetector, PatternType, RecognitionPipeline, RecognitionReport, VolumeClass,
};
use fbmkit_settings::RecognitionConfig;
use std::sync::Arc;
use tempfile::TempDir;

fn run_default(shape: &fbmkit_core::ShapeSnapshot) -> RecognitionReport {
    RecognitionPipeline::new(RecognitionConfig::default())
        .unwrap()
        .run(shape)
}

fn count(report: &RecognitionReport, kind: FeatureType) -> usize {
    report.features.iter().filter(|f| f.feature_type == kind).count()
}

#[test]
fn test_drilled_plate_row_becomes_linear_pattern() {
    let config = RecognitionConfig::default();
    let mut engine = FeatureRecognitionEngine::new(config.clone());
    engine.register(Arc::new(HoleDetector));
    let pipeline = RecognitionPipeline::with_engine(config, engine).unwrap();

    let report = pipeline.run(&drilled_plate());
    assert_eq!(report.features.len(), 4);
    assert!(report
        .features
        .iter()
        .all(|f| f.feature_type == FeatureType::HoleThrough));

    let linear: Vec<_> = report
        .patterns
        .iter()
        .filter(|p| p.pattern_type == PatternType::Linear)
        .collect();
    assert_eq!(linear.len(), 1);
    assert_eq!(linear[0].feature_ids, vec![1, 2, 3, 4]);
    assert!((linear[0].spacing.unwrap() - 20.0).abs() < 1e-9);

    for feature in &report.features {
        assert_eq!(feature.pattern_id, Some(linear[0].id));
        assert!((feature.center.z - 20.0).abs() < 1e-9);
    }
}

#[test]
fn test_composite_part_feature_mix() {
    let report = run_default(&composite_part());

    assert_eq!(count(&report, FeatureType::HoleThrough), 4);
    assert_eq!(count(&report, FeatureType::HoleBlind), 1);
    assert!(count(&report, FeatureType::PocketRectangular) >= 1);
    assert!(count(&report, FeatureType::FacePlanar) >= 1);

    let blind = report
        .features
        .iter()
        .find(|f| f.feature_type == FeatureType::HoleBlind)
        .unwrap();
    assert_eq!(blind.dimensions.diameter, Some(10.0));
    assert!((blind.dimensions.depth.unwrap() - 12.0).abs() < 1e-9);
}

#[test]
fn test_composite_part_refinement_passes() {
    let report = run_default(&composite_part());

    for hole in report
        .features
        .iter()
        .filter(|f| f.feature_type == FeatureType::HoleThrough)
    {
        let classification = report
            .classifications
            .iter()
            .find(|c| c.feature_id == hole.id)
            .unwrap();
        assert_eq!(classification.primary_classification, FeatureClass::Hole);

        let score = &report.machinability[&hole.id];
        assert!(score
            .factors
            .iter()
            .any(|f| f == "Deep feature (L/D > 3)"));
    }

    assert_eq!(report.machinability.len(), report.features.len());
    assert_eq!(report.graph.nodes.len(), report.features.len());
    assert_eq!(report.graph.edges.len(), report.relationships.len());
    assert_eq!(report.summary.feature_count, report.features.len());
    assert_eq!(report.summary.features_by_type.get("hole-through"), Some(&4));
}

#[test]
fn test_composite_part_decisions_volume_and_access() {
    let report = run_default(&composite_part());
    let n = report.features.len();
    assert_eq!(report.decisions.len(), n);
    assert_eq!(report.volume_classes.len(), n);
    assert_eq!(report.accessibility.len(), n);

    for feature in &report.features {
        let decision = &report.decisions[&feature.id];
        match feature.feature_type {
            FeatureType::HoleThrough | FeatureType::HoleBlind => {
                assert_eq!(report.volume_classes[&feature.id], VolumeClass::Subtractive);
                assert_eq!(decision.criteria_scores.get(&Criterion::Cylindrical), Some(&1.0));
                // cylindrical plus medium area at the default weight: 0.495
                assert_eq!(decision.criteria_scores.get(&Criterion::Large), Some(&0.5));
                assert!((decision.weighted_score - 0.495).abs() < 1e-9);
                assert_eq!(decision.decision, Decision::Uncertain);
            }
            FeatureType::PocketRectangular => {
                assert_eq!(report.volume_classes[&feature.id], VolumeClass::Subtractive);
            }
            _ => {}
        }
        if feature.feature_type == FeatureType::HoleThrough {
            let access = report.accessibility[&feature.id];
            assert_eq!(access.approach, Accessibility::Top);
            assert!(!access.requires_special_tool);
            assert_eq!(access.recommended_tool_angle, 0.0);
        }
    }
}

#[test]
fn test_criteria_weights_accept_cylindrical_features() {
    let mut weights = CriteriaWeights::new();
    weights.insert(Criterion::Cylindrical, 1.0);
    let pipeline = RecognitionPipeline::new(RecognitionConfig::default())
        .unwrap()
        .with_criteria_weights(weights);

    let report = pipeline.run(&drilled_plate());
    let holes: Vec<_> = report
        .features
        .iter()
        .filter(|f| f.feature_type == FeatureType::HoleThrough)
        .collect();
    assert_eq!(holes.len(), 4);
    for hole in holes {
        let decision = &report.decisions[&hole.id];
        assert_eq!(decision.decision, Decision::Accept);
        assert!((decision.weighted_score - 1.165).abs() < 1e-9);
    }
}

#[test]
fn test_scaled_axis_in_snapshot_file_keeps_hole_depth() {
    let shape = composite_part();
    let mut scaled = shape.clone();
    for face in &mut scaled.faces {
        if let SurfaceKind::Cylinder { axis, radius } = &mut face.surface {
            if *radius == 5.0 {
                axis.direction *= 2.0;
            }
        }
    }

    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("scaled.json");
    scaled.save_to_file(&path).unwrap();

    let pipeline = RecognitionPipeline::new(RecognitionConfig::default()).unwrap();
    let report = pipeline.run_snapshot_file(&path).unwrap();
    let blind = report
        .features
        .iter()
        .find(|f| f.feature_type == FeatureType::HoleBlind)
        .unwrap();
    assert!((blind.dimensions.depth.unwrap() - 12.0).abs() < 1e-9);
    assert_eq!(report.features, pipeline.run(&shape).features);
}

#[test]
fn test_bottom_face_is_reported_as_undercut() {
    let report = run_default(&composite_part());
    assert!(report.analysis.has_undercuts);
    assert!(report.analysis.accessibility_score < 1.0);
}

#[test]
fn test_snapshot_file_matches_in_memory_run() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("composite.json");
    let shape = composite_part();
    shape.save_to_file(&path).unwrap();

    let pipeline = RecognitionPipeline::new(RecognitionConfig::default()).unwrap();
    let from_file = pipeline.run_snapshot_file(&path).unwrap();
    assert_eq!(from_file, pipeline.run(&shape));
}

#[test]
fn test_report_serializes_to_json() {
    let report = run_default(&composite_part());
    let json = report.to_json(true).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();

    assert!(value["features"].is_array());
    assert_eq!(value["features"][0]["feature_type"], "hole-through");
    assert!(value["summary"]["feature_count"].as_u64().unwrap() >= 6);
}
