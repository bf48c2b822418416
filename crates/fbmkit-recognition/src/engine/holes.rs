//! Hole detectors: plain, threaded, counterbored and countersunk holes.
//!
//! Holes are concave (reversed) cylindrical faces covering more than a
//! fillet's sweep. A hole that spans the whole shape along its axis is a
//! through hole; anything shallower than the review ratio is handed to the
//! fuzzy classifier and may come out as a circular pocket instead.

use super::{axial_span, cylinder_faces, CylinderFace, DetectionContext, FeatureDetector};
use crate::classifier::{FeatureClass, FeatureClassifier, FeatureProperties};
use crate::feature::{
    Dimensions, Feature, FeatureGeometry, FeatureIdAllocator, FeatureType, ToleranceClass,
};
use fbmkit_core::{CurveKind, EdgeId, FaceId, Point3D, SurfaceKind, Vector3D};
use std::f64::consts::PI;

const METRIC_THREADS: [(f64, f64, &str); 7] = [
    (3.0, 0.5, "M3x0.5"),
    (4.0, 0.7, "M4x0.7"),
    (5.0, 0.8, "M5x0.8"),
    (6.0, 1.0, "M6x1.0"),
    (8.0, 1.25, "M8x1.25"),
    (10.0, 1.5, "M10x1.5"),
    (12.0, 1.75, "M12x1.75"),
];

/// Metric designation for a thread, e.g. `M6x1.0`.
///
/// Matches the coarse-pitch table within 0.5mm diameter and 0.2mm pitch,
/// otherwise formats the measured values.
pub fn thread_designation(diameter: f64, pitch: f64) -> String {
    METRIC_THREADS
        .iter()
        .find(|(d, p, _)| (diameter - d).abs() < 0.5 && (pitch - p).abs() < 0.2)
        .map(|(_, _, name)| name.to_string())
        .unwrap_or_else(|| format!("M{:.0}x{:.1}", diameter, pitch))
}

/// Where a bore opens to the outside
struct Opening {
    point: Point3D,
    direction: Vector3D,
    through: bool,
}

/// A bore spanning the shape along its axis is through and opens upward;
/// otherwise it opens at the end nearer the shape boundary.
fn opening_of(ctx: &DetectionContext<'_>, cyl: &CylinderFace) -> Opening {
    let d = cyl.axis.direction;
    match ctx.shape_span(&cyl.axis) {
        Some((s_min, s_max)) => {
            let through =
                cyl.length() >= (s_max - s_min) - ctx.detection().through_hole_tolerance;
            if through {
                let (point, direction) = cyl.upper_end();
                return Opening {
                    point,
                    direction,
                    through,
                };
            }
            if s_max - cyl.t_max <= cyl.t_min - s_min {
                Opening {
                    point: cyl.point_at(cyl.t_max),
                    direction: d,
                    through,
                }
            } else {
                Opening {
                    point: cyl.point_at(cyl.t_min),
                    direction: -d,
                    through,
                }
            }
        }
        None => {
            let (point, direction) = cyl.upper_end();
            Opening {
                point,
                direction,
                through: false,
            }
        }
    }
}

/// Concave cylinders that are not fillets
fn bores(ctx: &DetectionContext<'_>) -> Vec<CylinderFace> {
    let max_sweep = ctx.detection().fillet_max_sweep;
    cylinder_faces(ctx.faces)
        .into_iter()
        .filter(|c| c.reversed && c.sweep() > max_sweep)
        .collect()
}

fn is_off_principal(direction: &Vector3D, alignment: f64) -> bool {
    direction.abs().max() < alignment
}

struct ThreadInfo {
    pitch: f64,
    major_diameter: f64,
    edges: Vec<EdgeId>,
}

/// A helical edge around the bore, or a run of equal circular edges at a
/// regular axial pitch
fn thread_of(ctx: &DetectionContext<'_>, cyl: &CylinderFace) -> Option<ThreadInfo> {
    let s = ctx.detection();
    let near_radius = |r: f64| r >= 0.5 * cyl.radius && r <= 1.5 * cyl.radius;

    for edge in ctx.edges {
        if let CurveKind::Helix {
            axis, radius, pitch, ..
        } = edge.curve
        {
            if pitch > 0.0
                && near_radius(radius)
                && cyl.axis.is_coaxial(&axis, s.coaxial_min_dot, s.coaxial_max_offset)
            {
                return Some(ThreadInfo {
                    pitch,
                    major_diameter: 2.0 * radius,
                    edges: vec![edge.id],
                });
            }
        }
    }

    let slack = s.coaxial_max_offset;
    let mut rings: Vec<(EdgeId, f64, f64)> = ctx
        .edges
        .iter()
        .filter_map(|edge| match edge.curve {
            CurveKind::Circle { axis, radius }
                if near_radius(radius)
                    && cyl.axis.is_coaxial(&axis, s.coaxial_min_dot, s.coaxial_max_offset) =>
            {
                let t = cyl.axis.parameter_of(&axis.origin);
                (t >= cyl.t_min - slack && t <= cyl.t_max + slack).then_some((edge.id, radius, t))
            }
            _ => None,
        })
        .collect();
    if rings.len() < s.thread_min_rings {
        return None;
    }
    rings.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.2.total_cmp(&b.2)));

    // runs of equal radius, each checked for a regular pitch
    let mut start = 0;
    while start < rings.len() {
        let radius = rings[start].1;
        let end = rings[start..]
            .iter()
            .position(|r| (r.1 - radius).abs() > 0.01)
            .map_or(rings.len(), |offset| start + offset);
        let run = &rings[start..end];
        if run.len() >= s.thread_min_rings {
            let spacings: Vec<f64> = run.windows(2).map(|w| w[1].2 - w[0].2).collect();
            let mean = spacings.iter().sum::<f64>() / spacings.len() as f64;
            let regular = spacings.iter().all(|sp| (sp - mean).abs() <= 0.1 * mean);
            if mean > 0.0 && mean <= s.thread_max_pitch && regular {
                return Some(ThreadInfo {
                    pitch: mean,
                    major_diameter: 2.0 * radius,
                    edges: run.iter().map(|r| r.0).collect(),
                });
            }
        }
        start = end;
    }
    None
}

/// Upward planar face closing the bottom of a bore
fn floor_of(ctx: &DetectionContext<'_>, cyl: &CylinderFace, opening: &Opening) -> Option<FaceId> {
    let bottom_t = if opening.direction.dot(&cyl.axis.direction) > 0.0 {
        cyl.t_min
    } else {
        cyl.t_max
    };
    ctx.faces
        .iter()
        .find(|f| {
            f.plane_normal().is_some_and(|n| n.dot(&opening.direction) > 0.9)
                && cyl.axis.distance_to_point(&f.bounds.center()) < cyl.radius
                && (cyl.axis.parameter_of(&f.bounds.center()) - bottom_t).abs() < 0.01
        })
        .map(|f| f.id)
}

/// Through, blind and threaded holes
#[derive(Debug, Clone, Copy, Default)]
pub struct HoleDetector;

impl FeatureDetector for HoleDetector {
    fn name(&self) -> &str {
        "holes"
    }

    fn description(&self) -> &str {
        "Concave cylinders as through, blind and threaded holes"
    }

    fn detect(&self, ctx: &DetectionContext<'_>, ids: &FeatureIdAllocator) -> Vec<Feature> {
        let s = ctx.detection();
        let classifier = FeatureClassifier::new(ctx.config.classification.clone());
        let mut features = Vec::new();

        for cyl in bores(ctx) {
            let diameter = cyl.diameter();
            let depth = cyl.length();
            let ratio = depth / diameter;
            if ratio > s.hole_max_aspect_ratio {
                tracing::warn!(
                    "Skipping {}: depth/diameter {:.1} exceeds {:.1}",
                    cyl.face,
                    ratio,
                    s.hole_max_aspect_ratio
                );
                continue;
            }

            let opening = opening_of(ctx, &cyl);
            let accessibility = ctx.accessibility(&opening.direction);

            if ratio < s.hole_review_aspect_ratio {
                let review = classifier.fuzzy_classify(&FeatureProperties::new(0, depth, diameter));
                if review.primary_classification == FeatureClass::Pocket {
                    let floor = floor_of(ctx, &cyl, &opening);
                    let floor_z = cyl.point_at(cyl.t_min).z.min(cyl.point_at(cyl.t_max).z);
                    let area = PI * cyl.radius * cyl.radius;
                    features.push(
                        Feature::new(
                            ids.next_id(),
                            FeatureType::PocketCircular,
                            FeatureGeometry::Pocket {
                                floor,
                                walls: vec![cyl.face],
                                floor_z,
                            },
                            opening.point,
                            cyl.bounds,
                        )
                        .with_dimensions(Dimensions {
                            diameter: Some(diameter),
                            depth: Some(depth),
                            width: Some(diameter),
                            length: Some(diameter),
                            area: Some(area),
                            volume: Some(area * depth),
                            ..Dimensions::default()
                        })
                        .with_orientation(opening.direction, accessibility)
                        .with_confidence(0.6 + 0.2 * review.confidence)
                        .with_complexity(3)
                        .with_note(format!(
                            "Circular pocket Ø{:.1}mm x {:.1}mm deep - helical interpolation",
                            diameter, depth
                        )),
                    );
                    continue;
                }
            }

            let off_axis = is_off_principal(&cyl.axis.direction, s.principal_axis_alignment);
            let dimensions = Dimensions {
                diameter: Some(diameter),
                depth: Some(depth),
                area: Some(cyl.area),
                volume: Some(PI * cyl.radius * cyl.radius * depth),
                ..Dimensions::default()
            };

            let mut feature = match thread_of(ctx, &cyl) {
                Some(thread) => {
                    let designation = thread_designation(thread.major_diameter, thread.pitch);
                    let note = format!("Tap {} to {:.1}mm", designation, depth);
                    Feature::new(
                        ids.next_id(),
                        FeatureType::HoleThreaded,
                        FeatureGeometry::ThreadedHole {
                            face: cyl.face,
                            axis: cyl.axis,
                            radius: cyl.radius,
                            pitch: thread.pitch,
                            designation,
                            thread_edges: thread.edges,
                        },
                        opening.point,
                        cyl.bounds,
                    )
                    .with_confidence(0.85)
                    .with_complexity(6)
                    .with_tolerance(ToleranceClass::Precision)
                    .with_note(note)
                    .with_note("Drill tap size, then tap or thread mill")
                }
                None if opening.through => Feature::new(
                    ids.next_id(),
                    FeatureType::HoleThrough,
                    FeatureGeometry::Hole {
                        face: cyl.face,
                        axis: cyl.axis,
                        radius: cyl.radius,
                        through: true,
                    },
                    opening.point,
                    cyl.bounds,
                )
                .with_confidence(0.9)
                .with_complexity(2)
                .with_note(format!("Drill through Ø{:.1}mm", diameter)),
                None => Feature::new(
                    ids.next_id(),
                    FeatureType::HoleBlind,
                    FeatureGeometry::Hole {
                        face: cyl.face,
                        axis: cyl.axis,
                        radius: cyl.radius,
                        through: false,
                    },
                    opening.point,
                    cyl.bounds,
                )
                .with_confidence(0.85)
                .with_complexity(3)
                .with_note(format!(
                    "Blind hole Ø{:.1}mm x {:.1}mm deep",
                    diameter, depth
                )),
            }
            .with_dimensions(dimensions)
            .with_orientation(opening.direction, accessibility);

            if off_axis {
                let confidence = feature.confidence - 0.1;
                feature = feature
                    .with_confidence(confidence)
                    .with_note("Off-axis hole - requires angled setup");
            }
            if ratio > 5.0 {
                feature = feature.with_risk(format!(
                    "Deep hole (L/D {:.1}) - peck drilling required",
                    ratio
                ));
            }
            features.push(feature);
        }

        features
    }
}

/// Two coaxial bores whose radii differ past the step threshold
#[derive(Debug, Clone, Copy, Default)]
pub struct CounterboreDetector;

impl FeatureDetector for CounterboreDetector {
    fn name(&self) -> &str {
        "counterbores"
    }

    fn description(&self) -> &str {
        "Coaxial stepped bores as counterbore holes"
    }

    fn detect(&self, ctx: &DetectionContext<'_>, ids: &FeatureIdAllocator) -> Vec<Feature> {
        let s = ctx.detection();
        let cylinders = bores(ctx);
        let mut features = Vec::new();

        for (i, a) in cylinders.iter().enumerate() {
            for b in &cylinders[i + 1..] {
                if !a.axis.is_coaxial(&b.axis, s.coaxial_min_dot, s.coaxial_max_offset)
                    || (a.radius - b.radius).abs() <= s.counterbore_min_radius_delta
                {
                    continue;
                }
                let (bore, shoulder) = if a.radius < b.radius { (a, b) } else { (b, a) };

                // total depth measured along the shoulder's axis
                let params = [
                    shoulder.t_min,
                    shoulder.t_max,
                    shoulder.axis.parameter_of(&bore.point_at(bore.t_min)),
                    shoulder.axis.parameter_of(&bore.point_at(bore.t_max)),
                ];
                let lo = params.iter().copied().fold(f64::INFINITY, f64::min);
                let hi = params.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                let depth = hi - lo;

                let opening = opening_of(ctx, shoulder);
                features.push(
                    Feature::new(
                        ids.next_id(),
                        FeatureType::HoleCounterbore,
                        FeatureGeometry::Counterbore {
                            bore: bore.face,
                            shoulder: shoulder.face,
                            axis: shoulder.axis,
                            bore_radius: bore.radius,
                            shoulder_radius: shoulder.radius,
                            shoulder_depth: shoulder.length(),
                        },
                        opening.point,
                        bore.bounds.union(&shoulder.bounds),
                    )
                    .with_dimensions(Dimensions {
                        diameter: Some(bore.diameter()),
                        depth: Some(depth),
                        width: Some(shoulder.diameter()),
                        area: Some(bore.area + shoulder.area),
                        ..Dimensions::default()
                    })
                    .with_orientation(opening.direction, ctx.accessibility(&opening.direction))
                    .with_confidence(0.9)
                    .with_complexity(4)
                    .with_note("Two-step drilling operation required")
                    .with_note(format!(
                        "Counterbore Ø{:.1}mm x {:.1}mm over Ø{:.1}mm",
                        shoulder.diameter(),
                        shoulder.length(),
                        bore.diameter()
                    )),
                );
                break;
            }
        }

        features
    }
}

/// Conical faces with a standard countersink angle
#[derive(Debug, Clone, Copy, Default)]
pub struct CountersinkDetector;

impl FeatureDetector for CountersinkDetector {
    fn name(&self) -> &str {
        "countersinks"
    }

    fn description(&self) -> &str {
        "Conical faces with a 75-125 degree included angle"
    }

    fn detect(&self, ctx: &DetectionContext<'_>, ids: &FeatureIdAllocator) -> Vec<Feature> {
        let s = ctx.detection();
        let mut features = Vec::new();

        for face in ctx.faces {
            let SurfaceKind::Cone {
                axis,
                ref_radius,
                semi_angle,
            } = face.surface
            else {
                continue;
            };
            let sink_angle = 2.0 * semi_angle.to_degrees().abs();
            if !(sink_angle > s.countersink_min_angle && sink_angle < s.countersink_max_angle) {
                continue;
            }
            if !(ref_radius.is_finite() && ref_radius >= 0.0) {
                tracing::warn!("Skipping {}: cone radius {} is degenerate", face.id, ref_radius);
                continue;
            }

            let (t_min, t_max) = axial_span(&face.bounds, &axis, ref_radius);
            let radius_at = |t: f64| (ref_radius + t * semi_angle.tan()).abs();
            let (t_open, direction) = if radius_at(t_max) >= radius_at(t_min) {
                (t_max, axis.direction)
            } else {
                (t_min, -axis.direction)
            };
            let outer_radius = radius_at(t_open);
            let center = axis.origin + axis.direction * t_open;

            features.push(
                Feature::new(
                    ids.next_id(),
                    FeatureType::HoleCountersink,
                    FeatureGeometry::Countersink {
                        face: face.id,
                        axis,
                        ref_radius,
                        outer_radius,
                        sink_angle,
                    },
                    center,
                    face.bounds,
                )
                .with_dimensions(Dimensions {
                    diameter: Some(2.0 * ref_radius),
                    depth: Some(t_max - t_min),
                    width: Some(2.0 * outer_radius),
                    area: Some(face.area),
                    ..Dimensions::default()
                })
                .with_orientation(direction, ctx.accessibility(&direction))
                .with_confidence(0.95)
                .with_complexity(3)
                .with_note(format!("Countersink at {:.0}°", sink_angle)),
            );
        }

        features
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::Accessibility;
    use fbmkit_core::{z_axis, Axis, ShapeBuilder, ShapeSnapshot};
    use fbmkit_settings::RecognitionConfig;

    fn run(detector: &dyn FeatureDetector, shape: &ShapeSnapshot) -> Vec<Feature> {
        let config = RecognitionConfig::default();
        let bounds = fbmkit_core::TopologyAccessor::bounding_box(shape);
        let ctx = DetectionContext::new(&shape.faces, &shape.edges, bounds, &config);
        detector.detect(&ctx, &FeatureIdAllocator::new())
    }

    fn plate() -> ShapeBuilder {
        let mut b = ShapeBuilder::new();
        b.block(Point3D::new(0.0, 0.0, 0.0), Point3D::new(100.0, 60.0, 20.0));
        b
    }

    #[test]
    fn test_thread_designation() {
        assert_eq!(thread_designation(6.0, 1.0), "M6x1.0");
        assert_eq!(thread_designation(8.2, 1.3), "M8x1.25");
        assert_eq!(thread_designation(7.0, 1.0), "M7x1.0");
    }

    #[test]
    fn test_through_and_blind() {
        let mut b = plate();
        b.hole(Point3D::new(20.0, 20.0, 20.0), 4.0, 20.0);
        b.hole(Point3D::new(60.0, 20.0, 20.0), 3.0, 12.0);
        let features = run(&HoleDetector, &b.build());

        assert_eq!(features.len(), 2);
        assert_eq!(features[0].feature_type, FeatureType::HoleThrough);
        assert_eq!(features[0].dimensions.diameter, Some(8.0));
        assert_eq!(features[1].feature_type, FeatureType::HoleBlind);
        assert!((features[1].center.z - 20.0).abs() < 1e-9);
        assert_eq!(features[1].accessibility, Accessibility::Top);
        assert_eq!(features[1].orientation, z_axis());
    }

    #[test]
    fn test_hole_drilled_from_below() {
        let mut b = plate();
        b.cylinder(
            Axis::new(Point3D::new(50.0, 30.0, 0.0), z_axis()),
            3.0,
            8.0,
            fbmkit_core::Orientation::Reversed,
        );
        let features = run(&HoleDetector, &b.build());
        assert_eq!(features.len(), 1);
        assert_eq!(features[0].feature_type, FeatureType::HoleBlind);
        assert_eq!(features[0].accessibility, Accessibility::Bottom);
        assert!(features[0].center.z.abs() < 1e-9);
    }

    #[test]
    fn test_shallow_bore_becomes_circular_pocket() {
        let mut b = plate();
        b.hole(Point3D::new(50.0, 30.0, 20.0), 15.0, 4.0);
        b.horizontal_disc((50.0, 30.0), 15.0, 16.0, true);
        let features = run(&HoleDetector, &b.build());

        assert_eq!(features.len(), 1);
        assert_eq!(features[0].feature_type, FeatureType::PocketCircular);
        match &features[0].geometry {
            FeatureGeometry::Pocket { floor, walls, .. } => {
                assert_eq!(*floor, Some(FaceId(7)));
                assert_eq!(walls, &vec![FaceId(6)]);
            }
            other => panic!("unexpected geometry {:?}", other),
        }
    }

    #[test]
    fn test_threaded_by_helix() {
        let mut b = plate();
        b.hole(Point3D::new(30.0, 30.0, 20.0), 2.5, 12.0);
        b.helix_edge(Axis::new(Point3D::new(30.0, 30.0, 8.0), z_axis()), 3.0, 1.0, 12.0);
        let features = run(&HoleDetector, &b.build());

        assert_eq!(features.len(), 1);
        assert_eq!(features[0].feature_type, FeatureType::HoleThreaded);
        match &features[0].geometry {
            FeatureGeometry::ThreadedHole { designation, pitch, .. } => {
                assert_eq!(designation, "M6x1.0");
                assert_eq!(*pitch, 1.0);
            }
            other => panic!("unexpected geometry {:?}", other),
        }
        assert_eq!(features[0].tolerance, ToleranceClass::Precision);
    }

    #[test]
    fn test_threaded_by_rings() {
        let mut b = plate();
        b.hole(Point3D::new(30.0, 30.0, 20.0), 3.4, 10.0);
        for i in 0..6 {
            let z = 11.0 + 1.25 * i as f64;
            b.circle_edge(Axis::new(Point3D::new(30.0, 30.0, z), z_axis()), 4.0);
        }
        let features = run(&HoleDetector, &b.build());
        match &features[0].geometry {
            FeatureGeometry::ThreadedHole {
                designation,
                thread_edges,
                ..
            } => {
                assert_eq!(designation, "M8x1.25");
                assert_eq!(thread_edges.len(), 6);
            }
            other => panic!("unexpected geometry {:?}", other),
        }
    }

    #[test]
    fn test_irregular_rings_are_not_a_thread() {
        let mut b = plate();
        b.hole(Point3D::new(30.0, 30.0, 20.0), 3.4, 10.0);
        for z in [11.0, 12.0, 15.0, 16.0] {
            b.circle_edge(Axis::new(Point3D::new(30.0, 30.0, z), z_axis()), 4.0);
        }
        let features = run(&HoleDetector, &b.build());
        assert_eq!(features[0].feature_type, FeatureType::HoleBlind);
    }

    #[test]
    fn test_counterbore() {
        let mut b = plate();
        b.hole(Point3D::new(50.0, 30.0, 14.0), 3.0, 14.0);
        b.hole(Point3D::new(50.0, 30.0, 20.0), 5.5, 6.0);
        let features = run(&CounterboreDetector, &b.build());

        assert_eq!(features.len(), 1);
        let f = &features[0];
        assert_eq!(f.feature_type, FeatureType::HoleCounterbore);
        assert_eq!(f.dimensions.diameter, Some(6.0));
        assert_eq!(f.dimensions.width, Some(11.0));
        assert!((f.dimensions.depth.unwrap_or_default() - 20.0).abs() < 1e-9);
        match f.geometry {
            FeatureGeometry::Counterbore { shoulder_depth, .. } => {
                assert!((shoulder_depth - 6.0).abs() < 1e-9)
            }
            ref other => panic!("unexpected geometry {:?}", other),
        }
    }

    #[test]
    fn test_parallel_but_offset_bores_are_not_counterbores() {
        let mut b = plate();
        b.hole(Point3D::new(20.0, 30.0, 20.0), 3.0, 10.0);
        b.hole(Point3D::new(40.0, 30.0, 20.0), 6.0, 10.0);
        assert!(run(&CounterboreDetector, &b.build()).is_empty());
    }

    #[test]
    fn test_countersink_angles() {
        let mut b = plate();
        b.countersink(Point3D::new(20.0, 20.0, 20.0), 3.0, 90.0, 2.0);
        b.countersink(Point3D::new(40.0, 20.0, 20.0), 3.0, 60.0, 2.0);
        b.countersink(Point3D::new(60.0, 20.0, 20.0), 3.0, 120.0, 1.0);
        let features = run(&CountersinkDetector, &b.build());

        assert_eq!(features.len(), 2);
        assert_eq!(features[0].dimensions.diameter, Some(6.0));
        assert!((features[0].dimensions.width.unwrap_or_default() - 10.0).abs() < 1e-9);
        assert!((features[0].center.z - 20.0).abs() < 1e-9);
        assert_eq!(features[0].accessibility, Accessibility::Top);
        assert!(features[1].manufacturing_notes[0].contains("120"));
    }
}
