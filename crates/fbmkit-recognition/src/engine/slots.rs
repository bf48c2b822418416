//! Slot, T-slot and circular groove detectors

use super::pockets::{pocket_candidates, PocketCandidate};
use super::{DetectionContext, FeatureDetector};
use crate::feature::{
    Dimensions, Feature, FeatureGeometry, FeatureIdAllocator, FeatureType, ToleranceClass,
};
use fbmkit_core::SurfaceKind;

/// Elongated recessed floors
#[derive(Debug, Clone, Copy, Default)]
pub struct SlotDetector;

impl FeatureDetector for SlotDetector {
    fn name(&self) -> &str {
        "slots"
    }

    fn description(&self) -> &str {
        "Recessed floors at least three times longer than wide"
    }

    fn detect(&self, ctx: &DetectionContext<'_>, ids: &FeatureIdAllocator) -> Vec<Feature> {
        let s = ctx.detection();
        pocket_candidates(ctx)
            .into_iter()
            .filter(|p| p.is_slot(s))
            .map(|p| {
                Feature::new(
                    ids.next_id(),
                    FeatureType::Slot,
                    FeatureGeometry::Pocket {
                        floor: Some(p.floor.face),
                        walls: Vec::new(),
                        floor_z: p.floor.z,
                    },
                    p.center(),
                    p.bounds(),
                )
                .with_dimensions(p.dimensions())
                .with_orientation(p.orientation(), ctx.accessibility(&p.orientation()))
                .with_confidence(0.8)
                .with_complexity(4)
                .with_note(format!("Slot width {:.1}mm - match cutter diameter", p.width))
            })
            .collect()
    }
}

/// A narrow neck floor sitting over a wider head floor
#[derive(Debug, Clone, Copy, Default)]
pub struct TSlotDetector;

impl TSlotDetector {
    fn pairs(ctx: &DetectionContext<'_>) -> Vec<(PocketCandidate, PocketCandidate)> {
        let s = ctx.detection();
        let candidates = pocket_candidates(ctx);
        let mut pairs = Vec::new();

        for (i, a) in candidates.iter().enumerate() {
            for b in candidates.iter().skip(i + 1) {
                let (neck, head) = if a.width <= b.width { (a, b) } else { (b, a) };
                if neck.width <= 0.0 {
                    continue;
                }
                let ratio = head.width / neck.width;
                if ratio > s.t_slot_min_ratio
                    && ratio < s.t_slot_max_ratio
                    && neck.floor.bounds.overlaps_xy(&head.floor.bounds)
                {
                    pairs.push((*neck, *head));
                    break;
                }
            }
        }
        pairs
    }
}

impl FeatureDetector for TSlotDetector {
    fn name(&self) -> &str {
        "t_slots"
    }

    fn description(&self) -> &str {
        "Overlapping narrow and wide floors forming a T-slot"
    }

    fn detect(&self, ctx: &DetectionContext<'_>, ids: &FeatureIdAllocator) -> Vec<Feature> {
        Self::pairs(ctx)
            .into_iter()
            .map(|(neck, head)| {
                let depth = neck.depth.max(head.depth);
                Feature::new(
                    ids.next_id(),
                    FeatureType::TSlot,
                    FeatureGeometry::TSlot {
                        neck: neck.floor.face,
                        head: head.floor.face,
                        neck_width: neck.width,
                        head_width: head.width,
                    },
                    neck.center(),
                    neck.bounds().union(&head.bounds()),
                )
                .with_dimensions(Dimensions {
                    width: Some(neck.width),
                    length: Some(neck.length.max(head.length)),
                    depth: Some(depth),
                    ..Dimensions::default()
                })
                .with_orientation(neck.orientation(), ctx.accessibility(&neck.orientation()))
                .with_confidence(0.8)
                .with_complexity(7)
                .with_note("T-slot requires special T-slot cutter")
                .with_note("Mill narrow slot first, then widen bottom with T-cutter")
            })
            .collect()
    }
}

/// Toroidal faces with a small minor radius, e.g. O-ring grooves
#[derive(Debug, Clone, Copy, Default)]
pub struct GrooveDetector;

impl FeatureDetector for GrooveDetector {
    fn name(&self) -> &str {
        "grooves"
    }

    fn description(&self) -> &str {
        "Toroidal faces as circular grooves"
    }

    fn detect(&self, ctx: &DetectionContext<'_>, ids: &FeatureIdAllocator) -> Vec<Feature> {
        let max_minor = ctx.detection().groove_max_minor_radius;
        ctx.faces
            .iter()
            .filter_map(|f| match f.surface {
                SurfaceKind::Torus {
                    axis,
                    major_radius,
                    minor_radius,
                } if minor_radius > 0.0 && minor_radius < max_minor => Some(
                    Feature::new(
                        ids.next_id(),
                        FeatureType::GrooveCircular,
                        FeatureGeometry::Groove {
                            face: f.id,
                            axis,
                            major_radius,
                            minor_radius,
                        },
                        axis.origin,
                        f.bounds,
                    )
                    .with_dimensions(Dimensions {
                        diameter: Some(2.0 * major_radius),
                        width: Some(2.0 * minor_radius),
                        depth: Some(minor_radius),
                        area: Some(f.area),
                        ..Dimensions::default()
                    })
                    .with_orientation(axis.direction, ctx.accessibility(&axis.direction))
                    .with_tolerance(ToleranceClass::Tight)
                    .with_confidence(0.9)
                    .with_complexity(7)
                    .with_note(format!(
                        "O-ring groove Ø{:.1}mm, {:.1}mm wide",
                        2.0 * major_radius,
                        2.0 * minor_radius
                    ))
                    .with_note("Requires form tool or special grooving operation"),
                ),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fbmkit_core::{z_axis, Axis, Point3D, ShapeBuilder, ShapeSnapshot, TopologyAccessor};
    use fbmkit_settings::RecognitionConfig;

    fn run(detector: &dyn FeatureDetector, shape: &ShapeSnapshot) -> Vec<Feature> {
        let config = RecognitionConfig::default();
        let ctx = DetectionContext::new(&shape.faces, &shape.edges, shape.bounding_box(), &config);
        detector.detect(&ctx, &FeatureIdAllocator::new())
    }

    fn block() -> ShapeBuilder {
        let mut b = ShapeBuilder::new();
        b.block(Point3D::new(0.0, 0.0, 0.0), Point3D::new(100.0, 60.0, 20.0));
        b
    }

    #[test]
    fn test_slot() {
        let mut b = block();
        b.horizontal_rect((10.0, 10.0), (70.0, 18.0), 14.0, true);
        let features = run(&SlotDetector, &b.build());

        assert_eq!(features.len(), 1);
        assert_eq!(features[0].feature_type, FeatureType::Slot);
        assert_eq!(features[0].dimensions.width, Some(8.0));
        assert_eq!(features[0].dimensions.length, Some(60.0));
        assert_eq!(features[0].dimensions.depth, Some(6.0));
    }

    #[test]
    fn test_t_slot() {
        let mut b = block();
        let neck = b.horizontal_rect((20.0, 26.0), (70.0, 34.0), 14.0, true);
        let head = b.horizontal_rect((20.0, 22.0), (70.0, 38.0), 6.0, true);
        let features = run(&TSlotDetector, &b.build());

        assert_eq!(features.len(), 1);
        match &features[0].geometry {
            FeatureGeometry::TSlot {
                neck: n,
                head: h,
                neck_width,
                head_width,
            } => {
                assert_eq!((*n, *h), (neck, head));
                assert_eq!(*neck_width, 8.0);
                assert_eq!(*head_width, 16.0);
            }
            other => panic!("unexpected geometry {:?}", other),
        }
        assert_eq!(features[0].dimensions.depth, Some(14.0));
    }

    #[test]
    fn test_disjoint_floors_are_not_a_t_slot() {
        let mut b = block();
        b.horizontal_rect((10.0, 5.0), (60.0, 13.0), 14.0, true);
        b.horizontal_rect((10.0, 30.0), (60.0, 46.0), 6.0, true);
        assert!(run(&TSlotDetector, &b.build()).is_empty());
    }

    #[test]
    fn test_groove() {
        let mut b = block();
        b.torus(
            Axis::new(Point3D::new(50.0, 30.0, 18.0), z_axis()),
            15.0,
            1.5,
        );
        b.torus(Axis::new(Point3D::new(20.0, 30.0, 18.0), z_axis()), 15.0, 6.0);
        let features = run(&GrooveDetector, &b.build());

        assert_eq!(features.len(), 1);
        let f = &features[0];
        assert_eq!(f.dimensions.diameter, Some(30.0));
        assert_eq!(f.dimensions.width, Some(3.0));
        assert!(f.tolerance.is_tight());
    }
}
