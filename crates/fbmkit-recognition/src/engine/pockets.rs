//! Pocket detectors: plain, multi-level and island pockets.
//!
//! Pockets start from upward planar faces too small to be a base face that sit
//! more than the raise threshold below the base face above them. Faces that
//! close off a bore are left to the hole detector.

use super::{
    caps_cylinder, cylinder_faces, reference_base, split_base_faces, upward_planar_faces,
    CylinderFace, DetectionContext, FeatureDetector, PlanarFace,
};
use crate::feature::{Dimensions, Feature, FeatureGeometry, FeatureIdAllocator, FeatureType};
use fbmkit_core::{BoundingBox, FaceId, Point3D, Vector3D};
use fbmkit_settings::DetectionSettings;

const FOOTPRINT_TOLERANCE: f64 = 0.01;

/// A recessed floor and the base face it is measured from
#[derive(Debug, Clone, Copy)]
pub(crate) struct PocketCandidate {
    pub floor: PlanarFace,
    pub base: PlanarFace,
    pub depth: f64,
    pub width: f64,
    pub length: f64,
}

impl PocketCandidate {
    pub fn aspect_ratio(&self) -> f64 {
        self.floor.aspect_ratio()
    }

    pub fn is_slot(&self, s: &DetectionSettings) -> bool {
        self.aspect_ratio() >= s.slot_aspect_ratio
    }

    pub fn is_circular(&self, s: &DetectionSettings) -> bool {
        self.aspect_ratio() < s.circular_aspect_ratio
    }

    /// Floor footprint extruded up to the base
    pub fn bounds(&self) -> BoundingBox {
        self.floor.bounds.union(&BoundingBox::new(
            self.floor.bounds.min,
            Point3D::new(self.floor.bounds.max.x, self.floor.bounds.max.y, self.base.z),
        ))
    }

    pub fn center(&self) -> Point3D {
        self.floor.center()
    }

    /// Tool approach direction: out of the floor
    pub fn orientation(&self) -> Vector3D {
        self.floor.normal
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions {
            depth: Some(self.depth),
            width: Some(self.width),
            length: Some(self.length),
            area: Some(self.floor.area),
            volume: Some(self.floor.area * self.depth),
            ..Dimensions::default()
        }
    }
}

/// Every recessed floor on the shape, in face order
pub(crate) fn pocket_candidates(ctx: &DetectionContext<'_>) -> Vec<PocketCandidate> {
    let s = ctx.detection();
    let (bases, small) = split_base_faces(ctx);
    let bores: Vec<CylinderFace> = cylinder_faces(ctx.faces)
        .into_iter()
        .filter(|c| c.reversed)
        .collect();

    small
        .into_iter()
        .filter_map(|floor| {
            let base = *reference_base(&floor, &bases)?;
            if floor.z >= base.z - s.raise_threshold {
                return None;
            }
            if caps_cylinder(&floor, &bores, s.coaxial_max_offset) {
                return None;
            }
            let (width, length) = floor.footprint();
            Some(PocketCandidate {
                floor,
                base,
                depth: base.z - floor.z,
                width,
                length,
            })
        })
        .collect()
}

/// Vertical planar faces standing on the floor inside its footprint
fn walls_of(ctx: &DetectionContext<'_>, pocket: &PocketCandidate) -> Vec<FaceId> {
    let side_z = ctx.config.analysis.side_facing_z;
    let footprint = pocket.floor.bounds;
    ctx.faces
        .iter()
        .filter(|f| {
            f.plane_normal().is_some_and(|n| n.z.abs() < side_z)
                && footprint.contains_xy(&f.bounds.min, FOOTPRINT_TOLERANCE)
                && footprint.contains_xy(&f.bounds.max, FOOTPRINT_TOLERANCE)
                && (f.bounds.min.z - pocket.floor.z).abs() < FOOTPRINT_TOLERANCE
                && f.bounds.max.z <= pocket.base.z + FOOTPRINT_TOLERANCE
        })
        .map(|f| f.id)
        .collect()
}

/// Rectangular and circular pockets that are not slots
#[derive(Debug, Clone, Copy, Default)]
pub struct PocketDetector;

impl FeatureDetector for PocketDetector {
    fn name(&self) -> &str {
        "pockets"
    }

    fn description(&self) -> &str {
        "Recessed planar floors as rectangular or circular pockets"
    }

    fn detect(&self, ctx: &DetectionContext<'_>, ids: &FeatureIdAllocator) -> Vec<Feature> {
        let s = ctx.detection();
        pocket_candidates(ctx)
            .into_iter()
            .filter(|p| !p.is_slot(s))
            .map(|p| {
                let (feature_type, complexity) = if p.is_circular(s) {
                    (FeatureType::PocketCircular, 3)
                } else {
                    (FeatureType::PocketRectangular, 4)
                };
                let mut feature = Feature::new(
                    ids.next_id(),
                    feature_type,
                    FeatureGeometry::Pocket {
                        floor: Some(p.floor.face),
                        walls: walls_of(ctx, &p),
                        floor_z: p.floor.z,
                    },
                    p.center(),
                    p.bounds(),
                )
                .with_dimensions(p.dimensions())
                .with_orientation(p.orientation(), ctx.accessibility(&p.orientation()))
                .with_confidence(0.8)
                .with_complexity(complexity)
                .with_note(format!(
                    "Pocket {:.1} x {:.1}mm, {:.1}mm deep",
                    p.length, p.width, p.depth
                ));
                if p.width > 0.0 && p.depth / p.width > 3.0 {
                    feature = feature.with_risk("Deep narrow pocket - long tool reach required");
                }
                feature
            })
            .collect()
    }
}

/// Overlapping pocket floors at clearly different heights
#[derive(Debug, Clone, Copy, Default)]
pub struct MultiLevelPocketDetector;

impl FeatureDetector for MultiLevelPocketDetector {
    fn name(&self) -> &str {
        "multi_level_pockets"
    }

    fn description(&self) -> &str {
        "Stacked pocket floors as stepped multi-level pockets"
    }

    fn detect(&self, ctx: &DetectionContext<'_>, ids: &FeatureIdAllocator) -> Vec<Feature> {
        let step = ctx.detection().multi_level_min_step;
        let mut candidates = pocket_candidates(ctx);
        candidates.sort_by(|a, b| a.floor.z.total_cmp(&b.floor.z));

        let mut features = Vec::new();
        for pair in candidates.windows(2) {
            let (lower, upper) = (&pair[0], &pair[1]);
            if upper.floor.z - lower.floor.z <= step
                || !lower.floor.bounds.overlaps_xy(&upper.floor.bounds)
            {
                continue;
            }
            features.push(
                Feature::new(
                    ids.next_id(),
                    FeatureType::PocketMultiLevel,
                    FeatureGeometry::MultiLevelPocket {
                        levels: vec![lower.floor.face, upper.floor.face],
                        floor_heights: vec![lower.floor.z, upper.floor.z],
                    },
                    lower.center(),
                    lower.bounds().union(&upper.bounds()),
                )
                .with_dimensions(Dimensions {
                    depth: Some(lower.depth),
                    width: Some(upper.width),
                    length: Some(upper.length),
                    area: Some(lower.floor.area.min(upper.floor.area)),
                    ..Dimensions::default()
                })
                .with_orientation(lower.orientation(), ctx.accessibility(&lower.orientation()))
                .with_confidence(0.75)
                .with_complexity(7)
                .with_note("Multi-level pocket requires multiple depth passes")
                .with_note(format!(
                    "Step of {:.1}mm between levels",
                    upper.floor.z - lower.floor.z
                )),
            );
        }
        features
    }
}

/// Pocket floors surrounding a raised face
#[derive(Debug, Clone, Copy, Default)]
pub struct IslandPocketDetector;

impl FeatureDetector for IslandPocketDetector {
    fn name(&self) -> &str {
        "island_pockets"
    }

    fn description(&self) -> &str {
        "Pockets whose floor surrounds a raised island"
    }

    fn detect(&self, ctx: &DetectionContext<'_>, ids: &FeatureIdAllocator) -> Vec<Feature> {
        let raise = ctx.detection().raise_threshold;
        let upward = upward_planar_faces(ctx);
        let mut features = Vec::new();

        for pocket in pocket_candidates(ctx) {
            let islands: Vec<FaceId> = upward
                .iter()
                .filter(|f| {
                    f.face != pocket.floor.face
                        && f.z > pocket.floor.z + raise
                        && f.z <= pocket.base.z + FOOTPRINT_TOLERANCE
                        && pocket.floor.encloses_xy(f, FOOTPRINT_TOLERANCE)
                })
                .map(|f| f.face)
                .collect();
            if islands.is_empty() {
                continue;
            }

            let count = islands.len();
            features.push(
                Feature::new(
                    ids.next_id(),
                    FeatureType::PocketIsland,
                    FeatureGeometry::IslandPocket {
                        floor: pocket.floor.face,
                        islands,
                    },
                    pocket.center(),
                    pocket.bounds(),
                )
                .with_dimensions(pocket.dimensions())
                .with_orientation(pocket.orientation(), ctx.accessibility(&pocket.orientation()))
                .with_confidence(0.7)
                .with_complexity(8)
                .with_note("Pocket with island - machine around internal feature")
                .with_note(format!(
                    "Requires careful toolpath to avoid {} island(s)",
                    count
                )),
            );
        }
        features
    }
}
