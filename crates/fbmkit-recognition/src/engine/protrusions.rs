//! Protrusion detectors: bosses, ribs and studs.
//!
//! These features leave material standing, so they are machined by removing
//! everything around them.

use super::{
    caps_cylinder, cylinder_faces, reference_base, split_base_faces, CylinderFace,
    DetectionContext, FeatureDetector,
};
use crate::feature::{Dimensions, Feature, FeatureGeometry, FeatureIdAllocator, FeatureType};
use fbmkit_core::{z_axis, BoundingBox, Point3D};

/// Convex, near-vertical cylinders thin enough to be studs
fn stud_cylinders(ctx: &DetectionContext<'_>) -> Vec<CylinderFace> {
    let s = ctx.detection();
    cylinder_faces(ctx.faces)
        .into_iter()
        .filter(|c| {
            !c.reversed
                && c.axis.direction.z.abs() > s.vertical_axis_z
                && c.diameter() < s.stud_max_diameter
                && c.sweep() > s.fillet_max_sweep
        })
        .collect()
}

/// Raised planar tops standing clear of the base face
#[derive(Debug, Clone, Copy, Default)]
pub struct BossDetector;

impl FeatureDetector for BossDetector {
    fn name(&self) -> &str {
        "bosses"
    }

    fn description(&self) -> &str {
        "Raised planar faces as circular or rectangular bosses"
    }

    fn detect(&self, ctx: &DetectionContext<'_>, ids: &FeatureIdAllocator) -> Vec<Feature> {
        let s = ctx.detection();
        let (bases, small) = split_base_faces(ctx);
        let studs = stud_cylinders(ctx);
        let mut features = Vec::new();

        for top in small {
            let Some(base) = reference_base(&top, &bases) else {
                continue;
            };
            let height = top.z - base.z;
            if height <= s.raise_threshold || caps_cylinder(&top, &studs, s.coaxial_max_offset) {
                continue;
            }

            let (width, length) = top.footprint();
            let circular = top.aspect_ratio() < s.circular_aspect_ratio;
            let feature_type = if circular {
                FeatureType::BossCircular
            } else {
                FeatureType::BossRectangular
            };
            let bounds = top.bounds.union(&BoundingBox::new(
                Point3D::new(top.bounds.min.x, top.bounds.min.y, base.z),
                top.bounds.max,
            ));

            features.push(
                Feature::new(
                    ids.next_id(),
                    feature_type,
                    FeatureGeometry::Boss {
                        top: top.face,
                        base: base.face,
                        height,
                    },
                    top.center(),
                    bounds,
                )
                .with_dimensions(Dimensions {
                    diameter: circular.then_some(width),
                    width: Some(width),
                    length: Some(length),
                    height: Some(height),
                    area: Some(top.area),
                    volume: Some(top.area * height),
                    ..Dimensions::default()
                })
                .with_orientation(z_axis(), ctx.accessibility(&z_axis()))
                .with_confidence(0.75)
                .with_complexity(5)
                .with_note("Boss feature - machine around to leave protrusion")
                .with_note("Consider face milling base, then profiling around boss"),
            );
        }
        features
    }
}

/// Thin, tall vertical planar faces
#[derive(Debug, Clone, Copy, Default)]
pub struct RibDetector;

impl FeatureDetector for RibDetector {
    fn name(&self) -> &str {
        "ribs"
    }

    fn description(&self) -> &str {
        "Thin standing walls as ribs"
    }

    fn detect(&self, ctx: &DetectionContext<'_>, ids: &FeatureIdAllocator) -> Vec<Feature> {
        let s = ctx.detection();
        let mut features = Vec::new();

        for face in ctx.faces {
            let Some(normal) = face.plane_normal() else {
                continue;
            };
            if normal.z.abs() >= s.rib_vertical_normal_z {
                continue;
            }
            let e = face.bounds.extents();
            let thickness = e.x.min(e.y);
            let width = e.x.max(e.y);
            let height = e.z;
            if thickness >= s.rib_max_thickness || height <= width || height <= s.rib_min_height {
                continue;
            }

            features.push(
                Feature::new(
                    ids.next_id(),
                    FeatureType::Rib,
                    FeatureGeometry::Rib {
                        face: face.id,
                        thickness,
                    },
                    face.bounds.center(),
                    face.bounds,
                )
                .with_dimensions(Dimensions {
                    width: Some(thickness),
                    length: Some(width),
                    height: Some(height),
                    area: Some(face.area),
                    ..Dimensions::default()
                })
                .with_orientation(z_axis(), ctx.accessibility(&z_axis()))
                .with_confidence(0.8)
                .with_complexity(6)
                .with_note(format!("Thin rib {:.1}mm thick - leave as protrusion", thickness))
                .with_note("Machine material around rib carefully")
                .with_risk("Thin wall - risk of deflection during machining"),
            );
        }
        features
    }
}

/// Small standing cylinders
#[derive(Debug, Clone, Copy, Default)]
pub struct StudDetector;

impl FeatureDetector for StudDetector {
    fn name(&self) -> &str {
        "studs"
    }

    fn description(&self) -> &str {
        "Convex vertical cylinders as studs"
    }

    fn detect(&self, ctx: &DetectionContext<'_>, ids: &FeatureIdAllocator) -> Vec<Feature> {
        stud_cylinders(ctx)
            .into_iter()
            .map(|c| {
                let (top, _) = c.upper_end();
                let diameter = c.diameter();
                let height = c.length();
                Feature::new(
                    ids.next_id(),
                    FeatureType::Stud,
                    FeatureGeometry::Stud {
                        face: c.face,
                        axis: c.axis,
                        radius: c.radius,
                    },
                    top,
                    c.bounds,
                )
                .with_dimensions(Dimensions {
                    diameter: Some(diameter),
                    height: Some(height),
                    area: Some(c.area),
                    ..Dimensions::default()
                })
                .with_orientation(z_axis(), ctx.accessibility(&z_axis()))
                .with_confidence(0.85)
                .with_complexity(4)
                .with_note(format!("Cylindrical stud Ø{:.1}mm x {:.1}mm", diameter, height))
                .with_note("Machine surrounding material to leave stud")
            })
            .collect()
    }
}
