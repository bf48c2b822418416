//! Edge treatments and reference faces

use super::{cylinder_faces, split_base_faces, DetectionContext, FeatureDetector};
use crate::feature::{Dimensions, Feature, FeatureGeometry, FeatureIdAllocator, FeatureType};
use fbmkit_core::z_axis;

/// Small planar faces inclined between the side and top buckets
#[derive(Debug, Clone, Copy, Default)]
pub struct ChamferDetector;

impl FeatureDetector for ChamferDetector {
    fn name(&self) -> &str {
        "chamfers"
    }

    fn description(&self) -> &str {
        "Small inclined planar faces as chamfers"
    }

    fn detect(&self, ctx: &DetectionContext<'_>, ids: &FeatureIdAllocator) -> Vec<Feature> {
        let s = ctx.detection();
        let (side_z, top_z) = (ctx.config.analysis.side_facing_z, ctx.config.analysis.top_facing_z);

        ctx.faces
            .iter()
            .filter_map(|f| {
                let normal = f.plane_normal()?;
                let nz = normal.z.abs();
                if nz < side_z || nz > top_z || f.area >= s.chamfer_max_area {
                    return None;
                }
                let angle = nz.acos().to_degrees();
                Some(
                    Feature::new(
                        ids.next_id(),
                        FeatureType::Chamfer,
                        FeatureGeometry::Chamfer { face: f.id, angle },
                        f.bounds.center(),
                        f.bounds,
                    )
                    .with_dimensions(Dimensions {
                        area: Some(f.area),
                        ..Dimensions::default()
                    })
                    .with_orientation(normal, ctx.accessibility(&normal))
                    .with_confidence(0.7)
                    .with_complexity(2)
                    .with_note(format!("Chamfer at {:.0}° - use chamfer mill", angle)),
                )
            })
            .collect()
    }
}

/// Partial cylinders with a small radius
#[derive(Debug, Clone, Copy, Default)]
pub struct FilletDetector;

impl FeatureDetector for FilletDetector {
    fn name(&self) -> &str {
        "fillets"
    }

    fn description(&self) -> &str {
        "Partial small-radius cylinders as fillets"
    }

    fn detect(&self, ctx: &DetectionContext<'_>, ids: &FeatureIdAllocator) -> Vec<Feature> {
        let s = ctx.detection();
        cylinder_faces(ctx.faces)
            .into_iter()
            .filter(|c| c.sweep() < s.fillet_max_sweep && c.radius <= s.fillet_max_radius)
            .map(|c| {
                let sweep = c.sweep();
                Feature::new(
                    ids.next_id(),
                    FeatureType::Fillet,
                    FeatureGeometry::Fillet {
                        face: c.face,
                        axis: c.axis,
                        radius: c.radius,
                        sweep,
                    },
                    c.bounds.center(),
                    c.bounds,
                )
                .with_dimensions(Dimensions {
                    diameter: Some(c.diameter()),
                    length: Some(c.length()),
                    area: Some(c.area),
                    ..Dimensions::default()
                })
                .with_orientation(z_axis(), ctx.accessibility(&z_axis()))
                .with_confidence(0.7)
                .with_complexity(3)
                .with_note(format!("Fillet R{:.1} - use ball or corner radius mill", c.radius))
            })
            .collect()
    }
}

/// Large upward faces, usually facing operations
#[derive(Debug, Clone, Copy, Default)]
pub struct PlanarFaceDetector;

impl FeatureDetector for PlanarFaceDetector {
    fn name(&self) -> &str {
        "planar_faces"
    }

    fn description(&self) -> &str {
        "Large upward planar faces for facing"
    }

    fn detect(&self, ctx: &DetectionContext<'_>, ids: &FeatureIdAllocator) -> Vec<Feature> {
        let (bases, _) = split_base_faces(ctx);
        bases
            .into_iter()
            .map(|f| {
                let (width, length) = f.footprint();
                Feature::new(
                    ids.next_id(),
                    FeatureType::FacePlanar,
                    FeatureGeometry::Face {
                        face: f.face,
                        normal: z_axis(),
                    },
                    f.center(),
                    f.bounds,
                )
                .with_dimensions(Dimensions {
                    width: Some(width),
                    length: Some(length),
                    area: Some(f.area),
                    ..Dimensions::default()
                })
                .with_orientation(z_axis(), ctx.accessibility(&z_axis()))
                .with_confidence(0.95)
                .with_complexity(1)
                .with_note("Face milling operation")
            })
            .collect()
    }
}
