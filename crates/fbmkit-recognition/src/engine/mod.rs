//! Feature recognition engine and detector registry
//!
//! The engine owns an ordered list of [`FeatureDetector`]s. Each detector
//! scans the shape for one feature family and never fails: no match simply
//! means an empty list. Detectors share a single [`FeatureIdAllocator`] and run
//! in registration order, so ids are deterministic for a given shape and
//! configuration.

pub mod edges;
pub mod holes;
pub mod pockets;
pub mod protrusions;
pub mod slots;

use crate::feature::{Accessibility, Feature, FeatureIdAllocator};
use fbmkit_core::{
    Axis, BoundingBox, EdgeRecord, FaceId, FaceRecord, Point3D, SurfaceKind, TopologyAccessor,
    Vector3D,
};
use fbmkit_settings::{DetectionSettings, RecognitionConfig};
use std::f64::consts::PI;
use std::sync::Arc;

pub use edges::{ChamferDetector, FilletDetector, PlanarFaceDetector};
pub use holes::{thread_designation, CounterboreDetector, CountersinkDetector, HoleDetector};
pub use pockets::{IslandPocketDetector, MultiLevelPocketDetector, PocketDetector};
pub use protrusions::{BossDetector, RibDetector, StudDetector};
pub use slots::{GrooveDetector, SlotDetector, TSlotDetector};

/// Everything a detector may look at during one run
#[derive(Debug, Clone, Copy)]
pub struct DetectionContext<'a> {
    pub faces: &'a [FaceRecord],
    pub edges: &'a [EdgeRecord],
    pub shape_bounds: Option<BoundingBox>,
    pub config: &'a RecognitionConfig,
}

impl<'a> DetectionContext<'a> {
    pub fn new(
        faces: &'a [FaceRecord],
        edges: &'a [EdgeRecord],
        shape_bounds: Option<BoundingBox>,
        config: &'a RecognitionConfig,
    ) -> Self {
        Self {
            faces,
            edges,
            shape_bounds,
            config,
        }
    }

    pub fn detection(&self) -> &DetectionSettings {
        &self.config.detection
    }

    /// Approach bucket for a tool direction
    pub fn accessibility(&self, direction: &Vector3D) -> Accessibility {
        Accessibility::from_direction(
            direction,
            self.config.analysis.top_facing_z,
            self.config.analysis.side_facing_z,
        )
    }

    /// Projection of the shape bounds onto an axis
    pub(crate) fn shape_span(&self, axis: &Axis) -> Option<(f64, f64)> {
        self.shape_bounds.map(|bb| projected_span(&bb, axis))
    }
}

/// Trait for feature detectors
///
/// A detector recognizes one feature family. It must be pure: the same
/// context always yields the same features, and ids are drawn from `ids` in
/// the order the features are emitted.
pub trait FeatureDetector: Send + Sync {
    /// Get the name/identifier of this detector
    fn name(&self) -> &str;

    /// Get a description of what this detector finds
    fn description(&self) -> &str;

    /// Scan the shape and return every feature found
    fn detect(&self, ctx: &DetectionContext<'_>, ids: &FeatureIdAllocator) -> Vec<Feature>;

    /// Check if this detector is enabled
    fn is_enabled(&self) -> bool {
        true
    }
}

/// Arc-wrapped detector for sharing between engines
pub type DetectorHandle = Arc<dyn FeatureDetector>;

/// Ordered battery of feature detectors
///
/// # Example
/// ```ignore
/// let engine = FeatureRecognitionEngine::with_default_detectors(config);
/// let features = engine.recognize(&shape);
/// ```
pub struct FeatureRecognitionEngine {
    detectors: Vec<DetectorHandle>,
    config: RecognitionConfig,
}

impl FeatureRecognitionEngine {
    /// Create an engine with no detectors
    pub fn new(config: RecognitionConfig) -> Self {
        Self {
            detectors: Vec::new(),
            config,
        }
    }

    /// Create an engine with every built-in detector registered
    pub fn with_default_detectors(config: RecognitionConfig) -> Self {
        let mut engine = Self::new(config);
        engine.register_all(default_detectors());
        engine
    }

    /// Register a detector. Detectors run in registration order.
    pub fn register(&mut self, detector: DetectorHandle) -> &mut Self {
        self.detectors.push(detector);
        self
    }

    pub fn register_all(&mut self, detectors: Vec<DetectorHandle>) -> &mut Self {
        self.detectors.extend(detectors);
        self
    }

    pub fn detector_count(&self) -> usize {
        self.detectors.len()
    }

    pub fn enabled_detector_count(&self) -> usize {
        self.detectors.iter().filter(|d| d.is_enabled()).count()
    }

    pub fn get_detector_by_name(&self, name: &str) -> Option<&DetectorHandle> {
        self.detectors.iter().find(|d| d.name() == name)
    }

    /// List all registered detectors as `(name, description, enabled)`
    pub fn list_detectors(&self) -> Vec<(&str, &str, bool)> {
        self.detectors
            .iter()
            .map(|d| (d.name(), d.description(), d.is_enabled()))
            .collect()
    }

    pub fn config(&self) -> &RecognitionConfig {
        &self.config
    }

    /// Run every enabled detector over the shape and merge the results
    pub fn recognize(&self, shape: &dyn TopologyAccessor) -> Vec<Feature> {
        let faces = shape.faces();
        let edges = shape.edges();
        let ctx = DetectionContext::new(&faces, &edges, shape.bounding_box(), &self.config);
        let ids = FeatureIdAllocator::new();

        let mut features = Vec::new();
        for detector in &self.detectors {
            if !detector.is_enabled() {
                continue;
            }
            let found = detector.detect(&ctx, &ids);
            tracing::debug!("Detector '{}' found {} features", detector.name(), found.len());
            features.extend(found);
        }

        tracing::debug!(
            "Recognized {} features from {} faces and {} edges",
            features.len(),
            faces.len(),
            edges.len()
        );
        features
    }
}

/// Built-in detectors in their canonical order
pub fn default_detectors() -> Vec<DetectorHandle> {
    vec![
        Arc::new(HoleDetector),
        Arc::new(CounterboreDetector),
        Arc::new(CountersinkDetector),
        Arc::new(PocketDetector),
        Arc::new(MultiLevelPocketDetector),
        Arc::new(IslandPocketDetector),
        Arc::new(SlotDetector),
        Arc::new(TSlotDetector),
        Arc::new(GrooveDetector),
        Arc::new(BossDetector),
        Arc::new(RibDetector),
        Arc::new(StudDetector),
        Arc::new(ChamferDetector),
        Arc::new(FilletDetector),
        Arc::new(PlanarFaceDetector),
    ]
}

/// Range of a box's corners projected onto an axis
pub(crate) fn projected_span(bounds: &BoundingBox, axis: &Axis) -> (f64, f64) {
    let (lo, hi) = (bounds.min, bounds.max);
    let mut t_min = f64::INFINITY;
    let mut t_max = f64::NEG_INFINITY;
    for &x in &[lo.x, hi.x] {
        for &y in &[lo.y, hi.y] {
            for &z in &[lo.z, hi.z] {
                let t = axis.parameter_of(&Point3D::new(x, y, z));
                t_min = t_min.min(t);
                t_max = t_max.max(t);
            }
        }
    }
    (t_min, t_max)
}

/// Axial extent of a surface of revolution from its bounding box. The
/// radial overhang of the end circles is removed, which is exact for
/// axis-aligned axes and a close estimate otherwise.
pub(crate) fn axial_span(bounds: &BoundingBox, axis: &Axis, radius: f64) -> (f64, f64) {
    let (t_min, t_max) = projected_span(bounds, axis);
    let d = axis.direction;
    let overhang = radius
        * [d.x, d.y, d.z]
            .iter()
            .map(|c| c.abs() * (1.0 - c * c).max(0.0).sqrt())
            .sum::<f64>();
    let (a, b) = (t_min + overhang, t_max - overhang);
    if a <= b {
        (a, b)
    } else {
        let mid = 0.5 * (t_min + t_max);
        (mid, mid)
    }
}

/// Cylindrical face with its measured axial extent
#[derive(Debug, Clone, Copy)]
pub(crate) struct CylinderFace {
    pub face: FaceId,
    pub axis: Axis,
    pub radius: f64,
    pub reversed: bool,
    pub area: f64,
    pub bounds: BoundingBox,
    pub t_min: f64,
    pub t_max: f64,
}

impl CylinderFace {
    pub fn diameter(&self) -> f64 {
        2.0 * self.radius
    }

    pub fn length(&self) -> f64 {
        self.t_max - self.t_min
    }

    pub fn point_at(&self, t: f64) -> Point3D {
        self.axis.origin + self.axis.direction * t
    }

    /// Fraction of a full turn the face covers
    pub fn sweep(&self) -> f64 {
        let full = 2.0 * PI * self.radius * self.length();
        if full > 0.0 {
            self.area / full
        } else {
            0.0
        }
    }

    /// End of the axis with the larger Z, and the axis direction pointing there
    pub fn upper_end(&self) -> (Point3D, Vector3D) {
        let top = self.point_at(self.t_max);
        let bottom = self.point_at(self.t_min);
        if top.z >= bottom.z {
            (top, self.axis.direction)
        } else {
            (bottom, -self.axis.direction)
        }
    }
}

/// Every measurable cylindrical face; degenerate ones are logged and skipped
pub(crate) fn cylinder_faces(faces: &[FaceRecord]) -> Vec<CylinderFace> {
    faces
        .iter()
        .filter_map(|f| match f.surface {
            SurfaceKind::Cylinder { axis, radius } => {
                if !(radius.is_finite() && radius > 0.0) {
                    tracing::warn!("Skipping {}: cylinder radius {} is degenerate", f.id, radius);
                    return None;
                }
                let (t_min, t_max) = axial_span(&f.bounds, &axis, radius);
                if t_max - t_min <= fbmkit_core::geometry::LENGTH_EPSILON {
                    tracing::warn!("Skipping {}: cylinder has no axial length", f.id);
                    return None;
                }
                Some(CylinderFace {
                    face: f.id,
                    axis,
                    radius,
                    reversed: f.is_reversed(),
                    area: f.area,
                    bounds: f.bounds,
                    t_min,
                    t_max,
                })
            }
            _ => None,
        })
        .collect()
}

/// A planar face with an upward normal
#[derive(Debug, Clone, Copy)]
pub(crate) struct PlanarFace {
    pub face: FaceId,
    /// Outward unit normal, always with a positive Z
    pub normal: Vector3D,
    pub z: f64,
    pub area: f64,
    pub bounds: BoundingBox,
}

impl PlanarFace {
    pub fn center(&self) -> Point3D {
        self.bounds.center()
    }

    /// Footprint as (width, length) with width <= length
    pub fn footprint(&self) -> (f64, f64) {
        let e = self.bounds.extents();
        (e.x.min(e.y), e.x.max(e.y))
    }

    /// length / width with the small guard used for circular/rectangular splits
    pub fn aspect_ratio(&self) -> f64 {
        let (width, length) = self.footprint();
        length / (width + 0.001)
    }

    /// The footprint of `other` lies within this face's footprint
    pub fn encloses_xy(&self, other: &PlanarFace, tolerance: f64) -> bool {
        self.bounds.contains_xy(&other.bounds.min, tolerance)
            && self.bounds.contains_xy(&other.bounds.max, tolerance)
    }
}

/// Planar faces whose outward normal points up past the top-facing threshold
pub(crate) fn upward_planar_faces(ctx: &DetectionContext<'_>) -> Vec<PlanarFace> {
    let top_z = ctx.config.analysis.top_facing_z;
    ctx.faces
        .iter()
        .filter_map(|f| {
            let normal = f.plane_normal().filter(|n| n.z > top_z)?;
            Some(PlanarFace {
                face: f.id,
                normal,
                z: f.bounds.center().z,
                area: f.area,
                bounds: f.bounds,
            })
        })
        .collect()
}

/// Upward faces split into `(base, candidates)` by the base area threshold
pub(crate) fn split_base_faces(ctx: &DetectionContext<'_>) -> (Vec<PlanarFace>, Vec<PlanarFace>) {
    let min_area = ctx.detection().base_face_min_area;
    upward_planar_faces(ctx)
        .into_iter()
        .partition(|f| f.area > min_area)
}

/// Height of the highest base face, else the top of the shape. This is the
/// surface features are classified as adding to or cutting into.
pub(crate) fn base_height(shape: &dyn TopologyAccessor, config: &RecognitionConfig) -> Option<f64> {
    let faces = shape.faces();
    let bounds = shape.bounding_box();
    let ctx = DetectionContext::new(&faces, &[], bounds, config);
    let (bases, _) = split_base_faces(&ctx);
    highest(bases.iter())
        .map(|b| b.z)
        .or_else(|| bounds.map(|b| b.max.z))
}

/// The base face a candidate is measured against: the highest base face whose
/// footprint overlaps the candidate's, else the highest base face overall
pub(crate) fn reference_base<'b>(
    candidate: &PlanarFace,
    bases: &'b [PlanarFace],
) -> Option<&'b PlanarFace> {
    highest(bases.iter().filter(|b| b.bounds.overlaps_xy(&candidate.bounds)))
        .or_else(|| highest(bases.iter()))
}

/// First face with the largest Z
fn highest<'b>(faces: impl Iterator<Item = &'b PlanarFace>) -> Option<&'b PlanarFace> {
    faces.fold(None, |best, f| match best {
        Some(b) if b.z >= f.z => Some(b),
        _ => Some(f),
    })
}

/// True when a planar face sits on the axis of one of the cylinders and fits
/// within its radius, i.e. it caps the cylinder
pub(crate) fn caps_cylinder(face: &PlanarFace, cylinders: &[CylinderFace], max_offset: f64) -> bool {
    let e = face.bounds.extents();
    cylinders.iter().any(|c| {
        c.axis.distance_to_point(&face.center()) <= max_offset
            && e.x <= c.diameter() + max_offset
            && e.y <= c.diameter() + max_offset
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use fbmkit_core::{z_axis, Orientation, ShapeBuilder};

    struct NamedNothing(&'static str);

    impl FeatureDetector for NamedNothing {
        fn name(&self) -> &str {
            self.0
        }

        fn description(&self) -> &str {
            "finds nothing"
        }

        fn detect(&self, _ctx: &DetectionContext<'_>, _ids: &FeatureIdAllocator) -> Vec<Feature> {
            Vec::new()
        }
    }

    #[test]
    fn test_registry() {
        let mut engine = FeatureRecognitionEngine::new(RecognitionConfig::default());
        engine
            .register(Arc::new(NamedNothing("a")))
            .register(Arc::new(NamedNothing("b")));
        assert_eq!(engine.detector_count(), 2);
        assert!(engine.get_detector_by_name("b").is_some());
        assert!(engine.get_detector_by_name("c").is_none());
        assert_eq!(engine.list_detectors()[0], ("a", "finds nothing", true));
    }

    #[test]
    fn test_default_detector_names_are_unique() {
        let engine = FeatureRecognitionEngine::with_default_detectors(RecognitionConfig::default());
        let mut names: Vec<_> = engine.list_detectors().into_iter().map(|(n, _, _)| n).collect();
        let count = names.len();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), count);
        assert_eq!(engine.enabled_detector_count(), count);
    }

    #[test]
    fn test_cylinder_measurements() {
        let mut b = ShapeBuilder::new();
        b.hole(Point3D::new(5.0, 5.0, 10.0), 2.0, 8.0);
        let shape = b.build();
        let cylinders = cylinder_faces(&shape.faces);
        assert_eq!(cylinders.len(), 1);

        let c = cylinders[0];
        assert!((c.length() - 8.0).abs() < 1e-9);
        assert!((c.sweep() - 1.0).abs() < 1e-9);
        let (top, dir) = c.upper_end();
        assert!((top.z - 10.0).abs() < 1e-9);
        assert_eq!(dir, z_axis());
    }

    #[test]
    fn test_oblique_cylinder_length() {
        let mut b = ShapeBuilder::new();
        let axis = Axis::new(Point3D::origin(), Vector3D::new(1.0, 0.0, 1.0));
        b.cylinder(axis, 1.0, 10.0, Orientation::Reversed);
        let shape = b.build();
        let c = cylinder_faces(&shape.faces)[0];
        assert!((c.length() - 10.0).abs() < 1e-6);
    }

    #[test]
    fn test_degenerate_cylinder_is_skipped() {
        let mut b = ShapeBuilder::new();
        b.cylinder(Axis::new(Point3D::origin(), z_axis()), 0.0, 5.0, Orientation::Reversed);
        b.cylinder(Axis::new(Point3D::origin(), z_axis()), 2.0, 0.0, Orientation::Reversed);
        assert!(cylinder_faces(&b.build().faces).is_empty());
    }
}
