//! In-memory shape snapshots.
//!
//! A `ShapeSnapshot` is a frozen copy of a shape's face and edge tables. It is
//! what a kernel binding hands over after import, what the CLI reads from JSON,
//! and what tests build with [`ShapeBuilder`].

use crate::error::{Error, Result};
use crate::geometry::{unit, z_axis, Axis, BoundingBox, Point3D, Vector3D, LENGTH_EPSILON};
use crate::topology::{
    CurveKind, EdgeId, EdgeRecord, FaceId, FaceRecord, Orientation, SurfaceKind,
    TopologyAccessor,
};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::path::Path;

/// Frozen face/edge tables of one shape
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShapeSnapshot {
    /// Optional label, usually the source file name
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub faces: Vec<FaceRecord>,
    #[serde(default)]
    pub edges: Vec<EdgeRecord>,
    /// Kernel-reported bounds; derived from the faces when absent
    #[serde(default)]
    pub bounds: Option<BoundingBox>,
}

impl ShapeSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a snapshot from JSON and validate it
    pub fn from_json_str(json: &str) -> Result<Self> {
        if json.trim().is_empty() {
            return Err(Error::load("shape document is empty"));
        }
        let mut snapshot: Self = serde_json::from_str(json)?;
        snapshot.normalize()?;
        Ok(snapshot)
    }

    /// Load a snapshot from a `.json` file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.extension().is_some_and(|ext| ext == "json") {
            return Err(Error::load(format!(
                "{} is not a .json shape snapshot",
                path.display()
            )));
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::load(format!("cannot read {}: {}", path.display(), e)))?;
        let mut snapshot = Self::from_json_str(&content)?;
        if snapshot.name.is_none() {
            snapshot.name = path.file_name().map(|n| n.to_string_lossy().into_owned());
        }
        tracing::debug!(
            "Loaded shape snapshot {:?}: {} faces, {} edges",
            snapshot.name,
            snapshot.faces.len(),
            snapshot.edges.len()
        );
        Ok(snapshot)
    }

    /// Write the snapshot as pretty JSON
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check the arena invariants: handles equal table indices and
    /// scalar parameters are finite.
    pub fn validate(&self) -> Result<()> {
        for (index, face) in self.faces.iter().enumerate() {
            if face.id.0 as usize != index {
                return Err(Error::InvalidGeometry {
                    entity: face.id.to_string(),
                    reason: format!("stored at index {}", index),
                });
            }
            if !face.area.is_finite() || face.area < 0.0 {
                return Err(Error::InvalidGeometry {
                    entity: face.id.to_string(),
                    reason: format!("area {} is not a finite non-negative number", face.area),
                });
            }
            if !surface_is_finite(&face.surface) {
                return Err(Error::InvalidGeometry {
                    entity: face.id.to_string(),
                    reason: "surface parameters are not finite".to_string(),
                });
            }
        }
        for (index, edge) in self.edges.iter().enumerate() {
            if edge.id.0 as usize != index {
                return Err(Error::InvalidGeometry {
                    entity: edge.id.to_string(),
                    reason: format!("stored at index {}", index),
                });
            }
            if !curve_is_finite(&edge.curve) {
                return Err(Error::InvalidGeometry {
                    entity: edge.id.to_string(),
                    reason: "curve parameters are not finite".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Validate, then rescale every plane normal and axis direction to unit
    /// length. Zero-length directions are rejected.
    pub fn normalize(&mut self) -> Result<()> {
        self.validate()?;
        for face in &mut self.faces {
            let id = face.id;
            match &mut face.surface {
                SurfaceKind::Plane { normal, .. } => normalize_direction(normal, id)?,
                SurfaceKind::Cylinder { axis, .. }
                | SurfaceKind::Cone { axis, .. }
                | SurfaceKind::Torus { axis, .. } => {
                    normalize_direction(&mut axis.direction, id)?
                }
                SurfaceKind::Sphere { .. } | SurfaceKind::Freeform | SurfaceKind::Unknown => {}
            }
        }
        for edge in &mut self.edges {
            let id = edge.id;
            match &mut edge.curve {
                CurveKind::Circle { axis, .. } | CurveKind::Helix { axis, .. } => {
                    normalize_direction(&mut axis.direction, id)?
                }
                CurveKind::Line { .. } | CurveKind::Freeform | CurveKind::Unknown => {}
            }
        }
        Ok(())
    }
}

fn point_is_finite(p: &Point3D) -> bool {
    p.iter().all(|c| c.is_finite())
}

fn vector_is_finite(v: &Vector3D) -> bool {
    v.iter().all(|c| c.is_finite())
}

fn axis_is_finite(axis: &Axis) -> bool {
    point_is_finite(&axis.origin) && vector_is_finite(&axis.direction)
}

fn surface_is_finite(surface: &SurfaceKind) -> bool {
    match surface {
        SurfaceKind::Plane { origin, normal } => point_is_finite(origin) && vector_is_finite(normal),
        SurfaceKind::Cylinder { axis, radius } => axis_is_finite(axis) && radius.is_finite(),
        SurfaceKind::Cone {
            axis,
            ref_radius,
            semi_angle,
        } => axis_is_finite(axis) && ref_radius.is_finite() && semi_angle.is_finite(),
        SurfaceKind::Sphere { center, radius } => point_is_finite(center) && radius.is_finite(),
        SurfaceKind::Torus {
            axis,
            major_radius,
            minor_radius,
        } => axis_is_finite(axis) && major_radius.is_finite() && minor_radius.is_finite(),
        SurfaceKind::Freeform | SurfaceKind::Unknown => true,
    }
}

fn curve_is_finite(curve: &CurveKind) -> bool {
    match curve {
        CurveKind::Line { origin, direction } => {
            point_is_finite(origin) && vector_is_finite(direction)
        }
        CurveKind::Circle { axis, radius } => axis_is_finite(axis) && radius.is_finite(),
        CurveKind::Helix {
            axis,
            radius,
            pitch,
            height,
        } => axis_is_finite(axis) && radius.is_finite() && pitch.is_finite() && height.is_finite(),
        CurveKind::Freeform | CurveKind::Unknown => true,
    }
}

/// Rescale `direction` to unit length in place. Already-unit vectors are left
/// untouched.
fn normalize_direction(direction: &mut Vector3D, entity: impl ToString) -> Result<()> {
    if (direction.norm() - 1.0).abs() <= LENGTH_EPSILON {
        return Ok(());
    }
    match unit(direction) {
        Some(d) => {
            *direction = d;
            Ok(())
        }
        None => Err(Error::InvalidGeometry {
            entity: entity.to_string(),
            reason: "direction has zero length".to_string(),
        }),
    }
}

impl TopologyAccessor for ShapeSnapshot {
    fn faces(&self) -> Vec<FaceRecord> {
        self.faces.clone()
    }

    fn edges(&self) -> Vec<EdgeRecord> {
        self.edges.clone()
    }

    fn bounding_box(&self) -> Option<BoundingBox> {
        self.bounds.or_else(|| {
            self.faces
                .iter()
                .map(|f| f.bounds)
                .reduce(|acc, bb| acc.union(&bb))
        })
    }

    fn face(&self, id: FaceId) -> Option<FaceRecord> {
        self.faces.get(id.0 as usize).copied()
    }

    fn face_count(&self) -> usize {
        self.faces.len()
    }

    fn is_empty(&self) -> bool {
        self.faces.is_empty() && self.edges.is_empty()
    }
}

/// Bounds of a finite cylinder (or any surface of revolution of constant radius)
pub fn cylinder_bounds(axis: &Axis, radius: f64, length: f64) -> BoundingBox {
    let d = axis.direction;
    let r = Vector3D::new(
        radius * (1.0 - d.x * d.x).max(0.0).sqrt(),
        radius * (1.0 - d.y * d.y).max(0.0).sqrt(),
        radius * (1.0 - d.z * d.z).max(0.0).sqrt(),
    );
    let start = axis.origin;
    let end = axis.origin + d * length;
    BoundingBox::new(start - r, start + r).union(&BoundingBox::new(end - r, end + r))
}

/// Builder for synthetic snapshots with predictable topology
///
/// Handles are assigned in insertion order, so the same sequence of calls
/// always produces the same snapshot.
#[derive(Debug, Default)]
pub struct ShapeBuilder {
    name: Option<String>,
    faces: Vec<FaceRecord>,
    edges: Vec<EdgeRecord>,
}

impl ShapeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Add a raw face record and return its handle
    pub fn face(
        &mut self,
        surface: SurfaceKind,
        orientation: Orientation,
        area: f64,
        bounds: BoundingBox,
    ) -> FaceId {
        let id = FaceId(self.faces.len() as u32);
        self.faces.push(FaceRecord {
            id,
            surface,
            orientation,
            area,
            bounds,
        });
        id
    }

    /// Add a raw edge record and return its handle
    pub fn edge(&mut self, curve: CurveKind, bounds: BoundingBox) -> EdgeId {
        let id = EdgeId(self.edges.len() as u32);
        self.edges.push(EdgeRecord { id, curve, bounds });
        id
    }

    /// Planar face with explicit normal, bounds and area
    pub fn plane(&mut self, origin: Point3D, normal: Vector3D, area: f64, bounds: BoundingBox) -> FaceId {
        let normal = unit(&normal).unwrap_or_else(z_axis);
        self.face(
            SurfaceKind::Plane { origin, normal },
            Orientation::Forward,
            area,
            bounds,
        )
    }

    /// Rectangular face parallel to XY at height `z`
    pub fn horizontal_rect(&mut self, min: (f64, f64), max: (f64, f64), z: f64, facing_up: bool) -> FaceId {
        let bounds = BoundingBox::new(Point3D::new(min.0, min.1, z), Point3D::new(max.0, max.1, z));
        let e = bounds.extents();
        let normal = if facing_up { z_axis() } else { -z_axis() };
        self.plane(bounds.center(), normal, e.x * e.y, bounds)
    }

    /// Disc face parallel to XY at height `z`
    pub fn horizontal_disc(&mut self, center: (f64, f64), radius: f64, z: f64, facing_up: bool) -> FaceId {
        let c = Point3D::new(center.0, center.1, z);
        let bounds = BoundingBox::from_center(c, Vector3D::new(2.0 * radius, 2.0 * radius, 0.0));
        let normal = if facing_up { z_axis() } else { -z_axis() };
        self.plane(c, normal, PI * radius * radius, bounds)
    }

    /// Vertical wall from `a` to `b` in XY spanning `z0..z1`. The normal points
    /// to the left of `a -> b`.
    pub fn vertical_wall(&mut self, a: (f64, f64), b: (f64, f64), z0: f64, z1: f64) -> FaceId {
        let run = Vector3D::new(b.0 - a.0, b.1 - a.1, 0.0);
        let normal = Vector3D::new(-run.y, run.x, 0.0);
        let bounds = BoundingBox::new(Point3D::new(a.0, a.1, z0), Point3D::new(b.0, b.1, z1));
        self.plane(bounds.center(), normal, run.norm() * (z1 - z0).abs(), bounds)
    }

    /// The six faces of an axis-aligned block
    pub fn block(&mut self, min: Point3D, max: Point3D) -> Vec<FaceId> {
        vec![
            self.horizontal_rect((min.x, min.y), (max.x, max.y), max.z, true),
            self.horizontal_rect((min.x, min.y), (max.x, max.y), min.z, false),
            self.vertical_wall((min.x, min.y), (min.x, max.y), min.z, max.z),
            self.vertical_wall((max.x, max.y), (max.x, min.y), min.z, max.z),
            self.vertical_wall((max.x, min.y), (min.x, min.y), min.z, max.z),
            self.vertical_wall((min.x, max.y), (max.x, max.y), min.z, max.z),
        ]
    }

    /// Cylindrical face of length `length` starting at `axis.origin`
    pub fn cylinder(&mut self, axis: Axis, radius: f64, length: f64, orientation: Orientation) -> FaceId {
        let bounds = cylinder_bounds(&axis, radius, length);
        self.face(
            SurfaceKind::Cylinder { axis, radius },
            orientation,
            2.0 * PI * radius * length,
            bounds,
        )
    }

    /// Vertical bore opening at `top` going down `depth`
    pub fn hole(&mut self, top: Point3D, radius: f64, depth: f64) -> FaceId {
        let axis = Axis::new(Point3D::new(top.x, top.y, top.z - depth), z_axis());
        self.cylinder(axis, radius, depth, Orientation::Reversed)
    }

    /// Cylindrical pin standing on `base` with its top face
    pub fn pin(&mut self, base: Point3D, radius: f64, height: f64) -> (FaceId, FaceId) {
        let axis = Axis::new(base, z_axis());
        let side = self.cylinder(axis, radius, height, Orientation::Forward);
        let top = self.horizontal_disc((base.x, base.y), radius, base.z + height, true);
        (side, top)
    }

    /// Rectangular recess: floor plus four inward-facing walls
    pub fn pocket(&mut self, min: (f64, f64), max: (f64, f64), floor_z: f64, top_z: f64) -> Vec<FaceId> {
        vec![
            self.horizontal_rect(min, max, floor_z, true),
            self.vertical_wall((min.0, max.1), (min.0, min.1), floor_z, top_z),
            self.vertical_wall((max.0, min.1), (max.0, max.1), floor_z, top_z),
            self.vertical_wall((min.0, min.1), (max.0, min.1), floor_z, top_z),
            self.vertical_wall((max.0, max.1), (min.0, max.1), floor_z, top_z),
        ]
    }

    /// Conical face; `semi_angle` in radians
    pub fn cone(&mut self, axis: Axis, ref_radius: f64, semi_angle: f64, length: f64) -> FaceId {
        let far_radius = (ref_radius + length * semi_angle.tan()).abs();
        let bounds = cylinder_bounds(&axis, ref_radius.max(far_radius), length);
        let slant = length / semi_angle.cos().abs().max(1e-9);
        let area = PI * (ref_radius + far_radius) * slant;
        self.face(
            SurfaceKind::Cone {
                axis,
                ref_radius,
                semi_angle,
            },
            Orientation::Reversed,
            area,
            bounds,
        )
    }

    /// Countersink cone opening at `top` around a bore of `radius`
    pub fn countersink(&mut self, top: Point3D, radius: f64, full_angle_deg: f64, depth: f64) -> FaceId {
        let semi = (full_angle_deg / 2.0).to_radians();
        let axis = Axis::new(Point3D::new(top.x, top.y, top.z - depth), z_axis());
        self.cone(axis, radius, semi, depth)
    }

    pub fn torus(&mut self, axis: Axis, major_radius: f64, minor_radius: f64) -> FaceId {
        let outer = major_radius + minor_radius;
        let reach = Vector3D::new(outer, outer, outer);
        let bounds = BoundingBox::from_center(axis.origin, reach * 2.0);
        self.face(
            SurfaceKind::Torus {
                axis,
                major_radius,
                minor_radius,
            },
            Orientation::Reversed,
            4.0 * PI * PI * major_radius * minor_radius,
            bounds,
        )
    }

    pub fn sphere(&mut self, center: Point3D, radius: f64) -> FaceId {
        let bounds = BoundingBox::from_center(center, Vector3D::repeat(2.0 * radius));
        self.face(
            SurfaceKind::Sphere { center, radius },
            Orientation::Forward,
            4.0 * PI * radius * radius,
            bounds,
        )
    }

    pub fn freeform(&mut self, bounds: BoundingBox, area: f64) -> FaceId {
        self.face(SurfaceKind::Freeform, Orientation::Forward, area, bounds)
    }

    pub fn circle_edge(&mut self, axis: Axis, radius: f64) -> EdgeId {
        let bounds = cylinder_bounds(&axis, radius, 0.0);
        self.edge(CurveKind::Circle { axis, radius }, bounds)
    }

    pub fn helix_edge(&mut self, axis: Axis, radius: f64, pitch: f64, height: f64) -> EdgeId {
        let bounds = cylinder_bounds(&axis, radius, height);
        self.edge(
            CurveKind::Helix {
                axis,
                radius,
                pitch,
                height,
            },
            bounds,
        )
    }

    pub fn line_edge(&mut self, from: Point3D, to: Point3D) -> EdgeId {
        self.edge(
            CurveKind::Line {
                origin: from,
                direction: to - from,
            },
            BoundingBox::new(from, to),
        )
    }

    pub fn build(self) -> ShapeSnapshot {
        ShapeSnapshot {
            name: self.name,
            faces: self.faces,
            edges: self.edges,
            bounds: None,
        }
    }
}
