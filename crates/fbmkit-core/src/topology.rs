//! Topology accessor: the read-only window onto a B-rep shape.
//!
//! Faces and edges are addressed through arena handles (`FaceId`, `EdgeId`)
//! that index the owning shape's tables. Records handed out by an accessor are
//! plain copies; the handles inside them are only meaningful against the shape
//! that produced them.

use crate::geometry::{Axis, BoundingBox, Point3D, Vector3D};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Handle to a face in a shape's face table
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FaceId(pub u32);

/// Handle to an edge in a shape's edge table
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EdgeId(pub u32);

impl fmt::Display for FaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "face#{}", self.0)
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "edge#{}", self.0)
    }
}

/// Underlying surface of a face with its defining parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SurfaceKind {
    Plane {
        origin: Point3D,
        /// Outward unit normal
        normal: Vector3D,
    },
    Cylinder {
        axis: Axis,
        radius: f64,
    },
    Cone {
        /// Axis through the reference circle
        axis: Axis,
        /// Radius of the reference circle at the axis origin
        ref_radius: f64,
        /// Half-angle in radians
        semi_angle: f64,
    },
    Sphere {
        center: Point3D,
        radius: f64,
    },
    Torus {
        axis: Axis,
        major_radius: f64,
        minor_radius: f64,
    },
    /// B-spline, Bezier, offset and other free-form surfaces
    Freeform,
    /// Anything the kernel reports that this crate does not know about
    #[serde(other)]
    Unknown,
}

impl SurfaceKind {
    /// Short tag for logging and summaries
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Plane { .. } => "plane",
            Self::Cylinder { .. } => "cylinder",
            Self::Cone { .. } => "cone",
            Self::Sphere { .. } => "sphere",
            Self::Torus { .. } => "torus",
            Self::Freeform => "freeform",
            Self::Unknown => "unknown",
        }
    }
}

/// Underlying curve of an edge
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CurveKind {
    Line {
        origin: Point3D,
        direction: Vector3D,
    },
    Circle {
        axis: Axis,
        radius: f64,
    },
    Helix {
        axis: Axis,
        radius: f64,
        pitch: f64,
        /// Axial length covered by the helix
        height: f64,
    },
    Freeform,
    #[serde(other)]
    Unknown,
}

/// Face orientation relative to its surface's natural normal.
///
/// A reversed cylinder has material outside the cylinder (a bore);
/// a forward cylinder has material inside (a pin or boss).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Forward,
    Reversed,
}

/// A face as reported by the accessor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaceRecord {
    pub id: FaceId,
    pub surface: SurfaceKind,
    #[serde(default)]
    pub orientation: Orientation,
    /// Surface area from the kernel's mass properties
    pub area: f64,
    pub bounds: BoundingBox,
}

impl FaceRecord {
    /// Outward normal for planar faces
    pub fn plane_normal(&self) -> Option<Vector3D> {
        match self.surface {
            SurfaceKind::Plane { normal, .. } => Some(match self.orientation {
                Orientation::Forward => normal,
                Orientation::Reversed => -normal,
            }),
            _ => None,
        }
    }

    pub fn is_reversed(&self) -> bool {
        self.orientation == Orientation::Reversed
    }
}

/// An edge as reported by the accessor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub id: EdgeId,
    pub curve: CurveKind,
    pub bounds: BoundingBox,
}

/// Read-only access to a B-rep shape
///
/// Implemented by kernel bindings and by the in-memory [`ShapeSnapshot`].
/// Every method is a pure query; implementations must return the same
/// records in the same order for the lifetime of the shape.
///
/// [`ShapeSnapshot`]: crate::snapshot::ShapeSnapshot
pub trait TopologyAccessor {
    /// Every face of the shape, in kernel order
    fn faces(&self) -> Vec<FaceRecord>;

    /// Every edge of the shape, in kernel order
    fn edges(&self) -> Vec<EdgeRecord>;

    /// Bounding box of the whole shape; `None` for an empty shape
    fn bounding_box(&self) -> Option<BoundingBox>;

    /// Look up a single face by handle
    fn face(&self, id: FaceId) -> Option<FaceRecord> {
        self.faces().into_iter().find(|f| f.id == id)
    }

    /// Surface area of a face, 0.0 for unknown handles
    fn face_area(&self, id: FaceId) -> f64 {
        self.face(id).map(|f| f.area).unwrap_or(0.0)
    }

    fn face_count(&self) -> usize {
        self.faces().len()
    }

    fn is_empty(&self) -> bool {
        self.faces().is_empty() && self.edges().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::z_axis;

    #[test]
    fn test_unknown_surface_tag_deserializes() {
        let json = r#"{"type":"nurbs_patch_v9"}"#;
        let kind: SurfaceKind = serde_json::from_str(json).unwrap();
        assert_eq!(kind, SurfaceKind::Unknown);
    }

    #[test]
    fn test_reversed_plane_flips_normal() {
        let face = FaceRecord {
            id: FaceId(0),
            surface: SurfaceKind::Plane {
                origin: Point3D::origin(),
                normal: z_axis(),
            },
            orientation: Orientation::Reversed,
            area: 1.0,
            bounds: BoundingBox::new(Point3D::origin(), Point3D::new(1.0, 1.0, 0.0)),
        };
        assert_eq!(face.plane_normal(), Some(-z_axis()));
        assert!(face.is_reversed());
    }

    #[test]
    fn test_surface_tags() {
        assert_eq!(SurfaceKind::Freeform.tag(), "freeform");
        let cyl = SurfaceKind::Cylinder {
            axis: Axis::new(Point3D::origin(), z_axis()),
            radius: 2.0,
        };
        assert_eq!(cyl.tag(), "cylinder");
    }
}
