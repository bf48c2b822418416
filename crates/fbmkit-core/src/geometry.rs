//! Geometric primitives shared by the topology layer and the recognizers.
//!
//! Points and vectors are `nalgebra` types so dot/cross/norm come for free.
//! Everything here is plain value data; nothing refers back into a shape.

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

/// A point in model space (mm)
pub type Point3D = Point3<f64>;

/// A direction or displacement in model space
pub type Vector3D = Vector3<f64>;

/// Lengths below this are treated as zero when normalizing
pub const LENGTH_EPSILON: f64 = 1e-9;

/// The machine Z axis. Top access is along +Z.
pub fn z_axis() -> Vector3D {
    Vector3D::new(0.0, 0.0, 1.0)
}

/// Normalize a direction, returning `None` for zero-length input
pub fn unit(v: &Vector3D) -> Option<Vector3D> {
    v.try_normalize(LENGTH_EPSILON)
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: Point3D,
    pub max: Point3D,
}

impl BoundingBox {
    /// Create a box from two corners in any order
    pub fn new(a: Point3D, b: Point3D) -> Self {
        Self {
            min: Point3D::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z)),
            max: Point3D::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z)),
        }
    }

    /// Box centred on `center` with the given full extents
    pub fn from_center(center: Point3D, extents: Vector3D) -> Self {
        let half = extents.abs() * 0.5;
        Self::new(center - half, center + half)
    }

    /// Smallest box containing every point; `None` when empty
    pub fn from_points<'a, I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Point3D>,
    {
        let mut iter = points.into_iter();
        let first = *iter.next()?;
        Some(iter.fold(Self::new(first, first), |bb, p| bb.expanded_to(p)))
    }

    /// Grow the box to include a point
    pub fn expanded_to(&self, p: &Point3D) -> Self {
        Self {
            min: Point3D::new(self.min.x.min(p.x), self.min.y.min(p.y), self.min.z.min(p.z)),
            max: Point3D::new(self.max.x.max(p.x), self.max.y.max(p.y), self.max.z.max(p.z)),
        }
    }

    /// Smallest box containing both boxes
    pub fn union(&self, other: &BoundingBox) -> Self {
        self.expanded_to(&other.min).expanded_to(&other.max)
    }

    /// Full extents along X, Y and Z
    pub fn extents(&self) -> Vector3D {
        self.max - self.min
    }

    pub fn center(&self) -> Point3D {
        nalgebra::center(&self.min, &self.max)
    }

    /// Smallest of the three extents
    pub fn min_dimension(&self) -> f64 {
        self.extents().min()
    }

    /// Length of the box projected onto a direction
    pub fn extent_along(&self, direction: &Vector3D) -> f64 {
        let e = self.extents();
        match unit(direction) {
            Some(d) => e.x * d.x.abs() + e.y * d.y.abs() + e.z * d.z.abs(),
            None => 0.0,
        }
    }

    /// True when `other` lies entirely inside this box (within `tolerance`)
    pub fn contains_box(&self, other: &BoundingBox, tolerance: f64) -> bool {
        other.min.x >= self.min.x - tolerance
            && other.min.y >= self.min.y - tolerance
            && other.min.z >= self.min.z - tolerance
            && other.max.x <= self.max.x + tolerance
            && other.max.y <= self.max.y + tolerance
            && other.max.z <= self.max.z + tolerance
    }

    /// True when the boxes share volume (touching counts)
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    /// Footprint test in the XY plane
    pub fn contains_xy(&self, p: &Point3D, tolerance: f64) -> bool {
        p.x >= self.min.x - tolerance
            && p.x <= self.max.x + tolerance
            && p.y >= self.min.y - tolerance
            && p.y <= self.max.y + tolerance
    }

    /// Footprint overlap in the XY plane
    pub fn overlaps_xy(&self, other: &BoundingBox) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }
}

/// An infinite line used for cylinder, cone and torus axes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Axis {
    pub origin: Point3D,
    pub direction: Vector3D,
}

impl Axis {
    /// Create an axis, normalizing the direction. Zero directions fall back to +Z.
    pub fn new(origin: Point3D, direction: Vector3D) -> Self {
        Self {
            origin,
            direction: unit(&direction).unwrap_or_else(z_axis),
        }
    }

    /// Perpendicular distance from a point to the axis line
    pub fn distance_to_point(&self, p: &Point3D) -> f64 {
        let v = p - self.origin;
        let along = v.dot(&self.direction);
        (v - self.direction * along).norm()
    }

    /// |cos| of the angle between the two axis directions
    pub fn alignment(&self, other: &Axis) -> f64 {
        self.direction.dot(&other.direction).abs()
    }

    /// Parallel within `min_dot` and lying on the same line within `max_offset`
    pub fn is_coaxial(&self, other: &Axis, min_dot: f64, max_offset: f64) -> bool {
        self.alignment(other) > min_dot && self.distance_to_point(&other.origin) <= max_offset
    }

    /// Signed position of a point's projection along the axis
    pub fn parameter_of(&self, p: &Point3D) -> f64 {
        (p - self.origin).dot(&self.direction)
    }
}
