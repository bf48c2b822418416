//! # FBMKit Core
//!
//! Core types shared by every FBMKit crate:
//! - Geometry primitives (points, vectors, axes, bounding boxes)
//! - The read-only topology accessor over a B-rep shape
//! - Arena handles for faces and edges
//! - In-memory shape snapshots and a builder for synthetic parts

pub mod error;
pub mod geometry;
pub mod snapshot;
pub mod topology;

pub use error::{Error, Result};
pub use geometry::{z_axis, Axis, BoundingBox, Point3D, Vector3D};
pub use snapshot::{ShapeBuilder, ShapeSnapshot};
pub use topology::{
    CurveKind, EdgeId, EdgeRecord, FaceId, FaceRecord, Orientation, SurfaceKind,
    TopologyAccessor,
};
