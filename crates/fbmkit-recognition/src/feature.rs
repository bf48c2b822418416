//! Machining feature model.
//!
//! A [`Feature`] is one discrete machining feature found on a shape. Its
//! geometry is a closed per-type variant holding arena handles into the
//! shape that produced it, so a feature list is only meaningful next to that
//! shape.

use fbmkit_core::{Axis, BoundingBox, EdgeId, FaceId, Point3D, Vector3D};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

/// Feature identifier, unique within one recognition run
pub type FeatureId = u32;

/// Pattern identifier, unique within one recognition run
pub type PatternId = u32;

/// Closed set of recognizable feature types
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FeatureType {
    HoleThrough,
    HoleBlind,
    HoleThreaded,
    HoleCounterbore,
    HoleCountersink,
    PocketRectangular,
    PocketCircular,
    #[serde(rename = "pocket-multilevel")]
    PocketMultiLevel,
    PocketIsland,
    BossCircular,
    BossRectangular,
    Rib,
    Stud,
    Slot,
    TSlot,
    GrooveCircular,
    Chamfer,
    Fillet,
    FacePlanar,
}

impl FeatureType {
    /// Human readable name
    pub fn label(&self) -> &'static str {
        match self {
            Self::HoleThrough => "Through Hole",
            Self::HoleBlind => "Blind Hole",
            Self::HoleThreaded => "Threaded Hole",
            Self::HoleCounterbore => "Counterbore Hole",
            Self::HoleCountersink => "Countersink Hole",
            Self::PocketRectangular => "Rectangular Pocket",
            Self::PocketCircular => "Circular Pocket",
            Self::PocketMultiLevel => "Multi-Level Pocket",
            Self::PocketIsland => "Pocket with Island",
            Self::BossCircular => "Circular Boss",
            Self::BossRectangular => "Rectangular Boss",
            Self::Rib => "Rib",
            Self::Stud => "Stud",
            Self::Slot => "Slot",
            Self::TSlot => "T-Slot",
            Self::GrooveCircular => "Circular Groove (O-Ring)",
            Self::Chamfer => "Chamfer",
            Self::Fillet => "Fillet",
            Self::FacePlanar => "Planar Face",
        }
    }

    /// Stable kebab-case key, as used in serialized output
    pub fn key(&self) -> &'static str {
        match self {
            Self::HoleThrough => "hole-through",
            Self::HoleBlind => "hole-blind",
            Self::HoleThreaded => "hole-threaded",
            Self::HoleCounterbore => "hole-counterbore",
            Self::HoleCountersink => "hole-countersink",
            Self::PocketRectangular => "pocket-rectangular",
            Self::PocketCircular => "pocket-circular",
            Self::PocketMultiLevel => "pocket-multilevel",
            Self::PocketIsland => "pocket-island",
            Self::BossCircular => "boss-circular",
            Self::BossRectangular => "boss-rectangular",
            Self::Rib => "rib",
            Self::Stud => "stud",
            Self::Slot => "slot",
            Self::TSlot => "t-slot",
            Self::GrooveCircular => "groove-circular",
            Self::Chamfer => "chamfer",
            Self::Fillet => "fillet",
            Self::FacePlanar => "face-planar",
        }
    }

    pub fn is_hole(&self) -> bool {
        matches!(
            self,
            Self::HoleThrough
                | Self::HoleBlind
                | Self::HoleThreaded
                | Self::HoleCounterbore
                | Self::HoleCountersink
        )
    }

    /// Features that leave material standing rather than removing it
    pub fn is_additive(&self) -> bool {
        matches!(
            self,
            Self::BossCircular | Self::BossRectangular | Self::Rib | Self::Stud
        )
    }
}

impl fmt::Display for FeatureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Approach direction needed to machine a feature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Accessibility {
    #[default]
    Top,
    Bottom,
    Side,
    Angled,
}

impl Accessibility {
    /// Bucket a direction by its Z component: `|z| > top_z` is top or bottom,
    /// `|z| < side_z` is side, anything between is angled.
    pub fn from_direction(direction: &Vector3D, top_z: f64, side_z: f64) -> Self {
        let z = direction.z;
        if z.abs() > top_z {
            if z > 0.0 {
                Self::Top
            } else {
                Self::Bottom
            }
        } else if z.abs() < side_z {
            Self::Side
        } else {
            Self::Angled
        }
    }
}

impl fmt::Display for Accessibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Top => "Top",
            Self::Bottom => "Bottom",
            Self::Side => "Side",
            Self::Angled => "Angled",
        };
        write!(f, "{}", s)
    }
}

/// Tolerance class attached to a feature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToleranceClass {
    #[default]
    Standard,
    Precision,
    Tight,
}

impl ToleranceClass {
    /// Precision and tight classes both need finishing passes
    pub fn is_tight(&self) -> bool {
        matches!(self, Self::Precision | Self::Tight)
    }
}

/// Per-type geometry of a feature with handles into the source shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeatureGeometry {
    Hole {
        face: FaceId,
        axis: Axis,
        radius: f64,
        through: bool,
    },
    ThreadedHole {
        face: FaceId,
        axis: Axis,
        radius: f64,
        pitch: f64,
        designation: String,
        thread_edges: Vec<EdgeId>,
    },
    Counterbore {
        bore: FaceId,
        shoulder: FaceId,
        axis: Axis,
        bore_radius: f64,
        shoulder_radius: f64,
        shoulder_depth: f64,
    },
    Countersink {
        face: FaceId,
        axis: Axis,
        ref_radius: f64,
        outer_radius: f64,
        /// Full included angle in degrees
        sink_angle: f64,
    },
    Pocket {
        /// `None` when the pocket was inferred from its wall alone
        floor: Option<FaceId>,
        walls: Vec<FaceId>,
        floor_z: f64,
    },
    MultiLevelPocket {
        levels: Vec<FaceId>,
        floor_heights: Vec<f64>,
    },
    IslandPocket {
        floor: FaceId,
        islands: Vec<FaceId>,
    },
    TSlot {
        neck: FaceId,
        head: FaceId,
        neck_width: f64,
        head_width: f64,
    },
    Boss {
        top: FaceId,
        base: FaceId,
        height: f64,
    },
    Rib {
        face: FaceId,
        thickness: f64,
    },
    Stud {
        face: FaceId,
        axis: Axis,
        radius: f64,
    },
    Groove {
        face: FaceId,
        axis: Axis,
        major_radius: f64,
        minor_radius: f64,
    },
    Chamfer {
        face: FaceId,
        /// Angle between the face normal and +Z, degrees
        angle: f64,
    },
    Fillet {
        face: FaceId,
        axis: Axis,
        radius: f64,
        /// Fraction of a full turn covered by the face
        sweep: f64,
    },
    Face {
        face: FaceId,
        normal: Vector3D,
    },
}

impl FeatureGeometry {
    /// Every face handle the geometry refers to
    pub fn faces(&self) -> Vec<FaceId> {
        match self {
            Self::Hole { face, .. }
            | Self::ThreadedHole { face, .. }
            | Self::Countersink { face, .. }
            | Self::Rib { face, .. }
            | Self::Stud { face, .. }
            | Self::Groove { face, .. }
            | Self::Chamfer { face, .. }
            | Self::Fillet { face, .. }
            | Self::Face { face, .. } => vec![*face],
            Self::Counterbore { bore, shoulder, .. } => vec![*bore, *shoulder],
            Self::Pocket { floor, walls, .. } => floor.iter().chain(walls.iter()).copied().collect(),
            Self::MultiLevelPocket { levels, .. } => levels.clone(),
            Self::IslandPocket { floor, islands } => {
                std::iter::once(*floor).chain(islands.iter().copied()).collect()
            }
            Self::TSlot { neck, head, .. } => vec![*neck, *head],
            Self::Boss { top, base, .. } => vec![*top, *base],
        }
    }
}

/// Optional dimensional attributes, in mm / mm² / mm³
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Dimensions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diameter: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
}

/// A recognized machining feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub id: FeatureId,
    pub feature_type: FeatureType,
    pub geometry: FeatureGeometry,
    /// Reference point used for pattern matching and distances
    pub center: Point3D,
    /// Volume the feature occupies
    pub bounds: BoundingBox,
    pub dimensions: Dimensions,
    /// Unit direction a tool approaches from
    pub orientation: Vector3D,
    pub accessibility: Accessibility,
    pub tolerance: ToleranceClass,
    /// Detection confidence in [0, 1]
    pub confidence: f64,
    /// Machining difficulty in [1, 10]
    pub complexity_rating: u8,
    pub pattern_id: Option<PatternId>,
    pub related_feature_ids: BTreeSet<FeatureId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub manufacturing_notes: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub risk_factors: Vec<String>,
}

impl Feature {
    /// Create a feature with neutral defaults: +Z orientation, top access,
    /// standard tolerance, confidence 1.0 and complexity 1.
    pub fn new(
        id: FeatureId,
        feature_type: FeatureType,
        geometry: FeatureGeometry,
        center: Point3D,
        bounds: BoundingBox,
    ) -> Self {
        Self {
            id,
            feature_type,
            geometry,
            center,
            bounds,
            dimensions: Dimensions::default(),
            orientation: Vector3D::new(0.0, 0.0, 1.0),
            accessibility: Accessibility::Top,
            tolerance: ToleranceClass::Standard,
            confidence: 1.0,
            complexity_rating: 1,
            pattern_id: None,
            related_feature_ids: BTreeSet::new(),
            manufacturing_notes: Vec::new(),
            risk_factors: Vec::new(),
        }
    }

    /// Confidence, clamped to [0, 1]
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = if confidence.is_finite() {
            confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self
    }

    /// Complexity rating, clamped to [1, 10]
    pub fn with_complexity(mut self, rating: u8) -> Self {
        self.complexity_rating = rating.clamp(1, 10);
        self
    }

    pub fn with_dimensions(mut self, dimensions: Dimensions) -> Self {
        self.dimensions = dimensions;
        self
    }

    pub fn with_orientation(mut self, orientation: Vector3D, accessibility: Accessibility) -> Self {
        self.orientation = orientation;
        self.accessibility = accessibility;
        self
    }

    pub fn with_tolerance(mut self, tolerance: ToleranceClass) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.manufacturing_notes.push(note.into());
        self
    }

    pub fn with_risk(mut self, risk: impl Into<String>) -> Self {
        self.risk_factors.push(risk.into());
        self
    }
}

/// Monotonic feature id source shared by all detectors of one run
#[derive(Debug)]
pub struct FeatureIdAllocator {
    next: AtomicU32,
}

impl FeatureIdAllocator {
    /// Ids start at 1
    pub fn new() -> Self {
        Self {
            next: AtomicU32::new(1),
        }
    }

    pub fn next_id(&self) -> FeatureId {
        self.next.fetch_add(1, Ordering::Relaxed)
    }

    /// Number of ids handed out so far
    pub fn issued(&self) -> u32 {
        self.next.load(Ordering::Relaxed) - 1
    }
}

impl Default for FeatureIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}
