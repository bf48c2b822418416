//! Recognition configuration for FBMKit
//!
//! Every heuristic threshold used by the recognition pipeline lives here so it
//! can be tuned and tested without touching the algorithms. Lengths are in
//! millimetres, angles in degrees, areas in mm².
//!
//! Configuration is organized into logical sections:
//! - Geometry analysis (undercuts, thin walls, draft, accessibility)
//! - Feature detection (per-family geometric limits)
//! - Classification (fuzzy and multi-criteria gating)
//! - Adjacency (proximity threshold)
//! - Pattern recognition (position tolerance, per-type confidences)
//! - Machinability scoring

use crate::error::{SettingsError, SettingsResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Thresholds for the shape-wide geometry analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    /// Planar faces whose normal Z falls below this are undercuts
    pub undercut_normal_z: f64,
    /// Smallest bounding-box dimension below which walls count as thin
    pub thin_wall_threshold: f64,
    /// Draft angles below this raise a risk
    pub min_draft_angle: f64,
    /// |normal Z| above this is top/bottom facing
    pub top_facing_z: f64,
    /// |normal Z| below this is side facing
    pub side_facing_z: f64,
    /// Accessibility below this is flagged as a risk
    pub poor_accessibility: f64,
    /// Accessibility below this suggests 4/5-axis work
    pub multi_axis_accessibility: f64,
    /// Complexity above this is flagged as a risk
    pub high_complexity: f64,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            undercut_normal_z: -0.3,
            thin_wall_threshold: 1.5,
            min_draft_angle: 1.0,
            top_facing_z: 0.9,
            side_facing_z: 0.3,
            poor_accessibility: 0.5,
            multi_axis_accessibility: 0.7,
            high_complexity: 7.0,
        }
    }
}

/// Geometric limits for the feature detectors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionSettings {
    /// |axis Z| above this counts as a vertical axis
    pub vertical_axis_z: f64,
    /// Largest axis component below this marks an axis as off-principal
    pub principal_axis_alignment: f64,
    /// Cylinders deeper than this many diameters are rejected as holes
    pub hole_max_aspect_ratio: f64,
    /// Holes shallower than this many diameters go through fuzzy review
    pub hole_review_aspect_ratio: f64,
    /// Depth shortfall still accepted as a through hole
    pub through_hole_tolerance: f64,
    /// |dot| of two axes above which they are parallel
    pub coaxial_min_dot: f64,
    /// Largest axis-to-axis offset still considered coaxial
    pub coaxial_max_offset: f64,
    /// Radius step that separates a counterbore from a plain bore
    pub counterbore_min_radius_delta: f64,
    /// Full countersink angle range (exclusive), degrees
    pub countersink_min_angle: f64,
    pub countersink_max_angle: f64,
    /// Planar faces larger than this are base faces
    pub base_face_min_area: f64,
    /// Height difference from the base that makes a face raised or recessed
    pub raise_threshold: f64,
    /// Bounding-box aspect ratio below which a pocket or boss is circular
    pub circular_aspect_ratio: f64,
    /// Length/width ratio at or above which a rectangular pocket is a slot
    pub slot_aspect_ratio: f64,
    /// Width ratio range (exclusive) for a T-slot pocket pair
    pub t_slot_min_ratio: f64,
    pub t_slot_max_ratio: f64,
    /// Toroidal faces below this minor radius are circular grooves
    pub groove_max_minor_radius: f64,
    /// |normal Z| below this makes a planar face vertical
    pub rib_vertical_normal_z: f64,
    pub rib_max_thickness: f64,
    pub rib_min_height: f64,
    pub stud_max_diameter: f64,
    /// Cylinder faces covering less than this fraction of a full turn are fillets
    pub fillet_max_sweep: f64,
    pub fillet_max_radius: f64,
    /// Inclined planar faces smaller than this are chamfers
    pub chamfer_max_area: f64,
    /// Coaxial equal-radius circular edges needed to call a bore threaded
    pub thread_min_rings: usize,
    /// Largest ring spacing accepted as a thread pitch
    pub thread_max_pitch: f64,
    /// Height step between two pocket floors of a multi-level pocket
    pub multi_level_min_step: f64,
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self {
            vertical_axis_z: 0.9,
            principal_axis_alignment: 0.95,
            hole_max_aspect_ratio: 50.0,
            hole_review_aspect_ratio: 1.0,
            through_hole_tolerance: 0.1,
            coaxial_min_dot: 0.99,
            coaxial_max_offset: 0.5,
            counterbore_min_radius_delta: 0.5,
            countersink_min_angle: 75.0,
            countersink_max_angle: 125.0,
            base_face_min_area: 1000.0,
            raise_threshold: 1.0,
            circular_aspect_ratio: 1.5,
            slot_aspect_ratio: 3.0,
            t_slot_min_ratio: 1.5,
            t_slot_max_ratio: 3.0,
            groove_max_minor_radius: 5.0,
            rib_vertical_normal_z: 0.2,
            rib_max_thickness: 5.0,
            rib_min_height: 10.0,
            stud_max_diameter: 20.0,
            fillet_max_sweep: 0.3,
            fillet_max_radius: 10.0,
            chamfer_max_area: 200.0,
            thread_min_rings: 4,
            thread_max_pitch: 3.0,
            multi_level_min_step: 2.0,
        }
    }
}

/// Fuzzy and multi-criteria classification thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassificationSettings {
    /// Alternatives need a membership above this
    pub alternative_threshold: f64,
    /// Weighted score above which a decision is "accept"
    pub accept_threshold: f64,
    /// Weight for criteria the caller did not weight
    pub default_weight: f64,
    /// Area at or above which a feature is fully "large"
    pub large_area: f64,
    /// Area above which a feature is half "large"
    pub medium_area: f64,
    /// Z margin around the base surface for additive/subtractive volume checks
    pub volume_margin: f64,
}

impl Default for ClassificationSettings {
    fn default() -> Self {
        Self {
            alternative_threshold: 0.3,
            accept_threshold: 0.6,
            default_weight: 0.33,
            large_area: 1000.0,
            medium_area: 100.0,
            volume_margin: 0.5,
        }
    }
}

/// Feature relationship thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdjacencySettings {
    /// Features closer than this are adjacent
    pub proximity_threshold: f64,
    /// Slack for bounding-box containment
    pub containment_tolerance: f64,
}

impl Default for AdjacencySettings {
    fn default() -> Self {
        Self {
            proximity_threshold: 5.0,
            containment_tolerance: 0.01,
        }
    }
}

/// Pattern recognition tolerances and confidences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternSettings {
    /// Position tolerance for line, circle and mirror matching
    pub position_tolerance: f64,
    /// Spacings below this are treated as coincident features
    pub min_spacing: f64,
    /// Circle-fit determinants below this are collinear
    pub collinear_epsilon: f64,
    pub min_pattern_count: usize,
    pub circular_min_count: usize,
    pub grid_min_count: usize,
    pub circular_confidence: f64,
    pub grid_confidence: f64,
    pub mirror_confidence: f64,
}

impl Default for PatternSettings {
    fn default() -> Self {
        Self {
            position_tolerance: 0.5,
            min_spacing: 0.1,
            collinear_epsilon: 0.001,
            min_pattern_count: 2,
            circular_min_count: 3,
            grid_min_count: 4,
            circular_confidence: 0.9,
            grid_confidence: 0.8,
            mirror_confidence: 0.85,
        }
    }
}

/// Machinability scoring inputs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachinabilitySettings {
    /// Material description passed to the scorer, e.g. "Aluminum 6061" or "Tool steel 58 HRC"
    pub material_hardness: String,
    /// Depth/diameter ratio above which a feature is deep
    pub deep_ratio: f64,
    /// Diameters below this are small
    pub small_diameter: f64,
}

impl Default for MachinabilitySettings {
    fn default() -> Self {
        Self {
            material_hardness: "Aluminum 6061".to_string(),
            deep_ratio: 3.0,
            small_diameter: 3.0,
        }
    }
}

/// Complete recognition configuration
///
/// Aggregates all sections and provides file I/O operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RecognitionConfig {
    pub analysis: AnalysisSettings,
    pub detection: DetectionSettings,
    pub classification: ClassificationSettings,
    pub adjacency: AdjacencySettings,
    pub patterns: PatternSettings,
    pub machinability: MachinabilitySettings,
}

impl RecognitionConfig {
    /// Create new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Platform config location, e.g. `~/.config/fbmkit/recognition.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("fbmkit").join("recognition.toml"))
    }

    /// Load from the platform location, falling back to defaults when no file exists
    pub fn load_or_default() -> SettingsResult<Self> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load_from_file(&path),
            _ => {
                tracing::debug!("No recognition config found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Load config from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            SettingsError::LoadError(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let config: Self = match extension_of(path)? {
            Format::Json => serde_json::from_str(&content)?,
            Format::Toml => toml::from_str(&content)?,
        };

        config.validate()?;
        tracing::debug!("Loaded recognition config from {}", path.display());
        Ok(config)
    }

    /// Save config to file (JSON or TOML)
    pub fn save_to_file(&self, path: &Path) -> SettingsResult<()> {
        self.validate()?;

        let content = match extension_of(path)? {
            Format::Json => serde_json::to_string_pretty(self)?,
            Format::Toml => toml::to_string_pretty(self)?,
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, content).map_err(|e| {
            SettingsError::SaveError(format!("Failed to write {}: {}", path.display(), e))
        })?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> SettingsResult<()> {
        let a = &self.analysis;
        require_positive("analysis.thin_wall_threshold", a.thin_wall_threshold)?;
        require_unit("analysis.top_facing_z", a.top_facing_z)?;
        require_unit("analysis.side_facing_z", a.side_facing_z)?;
        if a.side_facing_z >= a.top_facing_z {
            return Err(SettingsError::invalid(
                "analysis.side_facing_z",
                "must be below analysis.top_facing_z",
            ));
        }
        if !(-1.0..=0.0).contains(&a.undercut_normal_z) {
            return Err(SettingsError::invalid(
                "analysis.undercut_normal_z",
                "must be within -1..0",
            ));
        }

        let d = &self.detection;
        require_unit("detection.vertical_axis_z", d.vertical_axis_z)?;
        require_unit("detection.coaxial_min_dot", d.coaxial_min_dot)?;
        require_positive("detection.hole_max_aspect_ratio", d.hole_max_aspect_ratio)?;
        require_positive("detection.base_face_min_area", d.base_face_min_area)?;
        require_positive("detection.circular_aspect_ratio", d.circular_aspect_ratio)?;
        require_positive("detection.groove_max_minor_radius", d.groove_max_minor_radius)?;
        require_positive("detection.stud_max_diameter", d.stud_max_diameter)?;
        if d.countersink_min_angle >= d.countersink_max_angle {
            return Err(SettingsError::invalid(
                "detection.countersink_min_angle",
                "must be below detection.countersink_max_angle",
            ));
        }
        if d.t_slot_min_ratio >= d.t_slot_max_ratio {
            return Err(SettingsError::invalid(
                "detection.t_slot_min_ratio",
                "must be below detection.t_slot_max_ratio",
            ));
        }
        if d.thread_min_rings < 2 {
            return Err(SettingsError::invalid(
                "detection.thread_min_rings",
                "at least two rings are needed to measure a pitch",
            ));
        }

        let c = &self.classification;
        require_unit("classification.alternative_threshold", c.alternative_threshold)?;
        require_unit("classification.accept_threshold", c.accept_threshold)?;
        if c.medium_area > c.large_area {
            return Err(SettingsError::invalid(
                "classification.medium_area",
                "must not exceed classification.large_area",
            ));
        }

        require_positive("adjacency.proximity_threshold", self.adjacency.proximity_threshold)?;

        let p = &self.patterns;
        require_positive("patterns.position_tolerance", p.position_tolerance)?;
        require_positive("patterns.collinear_epsilon", p.collinear_epsilon)?;
        if p.min_pattern_count < 2 {
            return Err(SettingsError::invalid(
                "patterns.min_pattern_count",
                "a pattern needs at least two features",
            ));
        }
        if p.circular_min_count < 3 {
            return Err(SettingsError::invalid(
                "patterns.circular_min_count",
                "a circle needs at least three features",
            ));
        }
        require_unit("patterns.circular_confidence", p.circular_confidence)?;
        require_unit("patterns.grid_confidence", p.grid_confidence)?;
        require_unit("patterns.mirror_confidence", p.mirror_confidence)?;

        require_positive("machinability.deep_ratio", self.machinability.deep_ratio)?;

        Ok(())
    }
}

enum Format {
    Json,
    Toml,
}

fn extension_of(path: &Path) -> SettingsResult<Format> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => Ok(Format::Json),
        Some("toml") => Ok(Format::Toml),
        other => Err(SettingsError::UnsupportedFormat(
            other.unwrap_or("<none>").to_string(),
        )),
    }
}

fn require_positive(key: &str, value: f64) -> SettingsResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(SettingsError::invalid(key, format!("must be > 0, got {}", value)))
    }
}

fn require_unit(key: &str, value: f64) -> SettingsResult<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(SettingsError::invalid(key, format!("must be within 0..1, got {}", value)))
    }
}
