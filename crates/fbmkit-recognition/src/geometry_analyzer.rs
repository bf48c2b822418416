//! Shape-wide manufacturability analysis.
//!
//! Runs once per recognition, before any detector, and produces an immutable
//! [`GeometryAnalysis`]. Every metric is a coarse global proxy computed from
//! face types, planar normals and the shape bounding box.

use crate::feature::{Accessibility, Feature};
use fbmkit_core::{SurfaceKind, TopologyAccessor, Vector3D};
use fbmkit_settings::AnalysisSettings;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A manufacturing risk found by the analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "risk", rename_all = "snake_case")]
pub enum ManufacturingRisk {
    Undercuts,
    ThinWalls { thickness: f64 },
    PoorAccessibility,
    HighComplexity,
    LowDraftAngle { angle: f64 },
}

impl fmt::Display for ManufacturingRisk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undercuts => write!(
                f,
                "Undercuts detected - may require special tooling or multiple setups"
            ),
            Self::ThinWalls { thickness } => write!(
                f,
                "Thin walls detected ({:.1}mm) - risk of deflection/chatter",
                thickness
            ),
            Self::PoorAccessibility => {
                write!(f, "Poor accessibility - may require 4/5-axis machining")
            }
            Self::HighComplexity => write!(
                f,
                "High complexity - extended programming and machining time"
            ),
            Self::LowDraftAngle { angle } => write!(
                f,
                "Low draft angle ({:.1}°) - may be difficult to machine",
                angle
            ),
        }
    }
}

/// Global manufacturability assessment of one shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeometryAnalysis {
    pub has_undercuts: bool,
    pub has_thin_walls: bool,
    pub min_wall_thickness: f64,
    /// Full included angle of every conical face, degrees
    pub draft_angles: Vec<f64>,
    /// 1.0 means everything is reachable from the top
    pub accessibility_score: f64,
    /// 0 (simple) to 10 (complex)
    pub complexity_score: f64,
    pub manufacturing_risks: Vec<ManufacturingRisk>,
    pub suggested_strategies: Vec<String>,
}

impl Default for GeometryAnalysis {
    fn default() -> Self {
        Self {
            has_undercuts: false,
            has_thin_walls: false,
            min_wall_thickness: 0.0,
            draft_angles: Vec::new(),
            accessibility_score: 1.0,
            complexity_score: 0.0,
            manufacturing_risks: Vec::new(),
            suggested_strategies: Vec::new(),
        }
    }
}

/// Tool approach for a single feature
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureAccessibility {
    pub approach: Accessibility,
    pub requires_special_tool: bool,
    /// Tilt from vertical needed to reach an angled feature, degrees
    pub recommended_tool_angle: f64,
}

/// Shape-wide geometry analyzer
#[derive(Debug, Clone, Default)]
pub struct GeometryAnalyzer {
    settings: AnalysisSettings,
}

impl GeometryAnalyzer {
    pub fn new(settings: AnalysisSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &AnalysisSettings {
        &self.settings
    }

    /// Run every metric and derive risks and strategies
    pub fn analyze(&self, shape: &dyn TopologyAccessor) -> GeometryAnalysis {
        let (has_thin_walls, min_wall_thickness) = self.analyze_wall_thickness(shape);
        let mut analysis = GeometryAnalysis {
            has_undercuts: self.detect_undercuts(shape),
            has_thin_walls,
            min_wall_thickness,
            draft_angles: self.measure_draft_angles(shape),
            accessibility_score: self.calculate_accessibility_score(shape),
            complexity_score: self.calculate_complexity_score(shape),
            ..GeometryAnalysis::default()
        };
        analysis.manufacturing_risks = self.identify_risks(&analysis);
        analysis.suggested_strategies = self.suggest_strategies(&analysis);

        tracing::debug!(
            "Geometry analysis: undercuts={}, thin_walls={}, accessibility={:.2}, complexity={:.2}",
            analysis.has_undercuts,
            analysis.has_thin_walls,
            analysis.accessibility_score,
            analysis.complexity_score
        );
        analysis
    }

    /// True when any planar face points down past the undercut threshold
    pub fn detect_undercuts(&self, shape: &dyn TopologyAccessor) -> bool {
        shape
            .faces()
            .iter()
            .filter_map(|f| f.plane_normal())
            .any(|n| n.z < self.settings.undercut_normal_z)
    }

    /// `(min_dimension < threshold, min_dimension)` from the shape bounding box
    pub fn analyze_wall_thickness(&self, shape: &dyn TopologyAccessor) -> (bool, f64) {
        match shape.bounding_box() {
            Some(bb) => {
                let min_dimension = bb.min_dimension();
                (min_dimension < self.settings.thin_wall_threshold, min_dimension)
            }
            None => (false, 0.0),
        }
    }

    /// Full included angle of every conical face, degrees
    pub fn measure_draft_angles(&self, shape: &dyn TopologyAccessor) -> Vec<f64> {
        shape
            .faces()
            .iter()
            .filter_map(|f| match f.surface {
                SurfaceKind::Cone { semi_angle, .. } => Some(2.0 * semi_angle.to_degrees().abs()),
                _ => None,
            })
            .collect()
    }

    /// `(top + 0.5 * side) / (top + side + bottom)` over planar faces, 1.0 when
    /// no planar face falls in a bucket
    pub fn calculate_accessibility_score(&self, shape: &dyn TopologyAccessor) -> f64 {
        let mut top = 0usize;
        let mut side = 0usize;
        let mut bottom = 0usize;

        for normal in shape.faces().iter().filter_map(|f| f.plane_normal()) {
            let z = normal.z.abs();
            if z > self.settings.top_facing_z {
                if normal.z > 0.0 {
                    top += 1;
                } else {
                    bottom += 1;
                }
            } else if z < self.settings.side_facing_z {
                side += 1;
            }
        }

        let total = top + side + bottom;
        if total == 0 {
            return 1.0;
        }
        (top as f64 + 0.5 * side as f64) / total as f64
    }

    /// Fraction of faces that are neither planar nor cylindrical, times 5,
    /// plus 1 above 10 faces or 2 above 20, capped at 10
    pub fn calculate_complexity_score(&self, shape: &dyn TopologyAccessor) -> f64 {
        let faces = shape.faces();
        if faces.is_empty() {
            return 0.0;
        }

        let complex = faces
            .iter()
            .filter(|f| {
                !matches!(
                    f.surface,
                    SurfaceKind::Plane { .. } | SurfaceKind::Cylinder { .. }
                )
            })
            .count();

        let mut score = complex as f64 / faces.len() as f64 * 5.0;
        if faces.len() > 20 {
            score += 2.0;
        } else if faces.len() > 10 {
            score += 1.0;
        }
        score.min(10.0)
    }

    pub fn identify_risks(&self, analysis: &GeometryAnalysis) -> Vec<ManufacturingRisk> {
        let mut risks = Vec::new();

        if analysis.has_undercuts {
            risks.push(ManufacturingRisk::Undercuts);
        }
        if analysis.has_thin_walls {
            risks.push(ManufacturingRisk::ThinWalls {
                thickness: analysis.min_wall_thickness,
            });
        }
        if analysis.accessibility_score < self.settings.poor_accessibility {
            risks.push(ManufacturingRisk::PoorAccessibility);
        }
        if analysis.complexity_score > self.settings.high_complexity {
            risks.push(ManufacturingRisk::HighComplexity);
        }
        for &angle in &analysis.draft_angles {
            if angle < self.settings.min_draft_angle {
                risks.push(ManufacturingRisk::LowDraftAngle { angle });
            }
        }

        risks
    }

    pub fn suggest_strategies(&self, analysis: &GeometryAnalysis) -> Vec<String> {
        let mut strategies: Vec<&str> = Vec::new();

        if analysis.has_thin_walls {
            strategies.push("Use light depth of cut and multiple passes");
            strategies.push("Consider climb milling to reduce cutting forces");
            strategies.push("Use sharp tools to minimize deflection");
        }
        if analysis.has_undercuts {
            strategies.push("Evaluate if undercuts can be accessed with angled tools");
            strategies.push("Consider additional setups or part rotation");
        }
        if analysis.complexity_score > self.settings.high_complexity {
            strategies.push("Break into multiple operations with tool changes");
            strategies.push("Use adaptive clearing for efficient roughing");
        }
        if analysis.accessibility_score < self.settings.multi_axis_accessibility {
            strategies.push("Consider 4-axis or 5-axis machining");
            strategies.push("Optimize fixture design for better access");
        }

        strategies.into_iter().map(String::from).collect()
    }

    /// Approach direction and tooling for one feature, from its orientation
    pub fn feature_accessibility(&self, feature: &Feature) -> FeatureAccessibility {
        self.accessibility_for_direction(&feature.orientation)
    }

    pub fn accessibility_for_direction(&self, direction: &Vector3D) -> FeatureAccessibility {
        let approach = Accessibility::from_direction(
            direction,
            self.settings.top_facing_z,
            self.settings.side_facing_z,
        );
        match approach {
            Accessibility::Angled => FeatureAccessibility {
                approach,
                requires_special_tool: true,
                recommended_tool_angle: direction.z.abs().clamp(0.0, 1.0).acos().to_degrees(),
            },
            _ => FeatureAccessibility {
                approach,
                requires_special_tool: false,
                recommended_tool_angle: 0.0,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fbmkit_core::{Point3D, ShapeBuilder, ShapeSnapshot};

    fn analyzer() -> GeometryAnalyzer {
        GeometryAnalyzer::new(AnalysisSettings::default())
    }

    #[test]
    fn test_empty_shape_defaults() {
        let analysis = analyzer().analyze(&ShapeSnapshot::new());
        assert!(!analysis.has_undercuts);
        assert!(!analysis.has_thin_walls);
        assert_eq!(analysis.accessibility_score, 1.0);
        assert_eq!(analysis.complexity_score, 0.0);
        assert!(analysis.manufacturing_risks.is_empty());
    }

    #[test]
    fn test_block_accessibility() {
        let mut b = ShapeBuilder::new();
        b.block(Point3D::new(0.0, 0.0, 0.0), Point3D::new(50.0, 40.0, 20.0));
        let shape = b.build();

        let a = analyzer();
        // top 1, bottom 1, side 4 -> (1 + 2) / 6
        assert!((a.calculate_accessibility_score(&shape) - 0.5).abs() < 1e-9);
        // the bottom face points straight down
        assert!(a.detect_undercuts(&shape));
        assert_eq!(a.analyze_wall_thickness(&shape), (false, 20.0));
    }

    #[test]
    fn test_thin_plate_risk() {
        let mut b = ShapeBuilder::new();
        b.block(Point3D::new(0.0, 0.0, 0.0), Point3D::new(100.0, 100.0, 1.0));
        let analysis = analyzer().analyze(&b.build());
        assert!(analysis.has_thin_walls);
        assert_eq!(analysis.min_wall_thickness, 1.0);
        assert!(analysis
            .manufacturing_risks
            .contains(&ManufacturingRisk::ThinWalls { thickness: 1.0 }));
        assert!(analysis
            .suggested_strategies
            .iter()
            .any(|s| s.contains("light depth of cut")));
    }

    #[test]
    fn test_draft_angles_are_full_angles() {
        let mut b = ShapeBuilder::new();
        b.countersink(Point3D::new(0.0, 0.0, 10.0), 3.0, 90.0, 2.0);
        let angles = analyzer().measure_draft_angles(&b.build());
        assert_eq!(angles.len(), 1);
        assert!((angles[0] - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_complexity_counts_non_prismatic_faces() {
        let mut b = ShapeBuilder::new();
        b.block(Point3D::new(0.0, 0.0, 0.0), Point3D::new(10.0, 10.0, 10.0));
        b.sphere(Point3D::new(5.0, 5.0, 12.0), 2.0);
        b.freeform(
            fbmkit_core::BoundingBox::new(Point3D::new(0.0, 0.0, 0.0), Point3D::new(1.0, 1.0, 1.0)),
            1.0,
        );
        // 2 of 8 faces are complex
        let score = analyzer().calculate_complexity_score(&b.build());
        assert!((score - 1.25).abs() < 1e-9);
    }

    #[test]
    fn test_risk_messages() {
        assert_eq!(
            ManufacturingRisk::ThinWalls { thickness: 1.0 }.to_string(),
            "Thin walls detected (1.0mm) - risk of deflection/chatter"
        );
        assert!(ManufacturingRisk::LowDraftAngle { angle: 0.5 }
            .to_string()
            .starts_with("Low draft angle (0.5°)"));
    }

    #[test]
    fn test_angled_feature_needs_special_tool() {
        let a = analyzer();
        let access = a.accessibility_for_direction(&Vector3D::new(0.0, 0.5_f64.sqrt(), 0.5_f64.sqrt()));
        assert_eq!(access.approach, Accessibility::Angled);
        assert!(access.requires_special_tool);
        assert!((access.recommended_tool_angle - 45.0).abs() < 1e-6);

        let access = a.accessibility_for_direction(&Vector3D::new(0.0, 0.0, 1.0));
        assert_eq!(access.approach, Accessibility::Top);
        assert!(!access.requires_special_tool);
    }
}
