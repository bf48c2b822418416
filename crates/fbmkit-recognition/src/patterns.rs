//! Pattern recognition over recognized features.
//!
//! Features are grouped by type in order of first appearance. Each group is
//! scanned for linear, circular, grid and mirror arrangements of feature
//! centers. Pattern kinds are independent: one feature may take part in
//! several patterns, and [`assign_pattern_ids`] keeps the first one.

use crate::feature::{Feature, FeatureId, FeatureType, PatternId};
use fbmkit_core::{Point3D, Vector3D};
use fbmkit_settings::PatternSettings;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternType {
    Linear,
    Circular,
    Grid,
    Mirror,
    None,
}

impl fmt::Display for PatternType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Linear => "Linear Pattern",
            Self::Circular => "Circular Pattern (Bolt Circle)",
            Self::Grid => "Grid Pattern (2D Array)",
            Self::Mirror => "Mirror Symmetry",
            Self::None => "No Pattern",
        };
        write!(f, "{}", s)
    }
}

/// Axis plane through the origin used for mirror matching
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MirrorPlane {
    XY,
    XZ,
    YZ,
}

impl MirrorPlane {
    pub const ALL: [MirrorPlane; 3] = [MirrorPlane::XY, MirrorPlane::XZ, MirrorPlane::YZ];

    pub fn normal(&self) -> Vector3D {
        match self {
            Self::XY => Vector3D::new(0.0, 0.0, 1.0),
            Self::XZ => Vector3D::new(0.0, 1.0, 0.0),
            Self::YZ => Vector3D::new(1.0, 0.0, 0.0),
        }
    }

    pub fn reflect(&self, p: &Point3D) -> Point3D {
        match self {
            Self::XY => Point3D::new(p.x, p.y, -p.z),
            Self::XZ => Point3D::new(p.x, -p.y, p.z),
            Self::YZ => Point3D::new(-p.x, p.y, p.z),
        }
    }
}

/// A group of same-type features in a regular arrangement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeaturePattern {
    /// Assigned by [`PatternRecognizer::recognize_all_patterns`], starting at 1.
    /// Patterns returned by the individual detectors carry 0.
    pub id: PatternId,
    pub pattern_type: PatternType,
    pub feature_type: FeatureType,
    pub feature_ids: Vec<FeatureId>,
    pub pattern_count: usize,
    /// Mean spacing (linear) or smaller grid pitch (grid)
    pub spacing: Option<f64>,
    /// Degrees between members (circular)
    pub angle: Option<f64>,
    /// Circle center (circular)
    pub center: Option<Point3D>,
    /// Unit row direction (linear) or mirror plane normal (mirror)
    pub direction: Option<Vector3D>,
    pub mirror_plane: Option<MirrorPlane>,
    pub confidence: f64,
}

impl FeaturePattern {
    fn new(
        pattern_type: PatternType,
        feature_type: FeatureType,
        feature_ids: Vec<FeatureId>,
        confidence: f64,
    ) -> Self {
        let pattern_count = feature_ids.len();
        Self {
            id: 0,
            pattern_type,
            feature_type,
            feature_ids,
            pattern_count,
            spacing: None,
            angle: None,
            center: None,
            direction: None,
            mirror_plane: None,
            confidence: if confidence.is_finite() {
                confidence.clamp(0.0, 1.0)
            } else {
                0.0
            },
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PatternRecognizer {
    settings: PatternSettings,
}

impl PatternRecognizer {
    pub fn new(settings: PatternSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &PatternSettings {
        &self.settings
    }

    /// Every pattern in every type group, numbered in discovery order
    pub fn recognize_all_patterns(&self, features: &[Feature]) -> Vec<FeaturePattern> {
        let mut patterns = Vec::new();

        for (feature_type, group) in group_by_type(features) {
            if group.len() < self.settings.min_pattern_count {
                continue;
            }
            let before = patterns.len();
            patterns.extend(self.detect_linear_patterns(&group));
            patterns.extend(self.detect_circular_patterns(&group));
            patterns.extend(self.detect_grid_patterns(&group));
            patterns.extend(self.detect_mirror_patterns(&group));
            tracing::debug!(
                "{} group of {}: {} patterns",
                feature_type,
                group.len(),
                patterns.len() - before
            );
        }

        for (index, pattern) in patterns.iter_mut().enumerate() {
            pattern.id = index as PatternId + 1;
        }
        patterns
    }

    /// Rows of evenly spaced features.
    ///
    /// Every pair seeds a line; features within the position tolerance of it
    /// join. The row is kept when the gaps between neighbours deviate from
    /// their mean by less than the tolerance. Members are not reused.
    pub fn detect_linear_patterns(&self, features: &[&Feature]) -> Vec<FeaturePattern> {
        let s = &self.settings;
        let mut patterns = Vec::new();
        if features.len() < s.min_pattern_count {
            return patterns;
        }

        let centers: Vec<Point3D> = features.iter().map(|f| f.center).collect();
        let mut used = BTreeSet::new();

        for i in 0..features.len() {
            if used.contains(&i) {
                continue;
            }
            for j in i + 1..features.len() {
                if used.contains(&j) {
                    continue;
                }
                let offset = centers[j] - centers[i];
                let seed_spacing = offset.norm();
                if seed_spacing < s.min_spacing {
                    continue;
                }
                let direction = offset / seed_spacing;

                let mut members = vec![i, j];
                members.extend((0..features.len()).filter(|&k| {
                    k != i
                        && k != j
                        && !used.contains(&k)
                        && distance_to_line(&centers[i], &direction, &centers[k])
                            < s.position_tolerance
                }));
                if members.len() < s.min_pattern_count {
                    continue;
                }

                members.sort_by(|&a, &b| {
                    let ta = (centers[a] - centers[i]).dot(&direction);
                    let tb = (centers[b] - centers[i]).dot(&direction);
                    ta.total_cmp(&tb)
                });
                let gaps: Vec<f64> = members
                    .windows(2)
                    .map(|w| (centers[w[1]] - centers[w[0]]).norm())
                    .collect();
                let mean = gaps.iter().sum::<f64>() / gaps.len() as f64;
                let max_deviation = gaps.iter().map(|g| (g - mean).abs()).fold(0.0, f64::max);
                if max_deviation >= s.position_tolerance || mean <= 0.0 {
                    continue;
                }

                let mut pattern = FeaturePattern::new(
                    PatternType::Linear,
                    features[i].feature_type,
                    members.iter().map(|&m| features[m].id).collect(),
                    1.0 - max_deviation / mean,
                );
                pattern.spacing = Some(mean);
                pattern.direction = Some(direction);
                patterns.push(pattern);
                used.extend(members);
                break;
            }
        }
        patterns
    }

    /// Features on a common circle, fitted through the XY projection of the
    /// first non-collinear triple. Only the first fit per group is reported.
    pub fn detect_circular_patterns(&self, features: &[&Feature]) -> Vec<FeaturePattern> {
        let s = &self.settings;
        let n = features.len();
        if n < s.circular_min_count.max(3) {
            return Vec::new();
        }

        let centers: Vec<Point3D> = features.iter().map(|f| f.center).collect();
        for i in 0..n {
            for j in i + 1..n {
                for k in j + 1..n {
                    let Some(center) =
                        circle_center_xy(&centers[i], &centers[j], &centers[k], s.collinear_epsilon)
                    else {
                        continue;
                    };
                    let radius = (centers[i] - center).norm();
                    if !radius.is_finite() {
                        continue;
                    }

                    let mut members = vec![i, j, k];
                    members.extend((0..n).filter(|&m| {
                        m != i
                            && m != j
                            && m != k
                            && ((centers[m] - center).norm() - radius).abs() < s.position_tolerance
                    }));
                    if members.len() < s.circular_min_count {
                        continue;
                    }

                    let mut pattern = FeaturePattern::new(
                        PatternType::Circular,
                        features[i].feature_type,
                        members.iter().map(|&m| features[m].id).collect(),
                        s.circular_confidence,
                    );
                    pattern.angle = Some(360.0 / members.len() as f64);
                    pattern.center = Some(center);
                    return vec![pattern];
                }
            }
        }
        Vec::new()
    }

    /// A grid over the whole group when both X and Y offsets between
    /// same-height features have a dominant value
    pub fn detect_grid_patterns(&self, features: &[&Feature]) -> Vec<FeaturePattern> {
        let s = &self.settings;
        if features.len() < s.grid_min_count.max(4) {
            return Vec::new();
        }

        let mut x_spacings = Vec::new();
        let mut y_spacings = Vec::new();
        for (i, a) in features.iter().enumerate() {
            for b in &features[i + 1..] {
                let d = b.center - a.center;
                if d.z.abs() >= s.position_tolerance {
                    continue;
                }
                if d.x.abs() > s.min_spacing {
                    x_spacings.push(d.x.abs());
                }
                if d.y.abs() > s.min_spacing {
                    y_spacings.push(d.y.abs());
                }
            }
        }

        let x = self.dominant_spacing(&x_spacings);
        let y = self.dominant_spacing(&y_spacings);
        match (x, y) {
            (Some(x), Some(y)) => {
                let mut pattern = FeaturePattern::new(
                    PatternType::Grid,
                    features[0].feature_type,
                    features.iter().map(|f| f.id).collect(),
                    s.grid_confidence,
                );
                pattern.spacing = Some(x.min(y));
                vec![pattern]
            }
            _ => Vec::new(),
        }
    }

    /// Pairs of features reflected across each axis plane through the origin.
    /// One pattern per plane with at least one pair.
    pub fn detect_mirror_patterns(&self, features: &[&Feature]) -> Vec<FeaturePattern> {
        let s = &self.settings;
        if features.len() < 2 {
            return Vec::new();
        }

        let mut patterns = Vec::new();
        for plane in MirrorPlane::ALL {
            let mut used = BTreeSet::new();
            let mut ids = Vec::new();

            for i in 0..features.len() {
                if used.contains(&i) {
                    continue;
                }
                let mirrored = plane.reflect(&features[i].center);
                let partner = (i + 1..features.len()).find(|&j| {
                    !used.contains(&j)
                        && (features[j].center - mirrored).norm() < s.position_tolerance
                });
                if let Some(j) = partner {
                    used.insert(i);
                    used.insert(j);
                    ids.push(features[i].id);
                    ids.push(features[j].id);
                }
            }

            if !ids.is_empty() {
                let mut pattern = FeaturePattern::new(
                    PatternType::Mirror,
                    features[0].feature_type,
                    ids,
                    s.mirror_confidence,
                );
                pattern.direction = Some(plane.normal());
                pattern.mirror_plane = Some(plane);
                patterns.push(pattern);
            }
        }
        patterns
    }

    /// Mean of the largest group of near-equal values. Groups are keyed by
    /// their first value; ties go to the group formed first. Needs at least
    /// two values in the winning group.
    pub fn dominant_spacing(&self, spacings: &[f64]) -> Option<f64> {
        let tolerance = self.settings.position_tolerance;
        let mut groups: Vec<(f64, Vec<f64>)> = Vec::new();
        for &spacing in spacings {
            match groups.iter_mut().find(|(key, _)| (spacing - key).abs() < tolerance) {
                Some((_, members)) => members.push(spacing),
                None => groups.push((spacing, vec![spacing])),
            }
        }

        let largest = groups
            .iter()
            .fold(None::<&Vec<f64>>, |best, (_, members)| match best {
                Some(b) if b.len() >= members.len() => Some(b),
                _ => Some(members),
            })?;
        (largest.len() >= 2).then(|| largest.iter().sum::<f64>() / largest.len() as f64)
    }
}

/// Record each feature's first pattern. Returns how many features changed.
pub fn assign_pattern_ids(features: &mut [Feature], patterns: &[FeaturePattern]) -> usize {
    let mut assigned = 0;
    for pattern in patterns {
        for feature in features.iter_mut() {
            if feature.pattern_id.is_none() && pattern.feature_ids.contains(&feature.id) {
                feature.pattern_id = Some(pattern.id);
                assigned += 1;
            }
        }
    }
    assigned
}

/// Features grouped by type, groups in order of first appearance
fn group_by_type(features: &[Feature]) -> Vec<(FeatureType, Vec<&Feature>)> {
    let mut groups: Vec<(FeatureType, Vec<&Feature>)> = Vec::new();
    for feature in features {
        match groups.iter_mut().find(|(t, _)| *t == feature.feature_type) {
            Some((_, members)) => members.push(feature),
            None => groups.push((feature.feature_type, vec![feature])),
        }
    }
    groups
}

fn distance_to_line(origin: &Point3D, direction: &Vector3D, p: &Point3D) -> f64 {
    let v = p - origin;
    (v - direction * v.dot(direction)).norm()
}

/// Circle through three points projected on XY, at their mean height.
/// `None` when the points are collinear in XY.
fn circle_center_xy(p1: &Point3D, p2: &Point3D, p3: &Point3D, epsilon: f64) -> Option<Point3D> {
    let (x1, y1, x2, y2, x3, y3) = (p1.x, p1.y, p2.x, p2.y, p3.x, p3.y);
    let d = 2.0 * (x1 * (y2 - y3) + x2 * (y3 - y1) + x3 * (y1 - y2));
    if d.abs() < epsilon {
        return None;
    }
    let s1 = x1 * x1 + y1 * y1;
    let s2 = x2 * x2 + y2 * y2;
    let s3 = x3 * x3 + y3 * y3;
    let ux = (s1 * (y2 - y3) + s2 * (y3 - y1) + s3 * (y1 - y2)) / d;
    let uy = (s1 * (x3 - x2) + s2 * (x1 - x3) + s3 * (x2 - x1)) / d;
    Some(Point3D::new(ux, uy, (p1.z + p2.z + p3.z) / 3.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::FeatureGeometry;
    use fbmkit_core::{BoundingBox, FaceId};

    fn hole(id: FeatureId, x: f64, y: f64, z: f64) -> Feature {
        let center = Point3D::new(x, y, z);
        Feature::new(
            id,
            FeatureType::HoleThrough,
            FeatureGeometry::Face {
                face: FaceId(id),
                normal: Vector3D::new(0.0, 0.0, 1.0),
            },
            center,
            BoundingBox::from_center(center, Vector3D::repeat(2.0)),
        )
    }

    fn recognizer() -> PatternRecognizer {
        PatternRecognizer::new(PatternSettings::default())
    }

    #[test]
    fn test_linear_row() {
        let features: Vec<_> = (0..4).map(|i| hole(i + 1, 10.0 + 10.0 * i as f64, 5.0, 0.0)).collect();
        let refs: Vec<&Feature> = features.iter().collect();
        let patterns = recognizer().detect_linear_patterns(&refs);

        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].feature_ids, vec![1, 2, 3, 4]);
        assert!((patterns[0].spacing.unwrap_or_default() - 10.0).abs() < 1e-9);
        assert!((patterns[0].confidence - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_linear_members_sorted_along_row() {
        let features = vec![
            hole(1, 30.0, 0.0, 0.0),
            hole(2, 10.0, 0.0, 0.0),
            hole(3, 20.0, 0.0, 0.0),
        ];
        let refs: Vec<&Feature> = features.iter().collect();
        let patterns = recognizer().detect_linear_patterns(&refs);
        assert_eq!(patterns[0].feature_ids, vec![2, 3, 1]);
    }

    #[test]
    fn test_uneven_row_is_rejected_then_pairs_form() {
        let features = vec![
            hole(1, 0.0, 10.0, 0.0),
            hole(2, 10.0, 10.0, 0.0),
            hole(3, 25.0, 10.0, 0.0),
        ];
        let refs: Vec<&Feature> = features.iter().collect();
        let patterns = recognizer().detect_linear_patterns(&refs);
        // every seed line picks up the third point, giving gaps of 10 and 15
        assert!(patterns.is_empty());
    }

    #[test]
    fn test_circle_center() {
        let c = circle_center_xy(
            &Point3D::new(1.0, 0.0, 0.0),
            &Point3D::new(0.0, 1.0, 3.0),
            &Point3D::new(-1.0, 0.0, 0.0),
            0.001,
        );
        let c = c.unwrap_or_else(|| panic!("expected a circle"));
        assert!(c.x.abs() < 1e-12 && c.y.abs() < 1e-12);
        assert!((c.z - 1.0).abs() < 1e-12);

        assert!(circle_center_xy(
            &Point3D::new(0.0, 0.0, 0.0),
            &Point3D::new(1.0, 1.0, 0.0),
            &Point3D::new(2.0, 2.0, 0.0),
            0.001
        )
        .is_none());
    }

    #[test]
    fn test_dominant_spacing_prefers_first_largest_group() {
        let r = recognizer();
        assert_eq!(r.dominant_spacing(&[]), None);
        assert_eq!(r.dominant_spacing(&[5.0, 9.0]), None);
        let d = r.dominant_spacing(&[5.0, 9.0, 5.2, 9.1]).unwrap_or_default();
        assert!((d - 5.1).abs() < 1e-9);
    }

    #[test]
    fn test_mirror_planes() {
        let features = vec![hole(1, -20.0, 5.0, 0.0), hole(2, 20.0, 5.0, 0.0)];
        let refs: Vec<&Feature> = features.iter().collect();
        let patterns = recognizer().detect_mirror_patterns(&refs);

        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].mirror_plane, Some(MirrorPlane::YZ));
        assert_eq!(patterns[0].direction, Some(Vector3D::new(1.0, 0.0, 0.0)));
        assert_eq!(patterns[0].feature_ids, vec![1, 2]);
    }

    #[test]
    fn test_groups_and_ids() {
        let mut features: Vec<_> = (0..3).map(|i| hole(i + 1, 10.0 * i as f64 + 5.0, 5.0, 0.0)).collect();
        let mut blind = hole(4, 50.0, 50.0, 0.0);
        blind.feature_type = FeatureType::HoleBlind;
        features.push(blind);

        let patterns = recognizer().recognize_all_patterns(&features);
        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].id, 1);
        assert_eq!(patterns[0].feature_type, FeatureType::HoleThrough);

        assert_eq!(assign_pattern_ids(&mut features, &patterns), 3);
        assert_eq!(features[0].pattern_id, Some(1));
        assert_eq!(features[3].pattern_id, None);
    }

    #[test]
    fn test_first_pattern_wins() {
        let mut features = vec![hole(1, 0.0, 0.0, 0.0), hole(2, 1.0, 0.0, 0.0)];
        let mut a = FeaturePattern::new(PatternType::Linear, FeatureType::HoleThrough, vec![1, 2], 1.0);
        a.id = 1;
        let mut b = FeaturePattern::new(PatternType::Mirror, FeatureType::HoleThrough, vec![2], 1.0);
        b.id = 2;
        assign_pattern_ids(&mut features, &[a, b]);
        assert_eq!(features[1].pattern_id, Some(1));
    }
}
