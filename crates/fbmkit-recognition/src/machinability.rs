//! Per-feature machining difficulty on a 1-10 scale

use crate::feature::{Accessibility, Feature};
use fbmkit_settings::MachinabilitySettings;
use serde::{Deserialize, Serialize};
use std::fmt;

const MAX_SCORE: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Moderate,
    Difficult,
    #[serde(rename = "Very Difficult")]
    VeryDifficult,
}

impl Difficulty {
    pub fn from_score(score: f64) -> Self {
        if score < 3.0 {
            Self::Easy
        } else if score < 5.0 {
            Self::Moderate
        } else if score < 7.0 {
            Self::Difficult
        } else {
            Self::VeryDifficult
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Easy => "Easy",
            Self::Moderate => "Moderate",
            Self::Difficult => "Difficult",
            Self::VeryDifficult => "Very Difficult",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachinabilityScore {
    /// 1.0 (easy) to 10.0 (very difficult)
    pub score: f64,
    pub difficulty: Difficulty,
    /// Reasons that raised the score, in evaluation order
    pub factors: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct MachinabilityScorer {
    settings: MachinabilitySettings,
}

impl MachinabilityScorer {
    pub fn new(settings: MachinabilitySettings) -> Self {
        Self { settings }
    }

    /// Material configured for the run
    pub fn default_material(&self) -> &str {
        &self.settings.material_hardness
    }

    pub fn score_feature(&self, feature: &Feature, material_hardness: &str) -> MachinabilityScore {
        let s = &self.settings;
        let d = &feature.dimensions;
        let mut score = 1.0;
        let mut factors = Vec::new();

        if let (Some(depth), Some(diameter)) = (d.depth, d.diameter) {
            if depth > diameter * s.deep_ratio {
                score += 2.0;
                factors.push(format!("Deep feature (L/D > {})", s.deep_ratio));
            }
        }

        if d.diameter.is_some_and(|dia| dia < s.small_diameter) {
            score += 1.5;
            factors.push(format!("Small diameter (< {}mm)", s.small_diameter));
        }

        if material_hardness.contains("HRC") || material_hardness.to_lowercase().contains("hard") {
            score += 2.0;
            factors.push("Hard material".to_string());
        }

        if feature.tolerance.is_tight() {
            score += 1.0;
            factors.push("Tight tolerance".to_string());
        }

        if matches!(
            feature.accessibility,
            Accessibility::Bottom | Accessibility::Angled
        ) {
            score += 1.5;
            factors.push("Poor accessibility".to_string());
        }

        let score = f64::min(score, MAX_SCORE);
        MachinabilityScore {
            score,
            difficulty: Difficulty::from_score(score),
            factors,
        }
    }

    /// Score against the configured material
    pub fn score_with_default_material(&self, feature: &Feature) -> MachinabilityScore {
        self.score_feature(feature, &self.settings.material_hardness)
    }
}
