//! Severity scoring model.
//!
//! A logistic scorer over the 19 engineered features. Ships with
//! built-in coefficients; a fitted set can be loaded from a JSON
//! weights file instead.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::features::{FeatureVector, NUM_FEATURES};

/// Logistic regression coefficients in feature order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeverityWeights {
    pub bias: f64,
    pub weights: [f64; NUM_FEATURES],
}

impl Default for SeverityWeights {
    fn default() -> Self {
        Self {
            bias: -3.0,
            weights: [
                -0.10, // num_lanes
                1.20,  // curvature
                0.035, // speed_limit
                -0.40, // road_signs_present
                0.15,  // public_road
                0.20,  // holiday
                0.25,  // school_season
                0.06,  // num_reported_accidents
                0.50,  // rt_highway
                0.30,  // rt_rural
                -0.20, // rt_urban
                -0.50, // lt_daylight
                0.20,  // lt_dim
                0.60,  // lt_night
                -0.40, // wtr_clear
                0.50,  // wtr_foggy
                0.35,  // wtr_rainy
                0.10,  // time_sin
                -0.10, // time_cos
            ],
        }
    }
}

/// Severity model wrapper.
pub struct SeverityModel {
    weights: SeverityWeights,
}

impl SeverityModel {
    /// Load weights from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read weights file: {}", path.as_ref().display()))?;
        let weights: SeverityWeights =
            serde_json::from_str(&raw).context("Failed to parse weights file")?;
        Ok(Self { weights })
    }

    /// Model with built-in default coefficients.
    pub fn with_defaults() -> Self {
        Self {
            weights: SeverityWeights::default(),
        }
    }

    /// Score a feature vector as a severity percentage (0-100),
    /// rounded to two decimals.
    pub fn score(&self, features: &FeatureVector) -> f64 {
        let x = features.to_array();
        let z: f64 = self.weights.bias
            + x.iter()
                .zip(self.weights.weights.iter())
                .map(|(a, b)| a * b)
                .sum::<f64>();
        let p = 1.0 / (1.0 + (-z).exp());
        (p * 10_000.0).round() / 100.0
    }
}

/// Thread-safe model wrapper for use in web handlers.
pub type SharedModel = Arc<SeverityModel>;

/// Create a shared model, preferring a weights file when configured.
pub fn create_shared_model(weights_path: Option<&str>) -> Result<SharedModel> {
    let model = match weights_path {
        Some(path) => SeverityModel::from_file(path)?,
        None => SeverityModel::with_defaults(),
    };
    Ok(Arc::new(model))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FEATURE_NAMES;
    use crate::types::SeverityLabel;

    #[test]
    fn test_weights_match_feature_count() {
        let weights = SeverityWeights::default();
        assert_eq!(weights.weights.len(), FEATURE_NAMES.len());
    }

    #[test]
    fn test_score_range() {
        let model = SeverityModel::with_defaults();
        let features = FeatureVector {
            speed_limit: 120.0,
            num_lanes: 2.0,
            curvature: 0.9,
            lt_night: 1.0,
            wtr_foggy: 1.0,
            rt_highway: 1.0,
            num_reported_accidents: 30.0,
            ..Default::default()
        };
        let score = model.score(&features);
        assert!((0.0..=100.0).contains(&score));
    }

    #[test]
    fn test_higher_speed_scores_higher() {
        let model = SeverityModel::with_defaults();
        let slow = FeatureVector {
            speed_limit: 30.0,
            ..Default::default()
        };
        let fast = FeatureVector {
            speed_limit: 130.0,
            ..Default::default()
        };
        assert!(model.score(&fast) > model.score(&slow));
    }

    #[test]
    fn test_hazardous_scenario_classifies_high() {
        let model = SeverityModel::with_defaults();
        let features = FeatureVector {
            speed_limit: 130.0,
            curvature: 1.0,
            num_lanes: 2.0,
            rt_highway: 1.0,
            lt_night: 1.0,
            wtr_foggy: 1.0,
            num_reported_accidents: 40.0,
            public_road: 1.0,
            school_season: 1.0,
            ..Default::default()
        };
        let score = model.score(&features);
        assert_eq!(SeverityLabel::from_score(score), SeverityLabel::High);
    }

    #[test]
    fn test_score_rounded_to_two_decimals() {
        let model = SeverityModel::with_defaults();
        let score = model.score(&FeatureVector::default());
        assert!(((score * 100.0).round() - score * 100.0).abs() < 1e-9);
    }
}
