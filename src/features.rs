//! Feature engineering for the severity model.
//!
//! Turns a raw accident scenario into the 19 engineered columns the
//! model scores: numeric passthroughs, Yes/No flags, one-hot road
//! type / lighting / weather, and a cyclic time-of-day encoding.

use serde::{Deserialize, Deserializer, Serialize};
use std::f64::consts::PI;
use thiserror::Error;

/// Feature names in model input order.
pub const FEATURE_NAMES: [&str; 19] = [
    "num_lanes",
    "curvature",
    "speed_limit",
    "road_signs_present",
    "public_road",
    "holiday",
    "school_season",
    "num_reported_accidents",
    "rt_highway",
    "rt_rural",
    "rt_urban",
    "lt_daylight",
    "lt_dim",
    "lt_night",
    "wtr_clear",
    "wtr_foggy",
    "wtr_rainy",
    "time_sin",
    "time_cos",
];

/// Number of model input features.
pub const NUM_FEATURES: usize = 19;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoadType {
    Highway,
    Urban,
    Rural,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lighting {
    Daylight,
    Dim,
    Night,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Weather {
    Clear,
    Rainy,
    Foggy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeOfDay {
    Morning,
    Afternoon,
    Evening,
}

impl TimeOfDay {
    /// Ordinal position in the 3-slot day cycle.
    fn index(self) -> f64 {
        match self {
            TimeOfDay::Morning => 0.0,
            TimeOfDay::Afternoon => 1.0,
            TimeOfDay::Evening => 2.0,
        }
    }
}

/// Wire values are "Yes" / "No", as the form sends them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum YesNo {
    Yes,
    No,
}

impl YesNo {
    fn as_f64(self) -> f64 {
        match self {
            YesNo::Yes => 1.0,
            YesNo::No => 0.0,
        }
    }
}

/// Raw prediction request as submitted by the form.
///
/// Every field must be present. Categorical fields reject values
/// outside their enumerated set at deserialization. Numeric fields are
/// lenient on purpose: a malformed numeric string coerces to `None`
/// (serialized back out as `null`), matching the form's behavior of
/// shipping unvalidated input and letting the server reject it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioInput {
    pub road_type: RoadType,
    #[serde(deserialize_with = "lenient_number")]
    pub num_lanes: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub curvature: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub speed_limit: Option<f64>,
    pub lighting: Lighting,
    pub weather: Weather,
    pub road_signs_present: YesNo,
    pub public_road: YesNo,
    pub time_of_day: TimeOfDay,
    pub holiday: YesNo,
    pub school_season: YesNo,
    #[serde(deserialize_with = "lenient_number")]
    pub num_reported_accidents: Option<f64>,
}

/// Accept a JSON number or a numeric string; anything else is `None`.
fn lenient_number<'de, D>(de: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(de)?;
    Ok(match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    })
}

/// Validation error for numeric scenario fields.
#[derive(Debug, Error)]
pub enum FeatureError {
    #[error("field '{0}' is missing or not a finite number")]
    NotFinite(&'static str),
}

fn finite(value: Option<f64>, field: &'static str) -> Result<f64, FeatureError> {
    match value {
        Some(v) if v.is_finite() => Ok(v),
        _ => Err(FeatureError::NotFinite(field)),
    }
}

impl ScenarioInput {
    /// Build the engineered feature vector, rejecting null or
    /// non-finite numeric fields.
    pub fn to_features(&self) -> Result<FeatureVector, FeatureError> {
        let angle = 2.0 * PI * self.time_of_day.index() / 3.0;

        Ok(FeatureVector {
            num_lanes: finite(self.num_lanes, "num_lanes")?,
            curvature: finite(self.curvature, "curvature")?,
            speed_limit: finite(self.speed_limit, "speed_limit")?,
            road_signs_present: self.road_signs_present.as_f64(),
            public_road: self.public_road.as_f64(),
            holiday: self.holiday.as_f64(),
            school_season: self.school_season.as_f64(),
            num_reported_accidents: finite(
                self.num_reported_accidents,
                "num_reported_accidents",
            )?,
            rt_highway: (self.road_type == RoadType::Highway) as u8 as f64,
            rt_rural: (self.road_type == RoadType::Rural) as u8 as f64,
            rt_urban: (self.road_type == RoadType::Urban) as u8 as f64,
            lt_daylight: (self.lighting == Lighting::Daylight) as u8 as f64,
            lt_dim: (self.lighting == Lighting::Dim) as u8 as f64,
            lt_night: (self.lighting == Lighting::Night) as u8 as f64,
            wtr_clear: (self.weather == Weather::Clear) as u8 as f64,
            wtr_foggy: (self.weather == Weather::Foggy) as u8 as f64,
            wtr_rainy: (self.weather == Weather::Rainy) as u8 as f64,
            time_sin: angle.sin(),
            time_cos: angle.cos(),
        })
    }
}

/// Engineered features in model input order.
#[derive(Debug, Clone, Default)]
pub struct FeatureVector {
    pub num_lanes: f64,
    pub curvature: f64,
    pub speed_limit: f64,
    pub road_signs_present: f64,
    pub public_road: f64,
    pub holiday: f64,
    pub school_season: f64,
    pub num_reported_accidents: f64,
    pub rt_highway: f64,
    pub rt_rural: f64,
    pub rt_urban: f64,
    pub lt_daylight: f64,
    pub lt_dim: f64,
    pub lt_night: f64,
    pub wtr_clear: f64,
    pub wtr_foggy: f64,
    pub wtr_rainy: f64,
    pub time_sin: f64,
    pub time_cos: f64,
}

impl FeatureVector {
    /// Convert to array in model input order.
    pub fn to_array(&self) -> [f64; NUM_FEATURES] {
        [
            self.num_lanes,
            self.curvature,
            self.speed_limit,
            self.road_signs_present,
            self.public_road,
            self.holiday,
            self.school_season,
            self.num_reported_accidents,
            self.rt_highway,
            self.rt_rural,
            self.rt_urban,
            self.lt_daylight,
            self.lt_dim,
            self.lt_night,
            self.wtr_clear,
            self.wtr_foggy,
            self.wtr_rainy,
            self.time_sin,
            self.time_cos,
        ]
    }

    /// Named feature map for the history record. Non-finite values are
    /// sanitized to `null` so the stored JSON always parses.
    pub fn to_map(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        for (name, value) in FEATURE_NAMES.iter().zip(self.to_array()) {
            let json = serde_json::Number::from_f64(value)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null);
            map.insert((*name).to_string(), json);
        }
        serde_json::Value::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ScenarioInput {
        serde_json::from_value(serde_json::json!({
            "road_type": "highway",
            "num_lanes": 4,
            "curvature": 0.2,
            "speed_limit": 100,
            "lighting": "night",
            "weather": "rainy",
            "road_signs_present": "Yes",
            "public_road": "Yes",
            "time_of_day": "evening",
            "holiday": "No",
            "school_season": "Yes",
            "num_reported_accidents": 12
        }))
        .unwrap()
    }

    #[test]
    fn test_feature_names_len() {
        assert_eq!(FEATURE_NAMES.len(), NUM_FEATURES);
        assert_eq!(FEATURE_NAMES[0], "num_lanes");
        assert_eq!(FEATURE_NAMES[18], "time_cos");
    }

    #[test]
    fn test_one_hot_encoding() {
        let features = sample().to_features().unwrap();
        assert_eq!(features.rt_highway, 1.0);
        assert_eq!(features.rt_rural, 0.0);
        assert_eq!(features.rt_urban, 0.0);
        assert_eq!(features.lt_night, 1.0);
        assert_eq!(features.wtr_rainy, 1.0);
        assert_eq!(features.road_signs_present, 1.0);
        assert_eq!(features.holiday, 0.0);
    }

    #[test]
    fn test_time_cycle_encoding() {
        let mut input = sample();
        input.time_of_day = TimeOfDay::Morning;
        let morning = input.to_features().unwrap();
        assert!((morning.time_sin - 0.0).abs() < 1e-9);
        assert!((morning.time_cos - 1.0).abs() < 1e-9);

        input.time_of_day = TimeOfDay::Evening;
        let evening = input.to_features().unwrap();
        let angle = 2.0 * PI * 2.0 / 3.0;
        assert!((evening.time_sin - angle.sin()).abs() < 1e-9);
        assert!((evening.time_cos - angle.cos()).abs() < 1e-9);
    }

    #[test]
    fn test_numeric_string_coerces() {
        let input: ScenarioInput = serde_json::from_value(serde_json::json!({
            "road_type": "urban",
            "num_lanes": "3",
            "curvature": "0.5",
            "speed_limit": "60",
            "lighting": "dim",
            "weather": "clear",
            "road_signs_present": "No",
            "public_road": "Yes",
            "time_of_day": "morning",
            "holiday": "No",
            "school_season": "No",
            "num_reported_accidents": "2"
        }))
        .unwrap();
        assert_eq!(input.num_lanes, Some(3.0));
        assert_eq!(input.speed_limit, Some(60.0));
        assert!(input.to_features().is_ok());
    }

    #[test]
    fn test_malformed_numeric_becomes_null() {
        let mut raw = serde_json::json!({
            "road_type": "urban",
            "num_lanes": "",
            "curvature": 0.5,
            "speed_limit": 60,
            "lighting": "dim",
            "weather": "clear",
            "road_signs_present": "No",
            "public_road": "Yes",
            "time_of_day": "morning",
            "holiday": "No",
            "school_season": "No",
            "num_reported_accidents": 2
        });
        let input: ScenarioInput = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(input.num_lanes, None);

        // Round-trips as null, and feature building rejects it.
        let wire = serde_json::to_value(&input).unwrap();
        assert!(wire["num_lanes"].is_null());
        let err = input.to_features().unwrap_err();
        assert!(err.to_string().contains("num_lanes"));

        // A present-but-null field behaves the same way.
        raw["num_lanes"] = serde_json::Value::Null;
        let input: ScenarioInput = serde_json::from_value(raw).unwrap();
        assert_eq!(input.num_lanes, None);
    }

    #[test]
    fn test_unknown_category_rejected() {
        let result: Result<ScenarioInput, _> = serde_json::from_value(serde_json::json!({
            "road_type": "motorway",
            "num_lanes": 2,
            "curvature": 0.1,
            "speed_limit": 50,
            "lighting": "dim",
            "weather": "clear",
            "road_signs_present": "No",
            "public_road": "Yes",
            "time_of_day": "morning",
            "holiday": "No",
            "school_season": "No",
            "num_reported_accidents": 0
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_field_rejected() {
        let result: Result<ScenarioInput, _> = serde_json::from_value(serde_json::json!({
            "road_type": "urban",
            "curvature": 0.1
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_to_map_matches_feature_names() {
        let features = sample().to_features().unwrap();
        let map = features.to_map();
        let obj = map.as_object().unwrap();
        assert_eq!(obj.len(), NUM_FEATURES);
        for name in FEATURE_NAMES {
            assert!(obj.contains_key(name), "missing {}", name);
        }
        assert_eq!(obj["speed_limit"], serde_json::json!(100.0));
    }
}
