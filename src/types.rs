//! Request and response types for the severity API.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Fixed cutoff separating high from low severity.
pub const SEVERITY_THRESHOLD: f64 = 50.0;

/// Discriminated severity classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeverityLabel {
    Low,
    High,
}

impl SeverityLabel {
    /// Classify a percentage score against the fixed threshold.
    pub fn from_score(score: f64) -> Self {
        if score > SEVERITY_THRESHOLD {
            SeverityLabel::High
        } else {
            SeverityLabel::Low
        }
    }
}

impl fmt::Display for SeverityLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeverityLabel::Low => write!(f, "low"),
            SeverityLabel::High => write!(f, "high"),
        }
    }
}

/// Canonical prediction response: an explicit label plus the raw
/// percentage score, so consumers never have to guess the shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictResponse {
    pub severity_label: SeverityLabel,
    pub severity_score: f64,
}

/// A stored prediction, as returned by `GET /api/history`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub input: serde_json::Value,
    pub processed: serde_json::Value,
    pub prediction: f64,
    pub timestamp: String,
}

/// Registration request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Login request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Public user details.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInfo {
    pub email: String,
    pub name: String,
}

/// Successful login response. The token is the session credential the
/// server validates on every protected request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub status: String,
    pub message: String,
    pub user: UserInfo,
    pub token: String,
}

/// Change-password request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangePasswordRequest {
    pub email: String,
    pub current_password: String,
    pub new_password: String,
}

/// Generic status + message response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub status: String,
    pub message: String,
}

impl MessageResponse {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: "success".to_string(),
            message: message.into(),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// API error response body. The human-readable text lives in
/// `message`, which is where clients look after `error`; the HTTP
/// status line never goes in either field.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_threshold() {
        assert_eq!(SeverityLabel::from_score(50.0), SeverityLabel::Low);
        assert_eq!(SeverityLabel::from_score(50.01), SeverityLabel::High);
        assert_eq!(SeverityLabel::from_score(0.0), SeverityLabel::Low);
        assert_eq!(SeverityLabel::from_score(100.0), SeverityLabel::High);
    }

    #[test]
    fn test_label_wire_format() {
        let json = serde_json::to_string(&PredictResponse {
            severity_label: SeverityLabel::High,
            severity_score: 72.5,
        })
        .unwrap();
        assert!(json.contains("\"severity_label\":\"high\""));
        assert!(json.contains("\"severity_score\":72.5"));
    }
}
