//! API route handlers.

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{Duration, Utc};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::auth;
use crate::config::AppConfig;
use crate::features::ScenarioInput;
use crate::model::SharedModel;
use crate::storage::repository::UserRow;
use crate::storage::Repository;
use crate::types::{
    ChangePasswordRequest, ErrorResponse, HealthResponse, HistoryRecord, LoginRequest,
    LoginResponse, MessageResponse, PredictResponse, RegisterRequest, SeverityLabel, UserInfo,
};

/// Application state shared across handlers.
pub struct AppState {
    pub model: SharedModel,
    pub repo: Mutex<Repository>,
    pub config: AppConfig,
}

/// Error type for API handlers.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.into(),
        }
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: msg.into(),
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: msg.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse::new(self.message));
        (self.status, body).into_response()
    }
}

fn lock_repo(state: &AppState) -> Result<MutexGuard<'_, Repository>, ApiError> {
    state
        .repo
        .lock()
        .map_err(|_| ApiError::internal("Storage lock poisoned"))
}

/// Resolve the bearer token in the request to a user, checking the
/// session table. The cached client claim is never trusted on its own.
fn authorize(state: &AppState, headers: &HeaderMap) -> Result<UserRow, ApiError> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| ApiError::unauthorized("Missing bearer token"))?;

    let repo = lock_repo(state)?;
    let user = repo
        .session_user(token, Utc::now())
        .map_err(|e| ApiError::internal(format!("Session lookup failed: {}", e)))?;

    user.ok_or_else(|| ApiError::unauthorized("Invalid or expired session"))
}

/// Root banner.
pub async fn home() -> &'static str {
    "Backend working..."
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Registration endpoint.
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    if req.name.trim().is_empty() || req.email.trim().is_empty() {
        return Err(ApiError::bad_request("Name and email are required"));
    }
    if req.password.len() < auth::MIN_PASSWORD_LEN {
        return Err(ApiError::bad_request("Password must be at least 6 characters"));
    }

    let repo = lock_repo(&state)?;
    let existing = repo
        .find_user(&req.email)
        .map_err(|e| ApiError::internal(format!("User lookup failed: {}", e)))?;
    if existing.is_some() {
        return Err(ApiError::bad_request("Email already exists"));
    }

    let salt = auth::generate_salt();
    let digest = auth::hash_password(&req.password, &salt);
    repo.insert_user(&req.email, &req.name, &salt, &digest)
        .map_err(|e| ApiError::internal(format!("User insert failed: {}", e)))?;

    tracing::info!(email = %req.email, "registered user");
    Ok(Json(MessageResponse::success("Registration successful")))
}

/// Login endpoint. Issues a server-side session token.
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let repo = lock_repo(&state)?;
    let user = repo
        .find_user(&req.email)
        .map_err(|e| ApiError::internal(format!("User lookup failed: {}", e)))?;

    let user = match user {
        Some(u) if auth::verify_password(&req.password, &u.password_salt, &u.password_hash) => u,
        _ => return Err(ApiError::unauthorized("Invalid email or password")),
    };

    let token = auth::generate_token();
    let now = Utc::now();
    let expires = now + Duration::hours(state.config.auth.session_ttl_hours);
    repo.create_session(&token, &user.email, now, expires)
        .map_err(|e| ApiError::internal(format!("Session insert failed: {}", e)))?;

    tracing::info!(email = %user.email, "login");
    Ok(Json(LoginResponse {
        status: "success".to_string(),
        message: "Login successful".to_string(),
        user: UserInfo {
            email: user.email,
            name: user.name,
        },
        token,
    }))
}

/// Prediction endpoint. Scores the scenario and appends it to the
/// history.
pub async fn predict(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<ScenarioInput>,
) -> Result<Json<PredictResponse>, ApiError> {
    authorize(&state, &headers)?;

    let features = req
        .to_features()
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    let score = state.model.score(&features);
    let label = SeverityLabel::from_score(score);

    let record = HistoryRecord {
        input: serde_json::to_value(&req)
            .map_err(|e| ApiError::internal(format!("Input serialization failed: {}", e)))?,
        processed: features.to_map(),
        prediction: score,
        timestamp: Utc::now().to_rfc3339(),
    };

    let repo = lock_repo(&state)?;
    repo.insert_prediction(&record)
        .map_err(|e| ApiError::internal(format!("History insert failed: {}", e)))?;

    tracing::debug!(score, %label, "scored scenario");
    Ok(Json(PredictResponse {
        severity_label: label,
        severity_score: score,
    }))
}

/// History endpoint: the raw record list, ingestion-ordered.
pub async fn history(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<HistoryRecord>>, ApiError> {
    authorize(&state, &headers)?;

    let repo = lock_repo(&state)?;
    let records = repo
        .list_predictions()
        .map_err(|e| ApiError::internal(format!("History query failed: {}", e)))?;
    Ok(Json(records))
}

/// Change-password endpoint.
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let session_user = authorize(&state, &headers)?;
    if session_user.email != req.email {
        return Err(ApiError::unauthorized("Session does not match this account"));
    }
    if req.new_password.len() < auth::MIN_PASSWORD_LEN {
        return Err(ApiError::bad_request("Password must be at least 6 characters"));
    }
    if !auth::verify_password(
        &req.current_password,
        &session_user.password_salt,
        &session_user.password_hash,
    ) {
        return Err(ApiError::unauthorized("Current password is incorrect"));
    }

    let salt = auth::generate_salt();
    let digest = auth::hash_password(&req.new_password, &salt);
    let repo = lock_repo(&state)?;
    repo.update_password(&req.email, &salt, &digest)
        .map_err(|e| ApiError::internal(format!("Password update failed: {}", e)))?;

    tracing::info!(email = %req.email, "password changed");
    Ok(Json(MessageResponse::success(
        "Your password has been changed successfully",
    )))
}
