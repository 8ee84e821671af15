//! HTTP client for the severity API.
//!
//! One request per call, no retry, no timeout: every failure is
//! reported once and the operation ends. The base URL comes from
//! configuration rather than being baked into each call site.

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::features::ScenarioInput;
use crate::types::{
    ChangePasswordRequest, HistoryRecord, LoginRequest, LoginResponse, MessageResponse,
    PredictResponse, RegisterRequest,
};

/// Client-side failure taxonomy.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport failure: unreachable host, connection reset.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Non-2xx response, with the message the server put in the body
    /// (or a generic one when the body carried none).
    #[error("{message}")]
    Api { status: u16, message: String },
    /// 2xx response whose body did not match the expected shape.
    #[error("unexpected response shape: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("fixture error: {0}")]
    Io(#[from] std::io::Error),
}

/// Pull a human-readable message out of an error body, preferring the
/// `error` field, then `message`.
fn error_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            ["error", "message"]
                .iter()
                .find_map(|k| v.get(k).and_then(|m| m.as_str()).map(str::to_string))
        })
        .unwrap_or_else(|| format!("Request failed with status {}", status.as_u16()))
}

async fn parse_response<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ClientError> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(ClientError::Api {
            status: status.as_u16(),
            message: error_message(status, &body),
        });
    }
    Ok(serde_json::from_str(&body)?)
}

/// API client holding the shared connection pool and base URL.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    pub async fn register(&self, req: &RegisterRequest) -> Result<MessageResponse, ClientError> {
        let response = self
            .http
            .post(self.url("/api/register"))
            .json(req)
            .send()
            .await?;
        parse_response(response).await
    }

    pub async fn login(&self, req: &LoginRequest) -> Result<LoginResponse, ClientError> {
        let response = self
            .http
            .post(self.url("/api/login"))
            .json(req)
            .send()
            .await?;
        parse_response(response).await
    }

    /// Submit a scenario exactly as the form produced it: coerced
    /// numerics, `null` for anything malformed, no pre-validation.
    pub async fn predict(
        &self,
        input: &ScenarioInput,
        token: &str,
    ) -> Result<PredictResponse, ClientError> {
        let response = self
            .http
            .post(self.url("/api/predict"))
            .bearer_auth(token)
            .json(input)
            .send()
            .await?;
        parse_response(response).await
    }

    pub async fn history(&self, token: &str) -> Result<Vec<HistoryRecord>, ClientError> {
        let response = self
            .http
            .get(self.url("/api/history"))
            .bearer_auth(token)
            .send()
            .await?;
        parse_response(response).await
    }

    pub async fn change_password(
        &self,
        req: &ChangePasswordRequest,
        token: &str,
    ) -> Result<MessageResponse, ClientError> {
        let response = self
            .http
            .post(self.url("/api/change-password"))
            .bearer_auth(token)
            .json(req)
            .send()
            .await?;
        parse_response(response).await
    }
}

/// Where a history-reading command gets its records: the live API or a
/// local fixture file. One canonical code path consumes both.
pub enum HistorySource {
    Live { client: ApiClient, token: String },
    Fixture { path: PathBuf },
}

impl HistorySource {
    pub async fn fetch(&self) -> Result<Vec<HistoryRecord>, ClientError> {
        match self {
            HistorySource::Live { client, token } => client.history(token).await,
            HistorySource::Fixture { path } => {
                let raw = std::fs::read_to_string(path)?;
                Ok(serde_json::from_str(&raw)?)
            }
        }
    }
}

/// The login claim the CLI caches locally. A convenience copy only;
/// the server re-validates the token on every request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedSession {
    pub email: String,
    pub name: String,
    pub token: String,
}

impl CachedSession {
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Option<Self> {
        let raw = std::fs::read_to_string(path).ok()?;
        serde_json::from_str(&raw).ok()
    }

    pub fn clear(path: &Path) {
        let _ = std::fs::remove_file(path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_prefers_error_field() {
        let status = StatusCode::BAD_REQUEST;
        assert_eq!(
            error_message(status, r#"{"error":"boom","message":"other"}"#),
            "boom"
        );
        assert_eq!(error_message(status, r#"{"message":"only msg"}"#), "only msg");
        assert_eq!(
            error_message(status, "not json"),
            "Request failed with status 400"
        );
        assert_eq!(
            error_message(status, r#"{"detail":"irrelevant"}"#),
            "Request failed with status 400"
        );
    }

    #[test]
    fn test_error_message_surfaces_server_body() {
        // Bodies produced by ApiError::into_response must resolve to
        // the human-readable message, not the HTTP status line.
        let cases = [
            (
                StatusCode::BAD_REQUEST,
                "field 'num_lanes' is missing or not a finite number",
            ),
            (StatusCode::BAD_REQUEST, "Email already exists"),
            (StatusCode::UNAUTHORIZED, "Invalid email or password"),
        ];
        for (status, message) in cases {
            let body = serde_json::to_string(&crate::types::ErrorResponse::new(message)).unwrap();
            assert_eq!(error_message(status, &body), message);
        }
    }

    #[test]
    fn test_url_join() {
        let client = ApiClient::new("http://127.0.0.1:5000/");
        assert_eq!(client.url("/api/predict"), "http://127.0.0.1:5000/api/predict");
    }

    #[tokio::test]
    async fn test_fixture_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        std::fs::write(
            &path,
            r#"[{"input":{},"processed":{},"prediction":61.5,"timestamp":"2026-08-28T10:00:00+00:00"}]"#,
        )
        .unwrap();

        let source = HistorySource::Fixture { path };
        let records = source.fetch().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].prediction, 61.5);
    }

    #[tokio::test]
    async fn test_fixture_source_bad_shape() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        std::fs::write(&path, "{}").unwrap();

        let source = HistorySource::Fixture { path };
        assert!(matches!(
            source.fetch().await,
            Err(ClientError::Decode(_))
        ));
    }

    #[test]
    fn test_cached_session_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");

        let session = CachedSession {
            email: "a@example.com".into(),
            name: "Ada".into(),
            token: "tok".into(),
        };
        session.save(&path).unwrap();

        let loaded = CachedSession::load(&path).unwrap();
        assert_eq!(loaded.email, "a@example.com");
        assert_eq!(loaded.token, "tok");

        CachedSession::clear(&path);
        assert!(CachedSession::load(&path).is_none());
    }
}
