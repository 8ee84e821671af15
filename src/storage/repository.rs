//! SQLite repository for users, predictions, and sessions.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

use super::schema::create_tables;
use crate::types::HistoryRecord;

/// Stored user account.
#[derive(Debug, Clone)]
pub struct UserRow {
    pub email: String,
    pub name: String,
    pub password_salt: String,
    pub password_hash: String,
}

/// Repository over the application database.
pub struct Repository {
    conn: Connection,
}

impl Repository {
    /// Open (or create) the database at the given path.
    pub fn new(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .context("Failed to create database directory")?;
            }
        }

        let conn = Connection::open(db_path).context("Failed to open database")?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        create_tables(&conn)?;

        Ok(Self { conn })
    }

    /// Create an in-memory repository (for testing).
    #[cfg(test)]
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        create_tables(&conn)?;
        Ok(Self { conn })
    }

    // ==================== Users ====================

    pub fn insert_user(
        &self,
        email: &str,
        name: &str,
        password_salt: &str,
        password_hash: &str,
    ) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO users (email, name, password_salt, password_hash)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![email, name, password_salt, password_hash],
        )?;
        Ok(())
    }

    pub fn find_user(&self, email: &str) -> Result<Option<UserRow>> {
        let user = self
            .conn
            .query_row(
                r#"
                SELECT email, name, password_salt, password_hash
                FROM users
                WHERE email = ?1
                "#,
                [email],
                |row| {
                    Ok(UserRow {
                        email: row.get(0)?,
                        name: row.get(1)?,
                        password_salt: row.get(2)?,
                        password_hash: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(user)
    }

    pub fn update_password(
        &self,
        email: &str,
        password_salt: &str,
        password_hash: &str,
    ) -> Result<()> {
        self.conn.execute(
            "UPDATE users SET password_salt = ?2, password_hash = ?3 WHERE email = ?1",
            params![email, password_salt, password_hash],
        )?;
        Ok(())
    }

    // ==================== Predictions ====================

    /// Append a scored prediction to the history.
    pub fn insert_prediction(&self, record: &HistoryRecord) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO predictions (input, processed, prediction, timestamp)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![
                record.input.to_string(),
                record.processed.to_string(),
                record.prediction,
                record.timestamp,
            ],
        )?;
        Ok(())
    }

    /// Full history in ingestion order (oldest first).
    pub fn list_predictions(&self) -> Result<Vec<HistoryRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT input, processed, prediction, timestamp
            FROM predictions
            ORDER BY id
            "#,
        )?;

        let records = stmt
            .query_map([], |row| {
                let input: String = row.get(0)?;
                let processed: String = row.get(1)?;
                Ok(HistoryRecord {
                    input: serde_json::from_str(&input)
                        .unwrap_or(serde_json::Value::Null),
                    processed: serde_json::from_str(&processed)
                        .unwrap_or(serde_json::Value::Null),
                    prediction: row.get(2)?,
                    timestamp: row.get(3)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(records)
    }

    pub fn prediction_count(&self) -> Result<i64> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM predictions", [], |row| row.get(0))?;
        Ok(count)
    }

    // ==================== Sessions ====================

    pub fn create_session(
        &self,
        token: &str,
        email: &str,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO sessions (token, email, created_at, expires_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![
                token,
                email,
                created_at.to_rfc3339(),
                expires_at.to_rfc3339()
            ],
        )?;
        Ok(())
    }

    /// Resolve a token to its user, dropping it if expired.
    pub fn session_user(&self, token: &str, now: DateTime<Utc>) -> Result<Option<UserRow>> {
        let row = self
            .conn
            .query_row(
                "SELECT email, expires_at FROM sessions WHERE token = ?1",
                [token],
                |row| {
                    let email: String = row.get(0)?;
                    let expires_at: String = row.get(1)?;
                    Ok((email, expires_at))
                },
            )
            .optional()?;

        let Some((email, expires_at)) = row else {
            return Ok(None);
        };

        let expired = DateTime::parse_from_rfc3339(&expires_at)
            .map(|exp| exp < now)
            .unwrap_or(true);
        if expired {
            self.delete_session(token)?;
            return Ok(None);
        }

        self.find_user(&email)
    }

    pub fn delete_session(&self, token: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM sessions WHERE token = ?1", [token])?;
        Ok(())
    }
}
