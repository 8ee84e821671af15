//! SQLite schema definitions.
//!
//! Tables:
//! - users: registered accounts with salted password digests
//! - predictions: every scored request, ingestion-ordered
//! - sessions: active bearer tokens with expiry

use rusqlite::{Connection, Result};

/// Create all tables in the database.
pub fn create_tables(conn: &Connection) -> Result<()> {
    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            email TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            password_salt TEXT NOT NULL,
            password_hash TEXT NOT NULL,
            created_at TEXT DEFAULT (datetime('now'))
        )
        "#,
        [],
    )?;

    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS predictions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            input TEXT NOT NULL,
            processed TEXT NOT NULL,
            prediction REAL NOT NULL,
            timestamp TEXT NOT NULL
        )
        "#,
        [],
    )?;

    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS sessions (
            token TEXT PRIMARY KEY,
            email TEXT NOT NULL REFERENCES users(email),
            created_at TEXT NOT NULL,
            expires_at TEXT NOT NULL
        )
        "#,
        [],
    )?;

    Ok(())
}
