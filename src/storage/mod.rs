//! SQLite storage module.
//!
//! Persists registered users, prediction history, and active sessions.

pub mod repository;
pub mod schema;

pub use repository::Repository;
pub use schema::create_tables;
