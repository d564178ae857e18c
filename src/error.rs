//! Error types for the tasksync core
//!
//! All errors use thiserror for structured error handling.
//! The API layer maps these onto response codes: `Validation` -> 400,
//! `TaskNotFound` -> 404, `RateLimitExceeded` -> 429, everything else -> 500.

use thiserror::Error;

use crate::cache::CacheError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Rate limit exceeded for {key}")]
    RateLimitExceeded { limit: u32, count: i64, key: String },

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Sync batch aborted: {0}")]
    Transaction(String),
}

impl serde::Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
