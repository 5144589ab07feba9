use core_access::CoreAccessError;
use thiserror::Error;

/// Custom error types for the content and learner services.
#[derive(Error, Debug)]
pub enum ZygoteError {
    #[error("Database error: {0}")]
    Database(#[from] turso::Error),
    #[error("Failed to connect to storage: {0}")]
    StorageConnection(String),
    #[error(transparent)]
    Access(#[from] CoreAccessError),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("Data integrity error: {0}")]
    DataIntegrity(String),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ZygoteError {
    pub fn not_found(what: &str) -> Self {
        ZygoteError::NotFound(format!("{what} not found."))
    }
}
