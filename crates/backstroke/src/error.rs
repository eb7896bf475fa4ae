//! Errors shared by the database-backed queue and status store.

use sea_orm::DbErr;
use thiserror::Error;

/// Errors that can occur reading or writing persisted worker state.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from sea-orm.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    /// A stored JSON document could not be encoded or decoded.
    #[error("Invalid stored document: {0}")]
    Codec(#[from] serde_json::Error),
}

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
