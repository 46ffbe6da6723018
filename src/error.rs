//! Error types for a3s-anonid

use thiserror::Error;

/// Errors that can occur while registering or disclosing identities
///
/// Access denial is not an error: a High-risk request yields a normal
/// [`Disclosure`](crate::privacy::Disclosure) with `granted == false`.
#[derive(Debug, Error)]
pub enum AnonIdError {
    /// Unknown natural key or anonymized id
    #[error("Not found: {0}")]
    NotFound(String),

    /// Empty or malformed input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Tag mismatch, wrong key, corrupt blob or missing salt
    #[error("Decryption failed: {0}")]
    Decryption(String),

    /// Key derivation or cipher setup failure
    #[error("Crypto error: {0}")]
    Crypto(String),

    /// SQLite failure
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// Serialization/deserialization failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AnonIdError {
    /// Stable machine-readable code used in API error bodies
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Decryption(_) => "DECRYPTION_FAILURE",
            Self::Crypto(_) => "CRYPTO_ERROR",
            Self::Storage(_) => "STORAGE_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

/// Result type alias for anonid operations
pub type Result<T> = std::result::Result<T, AnonIdError>;

/// Serialize any `Serialize` value to `serde_json::Value` without panicking.
pub fn to_json<T: serde::Serialize>(value: T) -> serde_json::Value {
    serde_json::to_value(value).unwrap_or_else(|e| {
        serde_json::json!({
            "error": {
                "code": "SERIALIZATION_ERROR",
                "message": e.to_string()
            }
        })
    })
}
