use thiserror::Error;

use crate::store::StoreError;

/// Failures surfaced by the attendance core. Every variant is recovered at the
/// request boundary and turned into an error envelope.
#[derive(Debug, Error)]
pub enum AttendError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Authorization(String),

    #[error("Invalid Index Number or Password")]
    InvalidCredentials,

    #[error("login required")]
    Unauthenticated,

    #[error("password hashing failed: {0}")]
    Hashing(String),

    #[error("document storage failed: {0}")]
    Document(#[from] std::io::Error),

    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl AttendError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Authorization(message.into())
    }

    /// Stable wire code used in the IPC error envelope.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_failed",
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::Authorization(_) => "forbidden",
            Self::InvalidCredentials => "invalid_credentials",
            Self::Unauthenticated => "unauthenticated",
            Self::Hashing(_) => "hash_failed",
            Self::Document(_) => "io_failed",
            Self::Storage(_) => "db_query_failed",
        }
    }
}

pub type AttendResult<T> = Result<T, AttendError>;
