use thiserror::Error;

use crate::validation::ValidationError;

/// Error taxonomy for the whole service. Every fallible path returns one of
/// these kinds; the HTTP layer is the only place they become status codes.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("upstream timeout: {0}")]
    UpstreamTimeout(String),

    #[error("upstream transient failure: {0}")]
    UpstreamTransient(String),

    #[error("upstream returned invalid payload: {0}")]
    UpstreamInvalid(String),

    #[error("storage error: {0}")]
    Storage(sqlx::Error),

    /// Never surfaced to callers; cache failures downgrade to misses.
    #[error("cache error: {0}")]
    Cache(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ServiceError::UpstreamTimeout(_))
    }

    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ServiceError::UpstreamTimeout(_) | ServiceError::UpstreamTransient(_)
        )
    }
}

impl From<sqlx::Error> for ServiceError {
    fn from(err: sqlx::Error) -> Self {
        // Unique-constraint violations are their own kind so that callers can
        // treat them as idempotent-success where inserts use ON CONFLICT.
        if let sqlx::Error::Database(ref db_err) = err {
            if db_err.is_unique_violation() {
                return ServiceError::Conflict(db_err.to_string());
            }
        }
        ServiceError::Storage(err)
    }
}

impl From<ValidationError> for ServiceError {
    fn from(err: ValidationError) -> Self {
        ServiceError::InvalidInput(err.to_string())
    }
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ServiceError::UpstreamTimeout(err.to_string())
        } else if err.is_connect() || err.is_request() {
            ServiceError::UpstreamTransient(err.to_string())
        } else if err.is_decode() {
            ServiceError::UpstreamInvalid(err.to_string())
        } else {
            ServiceError::UpstreamTransient(err.to_string())
        }
    }
}
