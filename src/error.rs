//! Unified error handling for sanctiond.
//!
//! Every engine operation returns [`ModerationError`], a closed taxonomy
//! with a stable machine-readable kind, an HTTP status and metric labels.

use crate::db::DbError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use sanction_proto::ProtoError;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// Moderation Errors (engine operations)
// ============================================================================

/// Errors surfaced by report intake, sanction authority and appeals.
#[derive(Debug, Error)]
pub enum ModerationError {
    /// Malformed or missing field, or a category-specific rule violation.
    #[error("{0}")]
    Validation(String),

    /// Wrong role, wrong scope, or not the sanctioned party.
    #[error("{0}")]
    Authorization(String),

    #[error("{0}")]
    NotFound(String),

    /// Duplicate report, duplicate open appeal, or a closed record.
    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    RateLimited(String),

    #[error("store error: {0}")]
    Store(DbError),
}

impl ModerationError {
    /// Get a static error code string for metrics labeling and response bodies.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::Authorization(_) => "authorization_error",
            Self::NotFound(_) => "not_found_error",
            Self::Conflict(_) => "conflict_error",
            Self::RateLimited(_) => "rate_limit_error",
            Self::Store(_) => "store_unavailable",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Authorization(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            Self::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Only store failures may be retried. Rate limit and dedup rejections
    /// are final answers.
    #[inline]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Store(_))
    }

    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub(crate) fn forbidden(msg: impl Into<String>) -> Self {
        Self::Authorization(msg.into())
    }

    pub(crate) fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub(crate) fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }
}

/// Result type for engine operations.
pub type ModerationResult<T> = Result<T, ModerationError>;

impl From<DbError> for ModerationError {
    fn from(err: DbError) -> Self {
        match err {
            // Lost a race against a constraint the engine had already checked.
            DbError::UniqueViolation(what) => Self::Conflict(format!("{what} already exists")),
            other => Self::Store(other),
        }
    }
}

impl From<ProtoError> for ModerationError {
    fn from(err: ProtoError) -> Self {
        Self::Validation(err.to_string())
    }
}

/// JSON error body: `{ "kind": ..., "message": ... }`.
#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    kind: &'a str,
    message: String,
}

impl IntoResponse for ModerationError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            // Store internals are not the caller's business.
            Self::Store(_) => "store temporarily unavailable".to_string(),
            other => other.to_string(),
        };
        let body = ErrorBody {
            kind: self.error_code(),
            message,
        };
        (status, Json(body)).into_response()
    }
}
