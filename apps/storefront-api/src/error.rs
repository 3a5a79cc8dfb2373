//! Error types for the storefront API.
//!
//! Every failure leaves the server as a JSON body with a stable code:
//!
//! ```text
//! {"code": "OUT_OF_STOCK", "message": "Stock nahikorik ez dago (Whey ...). ..."}
//! ```
//!
//! ## Status Mapping
//! ```text
//! NotFound                                    → 404
//! Forbidden                                   → 403
//! missing/invalid bearer token, bad login     → 401
//! Validation, CartTooLarge, QuantityTooLarge  → 400
//! OutOfStock, InsufficientStock,
//! InvalidTransition, WindowExpired, duplicate → 409
//! EmptyCart                                   → 422
//! database busy after retries                 → 503
//! anything else from the database             → 500 (details logged only)
//! ```

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use otherproteins_core::{CoreError, ValidationError};
use otherproteins_db::DbError;

/// Storefront API errors.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Db(#[from] DbError),

    /// Missing, expired or malformed bearer token, or wrong credentials.
    #[error("{0}")]
    Unauthorized(String),

    /// Request body or query string could not be read.
    #[error("{0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// JSON error body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::Db(DbError::Rejected(err)) => rejection_status(err),
            ApiError::Db(DbError::NotFound { .. }) => StatusCode::NOT_FOUND,
            ApiError::Db(DbError::UniqueViolation { .. }) => StatusCode::CONFLICT,
            ApiError::Db(DbError::ForeignKeyViolation { .. }) => StatusCode::BAD_REQUEST,
            ApiError::Db(DbError::Busy(_)) | ApiError::Db(DbError::PoolExhausted) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ApiError::Db(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Db(DbError::Rejected(err)) => err.code(),
            ApiError::Db(DbError::NotFound { .. }) => "NOT_FOUND",
            ApiError::Db(DbError::UniqueViolation { .. }) => "DUPLICATE",
            ApiError::Db(DbError::ForeignKeyViolation { .. }) => "INVALID_REFERENCE",
            ApiError::Db(DbError::Busy(_)) | ApiError::Db(DbError::PoolExhausted) => "UNAVAILABLE",
            ApiError::Db(_) | ApiError::Internal(_) => "INTERNAL_ERROR",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::BadRequest(_) => "BAD_REQUEST",
        }
    }

    /// Message safe to show the client.
    fn public_message(&self) -> String {
        match self {
            ApiError::Db(DbError::Rejected(err)) => err.to_string(),
            ApiError::Db(err @ DbError::NotFound { .. })
            | ApiError::Db(err @ DbError::UniqueViolation { .. }) => err.to_string(),
            ApiError::Db(DbError::ForeignKeyViolation { .. }) => {
                "Erreferentzia baliogabea.".to_string()
            }
            ApiError::Db(DbError::Busy(_)) | ApiError::Db(DbError::PoolExhausted) => {
                "Zerbitzua lanpetuta dago. Saiatu berriro.".to_string()
            }
            ApiError::Db(_) | ApiError::Internal(_) => "Barne errorea.".to_string(),
            ApiError::Unauthorized(msg) | ApiError::BadRequest(msg) => msg.clone(),
        }
    }
}

fn rejection_status(err: &CoreError) -> StatusCode {
    match err {
        CoreError::NotFound { .. } => StatusCode::NOT_FOUND,
        CoreError::Forbidden { .. } => StatusCode::FORBIDDEN,
        CoreError::Validation(_) | CoreError::CartTooLarge { .. } | CoreError::QuantityTooLarge { .. } => {
            StatusCode::BAD_REQUEST
        }
        CoreError::OutOfStock { .. }
        | CoreError::InsufficientStock { .. }
        | CoreError::InvalidTransition { .. }
        | CoreError::WindowExpired { .. } => StatusCode::CONFLICT,
        CoreError::EmptyCart => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        ApiError::Db(DbError::Rejected(err))
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        CoreError::from(err).into()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            tracing::error!(error = %self, code = self.code(), "Request failed");
        } else {
            tracing::debug!(error = %self, code = self.code(), "Request rejected");
        }

        let body = ErrorBody {
            code: self.code(),
            message: self.public_message(),
        };
        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers.
pub type ApiResult<T> = Result<T, ApiError>;
