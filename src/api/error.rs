use std::time::Duration;

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use tracing::error;

use crate::handlers::ServiceError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("rate limit exceeded")]
    RateLimited { retry_after: Duration },

    /// The raw cause is logged server-side; clients get a generic body.
    #[error("internal error")]
    Internal,
}

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::Validation(msg) => ApiError::BadRequest(msg),
            ServiceError::Forbidden(msg) => ApiError::Forbidden(msg),
            ServiceError::NotFound(msg) => ApiError::NotFound(msg),
            ServiceError::Internal(cause) => {
                error!(error = %cause, "request failed");
                ApiError::Internal
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, details) = match &self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, Some(msg.clone())),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, Some(msg.clone())),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, Some(msg.clone())),
            ApiError::RateLimited { .. } => (StatusCode::TOO_MANY_REQUESTS, None),
            ApiError::Internal => (StatusCode::INTERNAL_SERVER_ERROR, None),
        };

        let mut body = ::serde_json::json!({
            "error": status.canonical_reason().unwrap_or("error"),
        });
        if let Some(details) = details {
            body["details"] = ::serde_json::Value::String(details);
        }
        let body = Json(body);

        match self {
            ApiError::RateLimited { retry_after } => {
                let secs = (retry_after.as_secs_f64().ceil() as u64).to_string();
                (status, [(header::RETRY_AFTER, secs)], body).into_response()
            }
            _ => (status, body).into_response(),
        }
    }
}
