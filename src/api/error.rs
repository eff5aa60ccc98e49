//! JSON error responses
use crate::core::DomainError;
use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Too many requests")]
    RateLimited { retry_after_secs: u64 },
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl ApiError {
    /// Status and machine-readable code
    pub fn classify(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            ApiError::RateLimited { .. } => (StatusCode::TOO_MANY_REQUESTS, "rate_limited"),
            ApiError::Domain(e) => match e {
                DomainError::Validation(_) => (StatusCode::BAD_REQUEST, "validation"),
                DomainError::InvalidTransition { .. } => (StatusCode::BAD_REQUEST, "invalid_transition"),
                DomainError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "unauthorized"),
                DomainError::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden"),
                DomainError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
                DomainError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
                DomainError::InsufficientCredits { .. } => {
                    (StatusCode::PAYMENT_REQUIRED, "insufficient_credits")
                },
                DomainError::Upstream(_) => (StatusCode::BAD_GATEWAY, "upstream"),
                DomainError::Repository(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.classify();
        let message = match &self {
            // Storage details stay in the logs
            ApiError::Domain(DomainError::Repository(e)) => {
                error!("Request failed: {}", e);
                "internal server error".to_string()
            },
            ApiError::Domain(DomainError::Upstream(e)) => {
                warn!("Upstream failure: {}", e);
                self.to_string()
            },
            _ => self.to_string(),
        };

        let mut response = (status, Json(ErrorBody { error: code, message })).into_response();
        if let ApiError::RateLimited { retry_after_secs } = self {
            if let Ok(value) = HeaderValue::from_str(&retry_after_secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
