//! Domain-level errors shared by the service layer
use crate::core::repository::RepositoryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Insufficient credits: requested {requested}h, available {available}h")]
    InsufficientCredits { requested: i32, available: i32 },

    #[error("Cannot move from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Repository error: {0}")]
    Repository(RepositoryError),
}

impl From<RepositoryError> for DomainError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(what) => DomainError::NotFound(what),
            RepositoryError::Conflict(what) => DomainError::Conflict(what),
            other => DomainError::Repository(other),
        }
    }
}

impl From<crate::payments::PaymentError> for DomainError {
    fn from(err: crate::payments::PaymentError) -> Self {
        use crate::payments::PaymentError;
        match err {
            PaymentError::InvalidSignature(_) | PaymentError::InvalidPayload(_) => {
                DomainError::Validation(err.to_string())
            },
            other => DomainError::Upstream(other.to_string()),
        }
    }
}

impl From<crate::eth::EthError> for DomainError {
    fn from(err: crate::eth::EthError) -> Self {
        use crate::eth::EthError;
        match err {
            EthError::SignatureError(_) | EthError::InvalidAddress(_) => {
                DomainError::Validation(err.to_string())
            },
            other => DomainError::Upstream(other.to_string()),
        }
    }
}

/// Result type for service operations
pub type DomainResult<T> = std::result::Result<T, DomainError>;
