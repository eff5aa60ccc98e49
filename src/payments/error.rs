use thiserror::Error;

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("Payments are not configured: {0}")]
    NotConfigured(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Stripe API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid webhook signature: {0}")]
    InvalidSignature(String),

    #[error("Malformed webhook payload: {0}")]
    InvalidPayload(String),
}

pub type Result<T> = std::result::Result<T, PaymentError>;
