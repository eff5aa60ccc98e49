//! Card payments through Stripe Payment Intents
mod error;
mod stripe;
mod webhook;

pub use error::{PaymentError, Result};
pub use stripe::StripeGateway;
pub use webhook::{WebhookEvent, parse_event, verify_signature};

use crate::config::CurrencyCode;
use crate::core::types::{BookingId, Cents, OrderId};
use async_trait::async_trait;
use serde::Serialize;
use std::fmt;

/// What a payment intent pays for; round-trips through intent metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentTarget {
    Booking(BookingId),
    Order(OrderId),
}

impl PaymentTarget {
    pub fn kind(&self) -> &'static str {
        match self {
            PaymentTarget::Booking(_) => "booking",
            PaymentTarget::Order(_) => "order",
        }
    }

    pub fn id(&self) -> String {
        match self {
            PaymentTarget::Booking(id) => id.to_string(),
            PaymentTarget::Order(id) => id.to_string(),
        }
    }

    /// Rebuild from the `kind`/`id` metadata pair
    pub fn from_metadata(kind: &str, id: &str) -> Option<Self> {
        match kind {
            "booking" => id.parse().ok().map(PaymentTarget::Booking),
            "order" => id.parse().ok().map(PaymentTarget::Order),
            _ => None,
        }
    }
}

impl fmt::Display for PaymentTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.id())
    }
}

/// Created intent as returned to the client for confirmation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: Option<String>,
    pub amount_cents: Cents,
    pub currency: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_intent(
        &self,
        amount_cents: Cents,
        currency: CurrencyCode,
        target: PaymentTarget,
        receipt_email: Option<String>,
    ) -> Result<PaymentIntent>;

    /// Refund the full captured amount of an intent
    async fn refund(&self, intent_id: &str) -> Result<()>;
}
