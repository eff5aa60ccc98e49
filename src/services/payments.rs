//! Stripe webhook intake
use crate::config::StripeConfig;
use crate::core::{DomainError, DomainResult};
use crate::payments::{PaymentTarget, WebhookEvent, parse_event, verify_signature};
use crate::services::{BookingService, CafeService};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Verifies and applies gateway events to bookings and orders
pub struct WebhookHandler {
    bookings: Arc<BookingService>,
    cafe: Arc<CafeService>,
    config: StripeConfig,
}

impl WebhookHandler {
    pub fn new(bookings: Arc<BookingService>, cafe: Arc<CafeService>, config: StripeConfig) -> Self {
        Self { bookings, cafe, config }
    }

    /// Handle one delivery. Returns the applied event so the caller can log it.
    pub async fn handle(&self, payload: &[u8], signature_header: Option<&str>) -> DomainResult<WebhookEvent> {
        let secret = self
            .config
            .webhook_secret
            .as_deref()
            .ok_or_else(|| DomainError::Upstream("webhooks are not configured".into()))?;
        let header = signature_header
            .ok_or_else(|| DomainError::Validation("missing Stripe-Signature header".into()))?;

        verify_signature(payload, header, secret, Utc::now().timestamp(), self.config.webhook_tolerance_secs)?;
        let event = parse_event(payload)?;

        match &event {
            WebhookEvent::Succeeded { event_id, intent_id, target } => {
                info!(event_id, intent_id, %target, "Payment succeeded");
                match target {
                    PaymentTarget::Booking(id) => {
                        self.bookings.mark_paid(*id, intent_id).await?;
                    },
                    PaymentTarget::Order(id) => {
                        self.cafe.mark_paid(*id, intent_id).await?;
                    },
                }
            },
            WebhookEvent::Failed { event_id, intent_id, target, reason } => {
                // The client may retry with the same intent; the hold expires otherwise
                warn!(event_id, intent_id, %target, reason = reason.as_deref().unwrap_or("unknown"), "Payment failed");
                crate::metrics::incr("payments.failed");
            },
            WebhookEvent::Ignored { event_id, event_type } => {
                debug!(event_id, event_type, "Ignoring webhook event");
            },
        }
        Ok(event)
    }
}
