//! Stripe REST client (form-encoded requests, JSON responses)
use super::{PaymentGateway, PaymentIntent, PaymentTarget};
use crate::config::{CurrencyCode, StripeConfig};
use crate::core::types::Cents;
use crate::payments::error::{PaymentError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

pub struct StripeGateway {
    client: reqwest::Client,
    secret_key: String,
    api_base: String,
}

#[derive(Debug, Deserialize)]
struct IntentResponse {
    id: String,
    client_secret: Option<String>,
    amount: i64,
    currency: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

impl StripeGateway {
    pub fn new(config: &StripeConfig) -> Result<Self> {
        let secret_key = config
            .secret_key
            .clone()
            .ok_or_else(|| PaymentError::NotConfigured("stripe.secret_key is not set".into()))?;

        let client = reqwest::Client::builder().timeout(Duration::from_secs(20)).build()?;

        Ok(Self { client, secret_key, api_base: config.api_base.trim_end_matches('/').to_string() })
    }

    async fn post_form(&self, path: &str, form: &[(&str, String)]) -> Result<reqwest::Response> {
        let response = self
            .client
            .post(format!("{}{}", self.api_base, path))
            .bearer_auth(&self.secret_key)
            .form(form)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorEnvelope>(&body)
            .ok()
            .and_then(|e| e.error.message)
            .unwrap_or(body);
        Err(PaymentError::Api { status: status.as_u16(), message })
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_intent(
        &self,
        amount_cents: Cents,
        currency: CurrencyCode,
        target: PaymentTarget,
        receipt_email: Option<String>,
    ) -> Result<PaymentIntent> {
        let mut form = vec![
            ("amount", amount_cents.to_string()),
            ("currency", currency.as_str().to_string()),
            ("automatic_payment_methods[enabled]", "true".to_string()),
            ("metadata[kind]", target.kind().to_string()),
            ("metadata[id]", target.id()),
        ];
        if let Some(email) = receipt_email {
            form.push(("receipt_email", email));
        }

        let intent: IntentResponse = self.post_form("/v1/payment_intents", &form).await?.json().await?;
        info!(intent_id = %intent.id, %target, amount_cents, "Created payment intent");

        Ok(PaymentIntent {
            id: intent.id,
            client_secret: intent.client_secret,
            amount_cents: intent.amount,
            currency: intent.currency,
        })
    }

    async fn refund(&self, intent_id: &str) -> Result<()> {
        self.post_form("/v1/refunds", &[("payment_intent", intent_id.to_string())]).await?;
        debug!(intent_id, "Refund requested");
        Ok(())
    }
}
