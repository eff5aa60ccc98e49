use super::{EmailError, EmailMessage, EmailSender, Result};
use crate::config::{EmailConfig, EmailProvider};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

const RESEND_ENDPOINT: &str = "https://api.resend.com/emails";
const SENDGRID_ENDPOINT: &str = "https://api.sendgrid.com/v3/mail/send";

/// Build the sender selected by `email.provider`
pub fn from_config(config: &EmailConfig) -> Result<Arc<dyn EmailSender>> {
    let sender: Arc<dyn EmailSender> = match config.provider {
        EmailProvider::Log => Arc::new(LogSender),
        EmailProvider::Resend => Arc::new(ResendSender::new(
            api_key(config)?,
            config.from_address.clone(),
            RESEND_ENDPOINT,
        )?),
        EmailProvider::Sendgrid => Arc::new(SendgridSender::new(
            api_key(config)?,
            config.from_address.clone(),
            SENDGRID_ENDPOINT,
        )?),
    };
    Ok(sender)
}

fn api_key(config: &EmailConfig) -> Result<String> {
    config
        .api_key
        .clone()
        .ok_or_else(|| EmailError::Config("email.api_key is required".to_string()))
}

fn http_client() -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder().timeout(Duration::from_secs(15)).build()?)
}

async fn check(response: reqwest::Response) -> Result<()> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let body = response.text().await.unwrap_or_default();
    Err(EmailError::Rejected { status: status.as_u16(), body })
}

/// Writes messages to the log instead of delivering them
pub struct LogSender;

#[async_trait]
impl EmailSender for LogSender {
    async fn send(&self, message: EmailMessage) -> Result<()> {
        info!(to = %message.to, subject = %message.subject, "Email (log provider):\n{}", message.text);
        Ok(())
    }
}

pub struct ResendSender {
    client: reqwest::Client,
    api_key: String,
    from: String,
    endpoint: String,
}

impl ResendSender {
    pub fn new(api_key: String, from: String, endpoint: &str) -> Result<Self> {
        Ok(Self { client: http_client()?, api_key, from, endpoint: endpoint.to_string() })
    }
}

#[async_trait]
impl EmailSender for ResendSender {
    async fn send(&self, message: EmailMessage) -> Result<()> {
        let body = json!({
            "from": self.from,
            "to": [message.to],
            "subject": message.subject,
            "text": message.text,
            "html": message.html,
        });
        let response =
            self.client.post(&self.endpoint).bearer_auth(&self.api_key).json(&body).send().await?;
        check(response).await
    }
}

pub struct SendgridSender {
    client: reqwest::Client,
    api_key: String,
    from: String,
    endpoint: String,
}

impl SendgridSender {
    pub fn new(api_key: String, from: String, endpoint: &str) -> Result<Self> {
        Ok(Self { client: http_client()?, api_key, from, endpoint: endpoint.to_string() })
    }
}

#[async_trait]
impl EmailSender for SendgridSender {
    async fn send(&self, message: EmailMessage) -> Result<()> {
        let body = json!({
            "personalizations": [{ "to": [{ "email": message.to }] }],
            "from": { "email": self.from },
            "subject": message.subject,
            "content": [
                { "type": "text/plain", "value": message.text },
                { "type": "text/html", "value": message.html },
            ],
        });
        let response =
            self.client.post(&self.endpoint).bearer_auth(&self.api_key).json(&body).send().await?;
        check(response).await
    }
}
