//! Application services
//!
//! The domain services (`BookingService`, `CafeService`, ...) hold the
//! business flows behind the HTTP API. The runnable services (`ApiService`,
//! `BookingLifecycleService`, `NftRefreshService`) implement
//! [`crate::app::Service`] and are driven by the application lifecycle.
pub mod admin;
pub mod api;
pub mod booking;
pub mod cafe;
pub mod content;
pub mod credits;
pub mod lifecycle;
pub mod nft;
pub mod nft_refresh;
pub mod payments;

pub use admin::{AdminService, DashboardStats};
pub use api::ApiService;
pub use booking::{BookingCreated, BookingQuote, BookingRequest, BookingService};
pub use cafe::{CafeService, OrderPlaced, OrderRequest};
pub use content::ContentService;
pub use credits::{CreditBalances, CreditGrant, CreditService};
pub use lifecycle::BookingLifecycleService;
pub use nft::{NftService, WalletProof};
pub use nft_refresh::NftRefreshService;
pub use payments::WebhookHandler;

use crate::auth::{AuthService, SessionStore};
use crate::config::{BookingConfig, Config};
use crate::core::repository::{AuditLogRepository, NewAuditLog, Repositories};
use crate::core::types::UserId;
use crate::email::{EmailMessage, EmailSender};
use crate::eth::NftVerifier;
use crate::notify::Notifier;
use crate::payments::PaymentGateway;
use chrono::{Duration, NaiveDateTime, Utc};
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

/// Outbound integrations; absent gateways disable their features
#[derive(Clone)]
pub struct Integrations {
    pub payments: Option<Arc<dyn PaymentGateway>>,
    pub nft: Option<Arc<dyn NftVerifier>>,
    pub email: Arc<dyn EmailSender>,
    pub notifier: Arc<dyn Notifier>,
}

/// Who performed an action, for the audit trail
#[derive(Debug, Clone, Default)]
pub struct Actor {
    pub user_id: Option<UserId>,
    pub ip: Option<String>,
}

impl Actor {
    pub fn new(user_id: UserId, ip: Option<String>) -> Self {
        Self { user_id: Some(user_id), ip }
    }

    pub fn anonymous(ip: Option<String>) -> Self {
        Self { user_id: None, ip }
    }
}

/// Send without failing the caller
pub(crate) async fn send_email(sender: &dyn EmailSender, message: EmailMessage) {
    let to = message.to.clone();
    let subject = message.subject.clone();
    if let Err(e) = sender.send(message).await {
        warn!(%to, %subject, "Failed to send email: {}", e);
        crate::metrics::incr("email.failed");
    }
}

/// Append to the audit log without failing the caller
pub(crate) async fn audit(
    repo: &dyn AuditLogRepository,
    actor: &Actor,
    action: &str,
    entity_type: &str,
    entity_id: Option<String>,
    details: Value,
) {
    let entry = NewAuditLog {
        actor_id: actor.user_id,
        action: action.to_string(),
        entity_type: entity_type.to_string(),
        entity_id,
        details,
        ip_address: actor.ip.clone(),
    };
    if let Err(e) = repo.record(entry).await {
        warn!(action, entity_type, "Failed to write audit log: {}", e);
    }
}

/// Wall clock of the space
pub(crate) fn local_now(config: &BookingConfig) -> NaiveDateTime {
    (Utc::now() + Duration::minutes(config.utc_offset_minutes as i64)).naive_utc()
}

/// Every domain service the API needs
#[derive(Clone)]
pub struct Services {
    pub auth: Arc<AuthService>,
    pub bookings: Arc<BookingService>,
    pub cafe: Arc<CafeService>,
    pub credits: Arc<CreditService>,
    pub content: Arc<ContentService>,
    pub admin: Arc<AdminService>,
    pub nft: Arc<NftService>,
    pub webhooks: Arc<WebhookHandler>,
}

impl Services {
    pub fn new(
        repos: Repositories,
        sessions: Arc<dyn SessionStore>,
        integrations: Integrations,
        config: &Config,
    ) -> Self {
        let bookings = Arc::new(BookingService::new(
            repos.clone(),
            integrations.clone(),
            config.pricing,
            config.booking.clone(),
        ));
        let cafe = Arc::new(CafeService::new(repos.clone(), integrations.clone(), config.pricing));
        let nft = Arc::new(NftService::new(
            repos.users.clone(),
            repos.audit.clone(),
            integrations.nft.clone(),
            config.eth.clone(),
        ));
        let webhooks = Arc::new(WebhookHandler::new(
            bookings.clone(),
            cafe.clone(),
            config.stripe.clone(),
        ));

        Self {
            auth: Arc::new(AuthService::new(repos.users.clone(), sessions, config.auth.clone())),
            credits: Arc::new(CreditService::new(repos.clone(), config.booking.clone())),
            content: Arc::new(ContentService::new(
                repos.clone(),
                integrations.clone(),
                config.email.admin_address.clone(),
            )),
            admin: Arc::new(AdminService::new(repos, config.booking.clone())),
            bookings,
            cafe,
            nft,
            webhooks,
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Shared fixtures for service tests
    use super::*;
    use crate::core::memory::MemoryStore;
    use crate::core::repository::NewUser;
    use crate::core::types::{Role, User};
    use crate::email::MockEmailSender;
    use crate::notify::MockNotifier;

    /// Integrations that accept everything and send nothing
    pub fn quiet_integrations() -> Integrations {
        let mut email = MockEmailSender::new();
        email.expect_send().returning(|_| Ok(()));
        let mut notifier = MockNotifier::new();
        notifier.expect_publish().returning(|_, _, _| ());
        Integrations {
            payments: None,
            nft: None,
            email: Arc::new(email),
            notifier: Arc::new(notifier),
        }
    }

    pub async fn member(store: &Arc<MemoryStore>, email: &str) -> User {
        use crate::core::repository::UserRepository;
        UserRepository::create(
            store.as_ref(),
            NewUser {
                email: email.to_string(),
                password_hash: "unused".to_string(),
                name: "Test Member".to_string(),
                role: Role::Member,
            },
        )
        .await
        .unwrap()
    }
}
