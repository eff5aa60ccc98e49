//! Repository traits for domain abstractions
use crate::core::credits::Deduction;
use crate::core::types::*;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Repository error type
#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Redis error: {0}")]
    Redis(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type for repository operations
pub type Result<T> = std::result::Result<T, RepositoryError>;

/// Offset pagination, clamped to sane bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Page {
    #[serde(default = "Page::default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

impl Page {
    pub const MAX_LIMIT: i64 = 200;

    fn default_limit() -> i64 {
        50
    }

    pub fn new(limit: i64, offset: i64) -> Self {
        Self { limit, offset }.clamped()
    }

    pub fn clamped(self) -> Self {
        Self { limit: self.limit.clamp(1, Self::MAX_LIMIT), offset: self.offset.max(0) }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self { limit: Self::default_limit(), offset: 0 }
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub role: Role,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewWorkspace {
    pub name: String,
    pub kind: WorkspaceKind,
    #[serde(default)]
    pub description: String,
    pub capacity: i32,
    pub hourly_rate_cents: Cents,
    pub daily_rate_cents: Option<Cents>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkspaceUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub capacity: Option<i32>,
    pub hourly_rate_cents: Option<Cents>,
    pub daily_rate_cents: Option<Cents>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct NewBooking {
    pub user_id: UserId,
    pub workspace_id: WorkspaceId,
    pub booking_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub base_price_cents: Cents,
    pub discount_cents: Cents,
    pub fee_cents: Cents,
    pub total_cents: Cents,
    pub credits_used: i32,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingFilter {
    pub status: Option<BookingStatus>,
    pub date: Option<NaiveDate>,
    pub workspace_id: Option<WorkspaceId>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewMenuItem {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category: String,
    pub price_cents: Cents,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MenuItemUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub price_cents: Option<Cents>,
    pub is_available: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: UserId,
    pub lines: Vec<OrderLine>,
    pub subtotal_cents: Cents,
    pub discount_cents: Cents,
    pub fee_cents: Cents,
    pub total_cents: Cents,
    pub payment_status: PaymentStatus,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewCredit {
    pub user_id: UserId,
    pub kind: CreditKind,
    pub hours: i32,
    pub valid_from: NaiveDate,
    pub valid_until: NaiveDate,
}

#[derive(Debug, Clone)]
pub struct NewContact {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct NewAuditLog {
    pub actor_id: Option<UserId>,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<String>,
    pub details: serde_json::Value,
    pub ip_address: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub slug: String,
    pub title: String,
    pub excerpt: String,
    pub body: String,
    pub author_id: Option<UserId>,
    pub status: PostStatus,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostUpdate {
    pub title: Option<String>,
    pub excerpt: Option<String>,
    pub body: Option<String>,
    pub status: Option<PostStatus>,
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a user; duplicate email is a conflict
    async fn create(&self, user: NewUser) -> Result<User>;

    async fn get(&self, id: UserId) -> Result<Option<User>>;

    /// Lookup by normalized (lowercase) email
    async fn get_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Record the outcome of a wallet verification
    async fn update_wallet(
        &self,
        id: UserId,
        wallet_address: Option<String>,
        is_nft_holder: bool,
        verified_at: DateTime<Utc>,
    ) -> Result<User>;

    async fn set_role(&self, id: UserId, role: Role) -> Result<User>;

    async fn list(&self, page: Page) -> Result<Vec<User>>;

    async fn count(&self) -> Result<i64>;

    /// Users with a wallet whose holder status was verified before `before`
    async fn stale_wallets(&self, before: DateTime<Utc>, limit: i64) -> Result<Vec<User>>;
}

#[async_trait]
pub trait WorkspaceRepository: Send + Sync {
    async fn list(&self, active_only: bool) -> Result<Vec<Workspace>>;

    async fn get(&self, id: WorkspaceId) -> Result<Option<Workspace>>;

    async fn create(&self, workspace: NewWorkspace) -> Result<Workspace>;

    async fn update(&self, id: WorkspaceId, update: WorkspaceUpdate) -> Result<Workspace>;
}

#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Insert a booking and consume its credits atomically.
    ///
    /// The overlap check is repeated under a lock on the workspace; when the
    /// slot already holds `concurrency` blocking bookings the insert fails
    /// with `Conflict` and no credits are touched.
    async fn create_checked(
        &self,
        booking: NewBooking,
        concurrency: usize,
        deductions: &[Deduction],
    ) -> Result<Booking>;

    async fn get(&self, id: BookingId) -> Result<Option<Booking>>;

    async fn list_for_user(&self, user_id: UserId, page: Page) -> Result<Vec<Booking>>;

    async fn list(&self, filter: BookingFilter, page: Page) -> Result<Vec<Booking>>;

    /// Pending and confirmed bookings of a workspace on a day
    async fn blocking_on(&self, workspace_id: WorkspaceId, date: NaiveDate) -> Result<Vec<Booking>>;

    /// Move `expected` → `next`; a concurrent change is a conflict
    async fn update_status(
        &self,
        id: BookingId,
        expected: BookingStatus,
        next: BookingStatus,
    ) -> Result<Booking>;

    /// Cancel and return consumed credit hours to their grants
    async fn cancel(&self, id: BookingId, expected: BookingStatus) -> Result<Booking>;

    async fn set_payment(
        &self,
        id: BookingId,
        payment_status: PaymentStatus,
        payment_intent_id: Option<String>,
    ) -> Result<Booking>;

    /// Pending unpaid bookings created before the cutoff
    async fn stale_pending(&self, created_before: DateTime<Utc>) -> Result<Vec<Booking>>;

    /// Mark confirmed bookings that ended before `now` as completed
    async fn complete_finished(&self, date: NaiveDate, time: NaiveTime) -> Result<u64>;

    async fn count_on(&self, date: NaiveDate) -> Result<i64>;

    /// Paid booking revenue created in `[from, to)`
    async fn revenue_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Cents>;
}

#[async_trait]
pub trait MenuRepository: Send + Sync {
    async fn list(&self, available_only: bool) -> Result<Vec<MenuItem>>;

    async fn get_many(&self, ids: &[MenuItemId]) -> Result<Vec<MenuItem>>;

    async fn create(&self, item: NewMenuItem) -> Result<MenuItem>;

    async fn update(&self, id: MenuItemId, update: MenuItemUpdate) -> Result<MenuItem>;
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Insert the order with its lines in one transaction
    async fn create(&self, order: NewOrder) -> Result<Order>;

    async fn get(&self, id: OrderId) -> Result<Option<Order>>;

    async fn list_for_user(&self, user_id: UserId, page: Page) -> Result<Vec<Order>>;

    async fn list(&self, status: Option<OrderStatus>, page: Page) -> Result<Vec<Order>>;

    async fn update_status(
        &self,
        id: OrderId,
        expected: OrderStatus,
        next: OrderStatus,
    ) -> Result<Order>;

    async fn set_payment(
        &self,
        id: OrderId,
        payment_status: PaymentStatus,
        payment_intent_id: Option<String>,
    ) -> Result<Order>;

    async fn count_with_status(&self, status: OrderStatus) -> Result<i64>;

    async fn revenue_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Cents>;
}

#[async_trait]
pub trait CreditRepository: Send + Sync {
    /// Grants of `kind` with hours left that are valid on `on`
    async fn active_for(&self, user_id: UserId, kind: CreditKind, on: NaiveDate) -> Result<Vec<MembershipCredit>>;

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<MembershipCredit>>;

    /// Insert a grant together with its allocation ledger entry
    async fn grant(&self, credit: NewCredit, description: &str) -> Result<MembershipCredit>;

    async fn transactions_for_user(&self, user_id: UserId, page: Page) -> Result<Vec<CreditTransaction>>;
}

#[async_trait]
pub trait ContactRepository: Send + Sync {
    async fn create(&self, contact: NewContact) -> Result<ContactSubmission>;

    async fn list(&self, status: Option<ContactStatus>, page: Page) -> Result<Vec<ContactSubmission>>;

    async fn update_status(&self, id: Uuid, status: ContactStatus) -> Result<ContactSubmission>;

    async fn count_with_status(&self, status: ContactStatus) -> Result<i64>;
}

#[async_trait]
pub trait NewsletterRepository: Send + Sync {
    /// Upsert; returns the row and whether it was not already active
    async fn subscribe(&self, email: &str) -> Result<(NewsletterSubscriber, bool)>;

    /// Returns false when the address was not subscribed
    async fn unsubscribe(&self, email: &str) -> Result<bool>;

    async fn list_active(&self, page: Page) -> Result<Vec<NewsletterSubscriber>>;

    async fn count_active(&self) -> Result<i64>;
}

#[async_trait]
pub trait AuditLogRepository: Send + Sync {
    async fn record(&self, entry: NewAuditLog) -> Result<()>;

    async fn list(&self, page: Page) -> Result<Vec<AuditLog>>;
}

#[async_trait]
pub trait BlogRepository: Send + Sync {
    async fn list_published(&self, page: Page) -> Result<Vec<BlogPost>>;

    async fn get_by_slug(&self, slug: &str) -> Result<Option<BlogPost>>;

    async fn list_all(&self, page: Page) -> Result<Vec<BlogPost>>;

    async fn create(&self, post: NewPost) -> Result<BlogPost>;

    async fn update(&self, id: PostId, update: PostUpdate) -> Result<BlogPost>;
}

/// All repositories the services depend on
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub workspaces: Arc<dyn WorkspaceRepository>,
    pub bookings: Arc<dyn BookingRepository>,
    pub menu: Arc<dyn MenuRepository>,
    pub orders: Arc<dyn OrderRepository>,
    pub credits: Arc<dyn CreditRepository>,
    pub contacts: Arc<dyn ContactRepository>,
    pub newsletter: Arc<dyn NewsletterRepository>,
    pub audit: Arc<dyn AuditLogRepository>,
    pub blog: Arc<dyn BlogRepository>,
}
