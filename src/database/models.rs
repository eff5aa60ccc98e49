//! Row types for SQLx and their conversion into domain types
use crate::core::repository::RepositoryError;
use crate::core::types::*;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use std::str::FromStr;
use uuid::Uuid;

fn parse<T>(value: &str) -> Result<T, RepositoryError>
where
    T: FromStr<Err = ParseEnumError>,
{
    value.parse().map_err(|e: ParseEnumError| RepositoryError::Serialization(e.to_string()))
}

#[derive(Debug, sqlx::FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub role: String,
    pub wallet_address: Option<String>,
    pub is_nft_holder: bool,
    pub nft_verified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: row.id.into(),
            email: row.email,
            password_hash: row.password_hash,
            name: row.name,
            role: parse(&row.role)?,
            wallet_address: row.wallet_address,
            is_nft_holder: row.is_nft_holder,
            nft_verified_at: row.nft_verified_at,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct WorkspaceRow {
    pub id: Uuid,
    pub name: String,
    pub kind: String,
    pub description: String,
    pub capacity: i32,
    pub hourly_rate_cents: i64,
    pub daily_rate_cents: Option<i64>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<WorkspaceRow> for Workspace {
    type Error = RepositoryError;

    fn try_from(row: WorkspaceRow) -> Result<Self, Self::Error> {
        Ok(Workspace {
            id: row.id.into(),
            name: row.name,
            kind: parse(&row.kind)?,
            description: row.description,
            capacity: row.capacity,
            hourly_rate_cents: row.hourly_rate_cents,
            daily_rate_cents: row.daily_rate_cents,
            is_active: row.is_active,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct BookingRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub workspace_id: Uuid,
    pub booking_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub base_price_cents: i64,
    pub discount_cents: i64,
    pub fee_cents: i64,
    pub total_cents: i64,
    pub credits_used: i32,
    pub status: String,
    pub payment_status: String,
    pub payment_intent_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = RepositoryError;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        Ok(Booking {
            id: row.id.into(),
            user_id: row.user_id.into(),
            workspace_id: row.workspace_id.into(),
            booking_date: row.booking_date,
            start_time: row.start_time,
            end_time: row.end_time,
            base_price_cents: row.base_price_cents,
            discount_cents: row.discount_cents,
            fee_cents: row.fee_cents,
            total_cents: row.total_cents,
            credits_used: row.credits_used,
            status: parse(&row.status)?,
            payment_status: parse(&row.payment_status)?,
            payment_intent_id: row.payment_intent_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct MenuItemRow {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub category: String,
    pub price_cents: i64,
    pub is_available: bool,
}

impl From<MenuItemRow> for MenuItem {
    fn from(row: MenuItemRow) -> Self {
        MenuItem {
            id: row.id.into(),
            name: row.name,
            description: row.description,
            category: row.category,
            price_cents: row.price_cents,
            is_available: row.is_available,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct OrderRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: String,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub fee_cents: i64,
    pub total_cents: i64,
    pub payment_status: String,
    pub payment_intent_id: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
pub struct OrderLineRow {
    pub order_id: Uuid,
    pub menu_item_id: Uuid,
    pub name: String,
    pub quantity: i32,
    pub unit_price_cents: i64,
}

impl From<OrderLineRow> for OrderLine {
    fn from(row: OrderLineRow) -> Self {
        OrderLine {
            menu_item_id: row.menu_item_id.into(),
            name: row.name,
            quantity: row.quantity,
            unit_price_cents: row.unit_price_cents,
        }
    }
}

impl OrderRow {
    pub fn into_order(self, lines: Vec<OrderLine>) -> Result<Order, RepositoryError> {
        Ok(Order {
            id: self.id.into(),
            user_id: self.user_id.into(),
            status: parse(&self.status)?,
            lines,
            subtotal_cents: self.subtotal_cents,
            discount_cents: self.discount_cents,
            fee_cents: self.fee_cents,
            total_cents: self.total_cents,
            payment_status: parse(&self.payment_status)?,
            payment_intent_id: self.payment_intent_id,
            notes: self.notes,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct CreditRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: String,
    pub total_hours: i32,
    pub remaining_hours: i32,
    pub valid_from: NaiveDate,
    pub valid_until: NaiveDate,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<CreditRow> for MembershipCredit {
    type Error = RepositoryError;

    fn try_from(row: CreditRow) -> Result<Self, Self::Error> {
        Ok(MembershipCredit {
            id: row.id.into(),
            user_id: row.user_id.into(),
            kind: parse(&row.kind)?,
            total_hours: row.total_hours,
            remaining_hours: row.remaining_hours,
            valid_from: row.valid_from,
            valid_until: row.valid_until,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct CreditTransactionRow {
    pub id: Uuid,
    pub credit_id: Uuid,
    pub user_id: Uuid,
    pub booking_id: Option<Uuid>,
    pub amount_hours: i32,
    pub kind: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<CreditTransactionRow> for CreditTransaction {
    type Error = RepositoryError;

    fn try_from(row: CreditTransactionRow) -> Result<Self, Self::Error> {
        Ok(CreditTransaction {
            id: row.id,
            credit_id: row.credit_id.into(),
            user_id: row.user_id.into(),
            booking_id: row.booking_id.map(Into::into),
            amount_hours: row.amount_hours,
            kind: parse(&row.kind)?,
            description: row.description,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct ContactRow {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<ContactRow> for ContactSubmission {
    type Error = RepositoryError;

    fn try_from(row: ContactRow) -> Result<Self, Self::Error> {
        Ok(ContactSubmission {
            id: row.id,
            name: row.name,
            email: row.email,
            subject: row.subject,
            message: row.message,
            status: parse(&row.status)?,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct SubscriberRow {
    pub id: Uuid,
    pub email: String,
    pub subscribed: bool,
    pub subscribed_at: DateTime<Utc>,
    pub unsubscribed_at: Option<DateTime<Utc>>,
}

impl From<SubscriberRow> for NewsletterSubscriber {
    fn from(row: SubscriberRow) -> Self {
        NewsletterSubscriber {
            id: row.id,
            email: row.email,
            subscribed: row.subscribed,
            subscribed_at: row.subscribed_at,
            unsubscribed_at: row.unsubscribed_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct AuditLogRow {
    pub id: Uuid,
    pub actor_id: Option<Uuid>,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<String>,
    pub details: serde_json::Value,
    pub ip_address: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<AuditLogRow> for AuditLog {
    fn from(row: AuditLogRow) -> Self {
        AuditLog {
            id: row.id,
            actor_id: row.actor_id.map(Into::into),
            action: row.action,
            entity_type: row.entity_type,
            entity_id: row.entity_id,
            details: row.details,
            ip_address: row.ip_address,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct BlogPostRow {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub excerpt: String,
    pub body: String,
    pub author_id: Option<Uuid>,
    pub status: String,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<BlogPostRow> for BlogPost {
    type Error = RepositoryError;

    fn try_from(row: BlogPostRow) -> Result<Self, Self::Error> {
        Ok(BlogPost {
            id: row.id.into(),
            slug: row.slug,
            title: row.title,
            excerpt: row.excerpt,
            body: row.body,
            author_id: row.author_id.map(Into::into),
            status: parse(&row.status)?,
            published_at: row.published_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Convert a batch of rows, failing on the first bad one
pub fn convert_all<R, T>(rows: Vec<R>) -> Result<Vec<T>, RepositoryError>
where
    T: TryFrom<R, Error = RepositoryError>,
{
    rows.into_iter().map(T::try_from).collect()
}
