//! Core domain types for the application

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Money amounts are integer cents
pub type Cents = i64;

/// Error returned when a stored text value does not map onto an enum variant
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} value: {value}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! id_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generate a fresh random identifier
            #[inline]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Get the inner value
            #[inline]
            pub fn value(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }
    };
}

macro_rules! text_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            /// Text form used in the database and JSON
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(ParseEnumError {
                        kind: stringify!($name),
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

id_newtype!(
    /// User identifier
    UserId
);
id_newtype!(
    /// Workspace identifier
    WorkspaceId
);
id_newtype!(
    /// Booking identifier
    BookingId
);
id_newtype!(
    /// Cafe menu item identifier
    MenuItemId
);
id_newtype!(
    /// Cafe order identifier
    OrderId
);
id_newtype!(
    /// Membership credit grant identifier
    CreditId
);
id_newtype!(
    /// Blog post identifier
    PostId
);

text_enum!(
    /// Account role
    Role { Member => "member", Admin => "admin" }
);

text_enum!(
    /// Kind of bookable space
    WorkspaceKind {
        HotDesk => "hot_desk",
        DedicatedDesk => "dedicated_desk",
        MeetingRoom => "meeting_room",
        PrivateOffice => "private_office",
    }
);

impl WorkspaceKind {
    /// Number of overlapping bookings the space admits
    pub fn concurrency(&self, capacity: i32) -> usize {
        match self {
            WorkspaceKind::HotDesk => capacity.max(1) as usize,
            _ => 1,
        }
    }

    /// Credit bucket consumed when booking this kind of space
    pub fn credit_kind(&self) -> CreditKind {
        match self {
            WorkspaceKind::HotDesk | WorkspaceKind::DedicatedDesk => CreditKind::DeskHours,
            WorkspaceKind::MeetingRoom | WorkspaceKind::PrivateOffice => {
                CreditKind::MeetingRoomHours
            },
        }
    }
}

text_enum!(
    /// Booking lifecycle status
    BookingStatus {
        Pending => "pending",
        Confirmed => "confirmed",
        Cancelled => "cancelled",
        Completed => "completed",
    }
);

impl BookingStatus {
    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        use BookingStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed) | (Pending, Cancelled) | (Confirmed, Cancelled) | (Confirmed, Completed)
        )
    }

    /// Whether a booking in this status holds its slot
    pub fn is_blocking(&self) -> bool {
        matches!(self, BookingStatus::Pending | BookingStatus::Confirmed)
    }
}

text_enum!(
    /// Cafe order lifecycle status
    OrderStatus {
        Pending => "pending",
        Preparing => "preparing",
        Ready => "ready",
        Completed => "completed",
        Cancelled => "cancelled",
    }
);

impl OrderStatus {
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Preparing)
                | (Preparing, Ready)
                | (Ready, Completed)
                | (Pending, Cancelled)
                | (Preparing, Cancelled)
        )
    }
}

text_enum!(
    /// Payment state of a booking or order
    PaymentStatus {
        Unpaid => "unpaid",
        Paid => "paid",
        Refunded => "refunded",
        NotRequired => "not_required",
    }
);

text_enum!(
    /// Credit bucket
    CreditKind { MeetingRoomHours => "meeting_room_hours", DeskHours => "desk_hours" }
);

text_enum!(
    /// Ledger entry kind
    CreditTransactionKind {
        Allocation => "allocation",
        Usage => "usage",
        Refund => "refund",
        Adjustment => "adjustment",
    }
);

text_enum!(
    ContactStatus { New => "new", Read => "read", Replied => "replied" }
);

text_enum!(
    PostStatus { Draft => "draft", Published => "published" }
);

/// Registered account
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub name: String,
    pub role: Role,
    pub wallet_address: Option<String>,
    pub is_nft_holder: bool,
    pub nft_verified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Bookable space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workspace {
    pub id: WorkspaceId,
    pub name: String,
    pub kind: WorkspaceKind,
    pub description: String,
    pub capacity: i32,
    pub hourly_rate_cents: Cents,
    pub daily_rate_cents: Option<Cents>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Reservation of a workspace for a time range on one day
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Booking {
    pub id: BookingId,
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
    pub payment_intent_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn duration_minutes(&self) -> i64 {
        (self.end_time - self.start_time).num_minutes()
    }
}

/// Cafe menu entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: MenuItemId,
    pub name: String,
    pub description: String,
    pub category: String,
    pub price_cents: Cents,
    pub is_available: bool,
}

/// One line of a cafe order, priced at order time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    pub menu_item_id: MenuItemId,
    pub name: String,
    pub quantity: i32,
    pub unit_price_cents: Cents,
}

/// Cafe order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub status: OrderStatus,
    pub lines: Vec<OrderLine>,
    pub subtotal_cents: Cents,
    pub discount_cents: Cents,
    pub fee_cents: Cents,
    pub total_cents: Cents,
    pub payment_status: PaymentStatus,
    pub payment_intent_id: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Prepaid allowance of hours
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MembershipCredit {
    pub id: CreditId,
    pub user_id: UserId,
    pub kind: CreditKind,
    pub total_hours: i32,
    pub remaining_hours: i32,
    pub valid_from: NaiveDate,
    pub valid_until: NaiveDate,
    pub created_at: DateTime<Utc>,
}

/// Ledger entry for a credit movement; negative amounts are consumption
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreditTransaction {
    pub id: Uuid,
    pub credit_id: CreditId,
    pub user_id: UserId,
    pub booking_id: Option<BookingId>,
    pub amount_hours: i32,
    pub kind: CreditTransactionKind,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContactSubmission {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    pub status: ContactStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewsletterSubscriber {
    pub id: Uuid,
    pub email: String,
    pub subscribed: bool,
    pub subscribed_at: DateTime<Utc>,
    pub unsubscribed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditLog {
    pub id: Uuid,
    pub actor_id: Option<UserId>,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<String>,
    pub details: serde_json::Value,
    pub ip_address: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlogPost {
    pub id: PostId,
    pub slug: String,
    pub title: String,
    pub excerpt: String,
    pub body: String,
    pub author_id: Option<UserId>,
    pub status: PostStatus,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
