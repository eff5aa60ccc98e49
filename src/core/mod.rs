//! Core domain modules
pub mod availability;
pub mod credits;
pub mod error;
pub mod pricing;
pub mod repository;
pub mod types;

#[cfg(test)]
pub(crate) mod memory;

// Re-export common types
pub use error::{DomainError, DomainResult};
pub use repository::{Page, Repositories, RepositoryError};
pub use types::{
    Booking, BookingId, BookingStatus, Cents, CreditKind, MenuItemId, OrderId, OrderStatus,
    PaymentStatus, Role, User, UserId, Workspace, WorkspaceId, WorkspaceKind,
};
