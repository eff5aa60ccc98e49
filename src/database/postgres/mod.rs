//! PostgreSQL implementations of the domain repositories
mod audit;
mod bookings;
mod cafe;
mod content;
mod credits;
mod users;
mod workspaces;

pub use audit::PostgresAuditLogRepository;
pub use bookings::PostgresBookingRepository;
pub use cafe::{PostgresMenuRepository, PostgresOrderRepository};
pub use content::{PostgresBlogRepository, PostgresContactRepository, PostgresNewsletterRepository};
pub use credits::PostgresCreditRepository;
pub use users::PostgresUserRepository;
pub use workspaces::PostgresWorkspaceRepository;

use crate::core::repository::{Repositories, RepositoryError};
use crate::database::client::Database;
use std::fmt::Display;
use std::sync::Arc;

/// Wire every repository to one shared pool
pub fn repositories(db: Arc<Database>) -> Repositories {
    Repositories {
        users: Arc::new(PostgresUserRepository::new(db.clone())),
        workspaces: Arc::new(PostgresWorkspaceRepository::new(db.clone())),
        bookings: Arc::new(PostgresBookingRepository::new(db.clone())),
        menu: Arc::new(PostgresMenuRepository::new(db.clone())),
        orders: Arc::new(PostgresOrderRepository::new(db.clone())),
        credits: Arc::new(PostgresCreditRepository::new(db.clone())),
        contacts: Arc::new(PostgresContactRepository::new(db.clone())),
        newsletter: Arc::new(PostgresNewsletterRepository::new(db.clone())),
        audit: Arc::new(PostgresAuditLogRepository::new(db.clone())),
        blog: Arc::new(PostgresBlogRepository::new(db)),
    }
}

/// Unique violations surface as conflicts, everything else as a database error
pub(crate) fn map_write_error(err: sqlx::Error, conflict: &str) -> RepositoryError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            RepositoryError::Conflict(conflict.to_string())
        },
        _ => RepositoryError::Database(err),
    }
}

pub(crate) fn not_found(entity: &str, id: impl Display) -> RepositoryError {
    RepositoryError::NotFound(format!("{entity} {id}"))
}
