//! Route handlers, grouped by area
pub mod account;
pub mod admin;
pub mod auth;
pub mod bookings;
pub mod cafe;
pub mod content;
pub mod payments;
pub mod workspaces;

use serde::Deserialize;

/// Body of the admin status endpoints
#[derive(Debug, Deserialize)]
pub struct StatusChange<S> {
    pub status: S,
}

/// Optional `?status=` filter
#[derive(Debug, Deserialize)]
pub struct StatusFilter<S> {
    pub status: Option<S>,
}
