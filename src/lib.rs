//! Cowork - coworking space backend
//!
//! Bookings with membership credits and NFT-holder pricing, cafe ordering,
//! card payments, content and an admin back office, served as a JSON API.

pub mod api;
pub mod app;
pub mod auth;
pub mod config;
pub mod core;
pub mod database;
pub mod email;
pub mod error;
pub mod eth;
pub mod health;
pub mod metrics;
pub mod notify;
pub mod payments;
pub mod redis;
pub mod services;
