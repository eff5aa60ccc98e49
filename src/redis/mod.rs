pub mod client;
pub mod error;

pub use client::Redis;
pub use error::Error;
