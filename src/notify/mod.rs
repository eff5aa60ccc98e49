//! Real-time event fan-out over Redis pub/sub
use crate::redis::Redis;
use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, warn};

/// Channel read by the admin dashboard
pub const ADMIN_CHANNEL: &str = "admin";

/// Per-user channel name
pub fn user_channel(user_id: impl std::fmt::Display) -> String {
    format!("user-{user_id}")
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Best effort: delivery failures are logged, never returned
    async fn publish(&self, channel: &str, event: &str, payload: Value);
}

pub struct RedisNotifier {
    redis: Arc<Redis>,
}

impl RedisNotifier {
    pub fn new(redis: Arc<Redis>) -> Self {
        Self { redis }
    }
}

/// Wire format published on `cowork:{channel}`
pub fn envelope(event: &str, payload: Value) -> String {
    json!({ "event": event, "data": payload }).to_string()
}

#[async_trait]
impl Notifier for RedisNotifier {
    async fn publish(&self, channel: &str, event: &str, payload: Value) {
        let channel = format!("cowork:{channel}");
        match self.redis.publish(&channel, &envelope(event, payload)).await {
            Ok(receivers) => debug!(%channel, event, receivers, "Published notification"),
            Err(e) => warn!(%channel, event, "Failed to publish notification: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_shape() {
        let raw = envelope("order.created", json!({ "id": 7 }));
        let parsed: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed["event"], "order.created");
        assert_eq!(parsed["data"]["id"], 7);
    }

    #[test]
    fn test_user_channel() {
        assert_eq!(user_channel("abc"), "user-abc");
    }
}
