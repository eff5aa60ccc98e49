//! Opaque bearer sessions
//!
//! Clients hold a random token; only its blake3 digest is stored, so a
//! leaked session store cannot be replayed as credentials.
use crate::core::repository::{RepositoryError, Result};
use crate::core::types::UserId;
use crate::redis::Redis;
use async_trait::async_trait;
use std::sync::Arc;

const SESSION_PREFIX: &str = "cowork:session:";

/// New random 256-bit token, hex encoded
pub fn generate_token() -> String {
    let bytes: [u8; 32] = rand::random();
    hex::encode(bytes)
}

/// Storage key for a token
pub fn token_key(token: &str) -> String {
    format!("{SESSION_PREFIX}{}", blake3::hash(token.as_bytes()).to_hex())
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn put(&self, key: &str, user_id: UserId, ttl_secs: u64) -> Result<()>;

    async fn get(&self, key: &str) -> Result<Option<UserId>>;

    async fn delete(&self, key: &str) -> Result<bool>;
}

pub struct RedisSessionStore {
    redis: Arc<Redis>,
}

impl RedisSessionStore {
    pub fn new(redis: Arc<Redis>) -> Self {
        Self { redis }
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn put(&self, key: &str, user_id: UserId, ttl_secs: u64) -> Result<()> {
        self.redis.set_ex(key, &user_id.to_string(), ttl_secs).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<UserId>> {
        match self.redis.get(key).await? {
            Some(raw) => raw
                .parse()
                .map(Some)
                .map_err(|e: uuid::Error| RepositoryError::Serialization(e.to_string())),
            None => Ok(None),
        }
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        Ok(self.redis.del(key).await?)
    }
}

#[cfg(test)]
pub use memory::MemorySessionStore;


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_are_random_and_hex() {
        let a = generate_token();
        let b = generate_token();
        assert_ne!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_key_hides_token() {
        let token = generate_token();
        let key = token_key(&token);
        assert!(key.starts_with(SESSION_PREFIX));
        assert!(!key.contains(&token));
        assert_eq!(key, token_key(&token));
    }

    #[tokio::test]
    async fn test_memory_store_expiry() {
        let store = MemorySessionStore::default();
        let user = UserId::new();
        store.put("live", user, 60).await.unwrap();
        store.put("dead", user, 0).await.unwrap();
        assert_eq!(store.get("live").await.unwrap(), Some(user));
        assert_eq!(store.get("dead").await.unwrap(), None);
        assert!(store.delete("live").await.unwrap());
        assert!(!store.delete("live").await.unwrap());
    }
}
