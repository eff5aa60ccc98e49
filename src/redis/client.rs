use crate::{config::RedisConfig, redis::error::Error};
use bb8_redis::{RedisConnectionManager, redis::RedisResult};
use std::time::Duration;
use tracing::{info, warn};

pub struct Redis {
    pub pool: bb8::Pool<RedisConnectionManager>,
}

impl Redis {
    pub async fn new(config: &RedisConfig) -> Result<Self, Error> {
        let manager =
            RedisConnectionManager::new(config.url.as_str()).map_err(Error::RedisError)?;

        let pool = bb8::Pool::builder()
            .retry_connection(true)
            .max_size(config.pool_size)
            .connection_timeout(Duration::from_millis(config.connection_timeout_ms))
            .idle_timeout(Some(Duration::from_secs(config.idle_timeout_secs)))
            .build(manager)
            .await
            .map_err(|e| Error::PoolError(e.to_string()))?;

        info!(
            "Initialized Redis pool with {} max connections, {}ms connection timeout, {}s idle timeout",
            config.pool_size, config.connection_timeout_ms, config.idle_timeout_secs
        );

        // Start pool health monitoring
        let pool_monitor = pool.clone();
        let max_pool_size = config.pool_size;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(60));
            loop {
                interval.tick().await;
                let state = pool_monitor.state();
                let idle_pct = if state.connections > 0 {
                    (state.idle_connections as f32 / state.connections as f32) * 100.0
                } else {
                    0.0
                };

                if idle_pct < 20.0 && state.connections >= max_pool_size {
                    warn!("Redis pool under pressure: only {:.1}% idle connections", idle_pct);
                }
            }
        });

        Ok(Self { pool })
    }

    async fn connection(&self) -> Result<bb8::PooledConnection<'_, RedisConnectionManager>, Error> {
        self.pool.get().await.map_err(|e| Error::PoolError(e.to_string()))
    }

    pub async fn check_connection(&self) -> Result<bool, Error> {
        let mut conn = self.connection().await?;

        let response: RedisResult<String> =
            bb8_redis::redis::cmd("PING").query_async(&mut *conn).await;

        match response {
            Ok(s) => Ok(s == "PONG"),
            Err(e) => Err(Error::RedisError(e)),
        }
    }

    /// SET with an expiry in seconds
    pub async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), Error> {
        let mut conn = self.connection().await?;
        let result: RedisResult<()> = bb8_redis::redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("EX")
            .arg(ttl_secs.max(1))
            .query_async(&mut *conn)
            .await;
        result.map_err(Error::RedisError)
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>, Error> {
        let mut conn = self.connection().await?;
        let result: RedisResult<Option<String>> =
            bb8_redis::redis::cmd("GET").arg(key).query_async(&mut *conn).await;
        result.map_err(Error::RedisError)
    }

    /// Delete a key, returning whether it existed
    pub async fn del(&self, key: &str) -> Result<bool, Error> {
        let mut conn = self.connection().await?;
        let result: RedisResult<u64> =
            bb8_redis::redis::cmd("DEL").arg(key).query_async(&mut *conn).await;
        Ok(result? > 0)
    }

    /// Publish a message, returning the number of receiving subscribers
    pub async fn publish(&self, channel: &str, payload: &str) -> Result<u64, Error> {
        let mut conn = self.connection().await?;
        let result: RedisResult<u64> = bb8_redis::redis::cmd("PUBLISH")
            .arg(channel)
            .arg(payload)
            .query_async(&mut *conn)
            .await;
        result.map_err(Error::RedisError)
    }
}
