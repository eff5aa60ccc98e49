#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Redis error: {0}")]
    RedisError(#[from] bb8_redis::redis::RedisError),
    #[error("Pool error: {0}")]
    PoolError(String),
}

impl From<Error> for crate::core::RepositoryError {
    fn from(err: Error) -> Self {
        crate::core::RepositoryError::Redis(err.to_string())
    }
}
