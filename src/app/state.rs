//! Application state management
use crate::{
    app::{AppError, Result},
    auth::RedisSessionStore,
    config::Config,
    database::{self, Database},
    email,
    eth::{NftVerifier, RpcNftVerifier},
    notify::RedisNotifier,
    payments::{PaymentGateway, StripeGateway},
    redis::Redis,
    services::{Integrations, Services},
};
use std::sync::Arc;
use tracing::info;

/// Shared application state
pub struct AppState {
    pub database: Arc<Database>,
    pub redis: Arc<Redis>,
    pub services: Services,
}

/// State provider that initializes application components
pub struct StateProvider {
    config: Config,
}

impl StateProvider {
    pub fn new(config: &Config) -> Self {
        Self { config: config.clone() }
    }

    /// Connect the stores and build the outbound integrations
    pub fn integrations(&self, redis: Arc<Redis>) -> Result<Integrations> {
        let config = &self.config;

        let payments: Option<Arc<dyn PaymentGateway>> = match config.stripe.secret_key {
            Some(_) => Some(Arc::new(
                StripeGateway::new(&config.stripe).map_err(|e| AppError::Integration(e.to_string()))?,
            )),
            None => {
                info!("Stripe is not configured; paid bookings wait for manual confirmation");
                None
            },
        };

        let nft: Option<Arc<dyn NftVerifier>> = if config.eth.enabled {
            Some(Arc::new(
                RpcNftVerifier::from_config(&config.eth).map_err(|e| AppError::Integration(e.to_string()))?,
            ))
        } else {
            info!("Wallet verification is disabled");
            None
        };

        let email = email::from_config(&config.email).map_err(|e| AppError::Integration(e.to_string()))?;

        Ok(Integrations { payments, nft, email, notifier: Arc::new(RedisNotifier::new(redis)) })
    }

    /// Initialize and provide the application state
    pub async fn provide(&self) -> Result<Arc<AppState>> {
        let redis = Arc::new(
            Redis::new(&self.config.redis).await.map_err(|e| AppError::Redis(e.to_string()))?,
        );
        redis.check_connection().await.map_err(|e| AppError::Redis(e.to_string()))?;

        let db = Arc::new(
            Database::new(&self.config.database)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?,
        );
        db.log_connection_info();

        let integrations = self.integrations(redis.clone())?;
        let services = Services::new(
            database::repositories(db.clone()),
            Arc::new(RedisSessionStore::new(redis.clone())),
            integrations,
            &self.config,
        );

        Ok(Arc::new(AppState { database: db, redis, services }))
    }
}
