//! Configuration management for the application
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

pub use crate::eth::EthConfig;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Missing required configuration: {0}")]
    MissingConfig(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_seconds: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgresql://localhost/cowork".to_string(),
            max_connections: 20,
            timeout_seconds: 30,
        }
    }
}

/// Redis configuration (sessions and real-time fan-out)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    pub url: String,
    pub pool_size: u32,
    #[serde(default = "default_connection_timeout_ms")]
    pub connection_timeout_ms: u64,
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
}

fn default_connection_timeout_ms() -> u64 {
    5000
}

fn default_idle_timeout_secs() -> u64 {
    300
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
            pool_size: 10,
            connection_timeout_ms: default_connection_timeout_ms(),
            idle_timeout_secs: default_idle_timeout_secs(),
        }
    }
}

/// HTTP listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub health_port: u16,
    /// Public base URL used in links inside emails
    pub public_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 3000,
            health_port: 8080,
            public_url: "http://localhost:3000".to_string(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Logging format: "json" or "text"
    pub format: String,
    /// Default log level if no RUST_LOG is set
    pub default_level: String,
    /// Custom filter for dependency logs
    pub dependency_filter: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: "text".to_string(),
            default_level: "info".to_string(),
            dependency_filter: Some(
                "hyper=warn,h2=warn,tower=info,tokio_util=warn,mio=warn,rustls=warn,want=warn,sqlx=warn,reqwest=warn,alloy=warn".to_string()
            ),
        }
    }
}

/// StatsD configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsdConfig {
    pub prefix: String,
    pub addr: String,
    pub use_tags: bool,
    pub enabled: bool,
}

impl Default for StatsdConfig {
    fn default() -> Self {
        Self {
            prefix: "cowork".to_string(),
            addr: "127.0.0.1:8125".to_string(),
            use_tags: false,
            enabled: false,
        }
    }
}

/// Pricing knobs, all money in cents and all ratios in basis points
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PricingConfig {
    pub nft_workspace_discount_bp: u32,
    pub nft_cafe_discount_bp: u32,
    pub processing_fee_bp: u32,
    pub processing_fee_fixed_cents: i64,
    pub currency: CurrencyCode,
}

/// ISO currency code as sent to the payment gateway
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CurrencyCode {
    Usd,
    Eur,
    Gbp,
}

impl CurrencyCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CurrencyCode::Usd => "usd",
            CurrencyCode::Eur => "eur",
            CurrencyCode::Gbp => "gbp",
        }
    }
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            nft_workspace_discount_bp: 5000,
            nft_cafe_discount_bp: 1000,
            processing_fee_bp: 290,
            processing_fee_fixed_cents: 30,
            currency: CurrencyCode::Usd,
        }
    }
}

/// Booking rules
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingConfig {
    pub open_hour: u32,
    pub close_hour: u32,
    pub slot_minutes: u32,
    pub min_minutes: u32,
    /// Unpaid bookings older than this are cancelled by the lifecycle sweep
    pub pending_expiry_minutes: i64,
    pub sweep_interval_secs: u64,
    /// Timezone offset of the space relative to UTC, used for "today"
    pub utc_offset_minutes: i32,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            open_hour: 7,
            close_hour: 22,
            slot_minutes: 30,
            min_minutes: 60,
            pending_expiry_minutes: 30,
            sweep_interval_secs: 60,
            utc_offset_minutes: 0,
        }
    }
}

/// Stripe configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StripeConfig {
    pub secret_key: Option<String>,
    pub webhook_secret: Option<String>,
    pub api_base: String,
    pub webhook_tolerance_secs: i64,
}

impl Default for StripeConfig {
    fn default() -> Self {
        Self {
            secret_key: None,
            webhook_secret: None,
            api_base: "https://api.stripe.com".to_string(),
            webhook_tolerance_secs: 300,
        }
    }
}

/// Which email transport to use
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmailProvider {
    Log,
    Resend,
    Sendgrid,
}

/// Email configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub provider: EmailProvider,
    pub api_key: Option<String>,
    pub from_address: String,
    pub admin_address: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            provider: EmailProvider::Log,
            api_key: None,
            from_address: "hello@cowork.local".to_string(),
            admin_address: "admin@cowork.local".to_string(),
        }
    }
}

/// Session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub session_ttl_secs: u64,
    pub min_password_len: usize,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self { session_ttl_secs: 7 * 24 * 60 * 60, min_password_len: 8 }
    }
}

/// Per-class fixed window limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub window_secs: u64,
    pub general_limit: u32,
    pub auth_limit: u32,
    pub forms_limit: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self { enabled: true, window_secs: 60, general_limit: 120, auth_limit: 10, forms_limit: 5 }
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub statsd: StatsdConfig,
    pub eth: EthConfig,
    pub pricing: PricingConfig,
    pub booking: BookingConfig,
    pub stripe: StripeConfig,
    pub email: EmailConfig,
    pub auth: AuthConfig,
    pub rate_limit: RateLimitConfig,
}

impl Config {
    /// Load configuration from environment variables and optional config file
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if it exists
        let _ = dotenvy::dotenv().ok();

        let mut figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Env::prefixed("COWORK_").split("__"));

        // The config file location itself can only come from the environment
        if let Some(config_path) = std::env::var_os("COWORK_CONFIG") {
            if let Some(path_str) = config_path.to_str() {
                let path = Path::new(path_str);
                if path.exists() {
                    figment = figment.merge(Toml::file(path));
                }
            }
        }

        figment.extract().map_err(|e| ConfigError::LoadError(e.to_string()))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.url.is_empty() {
            return Err(ConfigError::MissingConfig("Database URL is required".to_string()));
        }

        if self.redis.url.is_empty() {
            return Err(ConfigError::MissingConfig("Redis URL is required".to_string()));
        }

        if self.booking.open_hour >= self.booking.close_hour || self.booking.close_hour > 24 {
            return Err(ConfigError::InvalidValue(format!(
                "Opening hours {}..{} are not a valid range",
                self.booking.open_hour, self.booking.close_hour
            )));
        }

        if self.booking.slot_minutes == 0 || 60 % self.booking.slot_minutes != 0 {
            return Err(ConfigError::InvalidValue(
                "booking.slot_minutes must divide an hour".to_string(),
            ));
        }

        for (name, bp) in [
            ("nft_workspace_discount_bp", self.pricing.nft_workspace_discount_bp),
            ("nft_cafe_discount_bp", self.pricing.nft_cafe_discount_bp),
            ("processing_fee_bp", self.pricing.processing_fee_bp),
        ] {
            if bp > 10_000 {
                return Err(ConfigError::InvalidValue(format!(
                    "pricing.{} must be at most 10000 basis points",
                    name
                )));
            }
        }

        if self.pricing.processing_fee_fixed_cents < 0 {
            return Err(ConfigError::InvalidValue(
                "pricing.processing_fee_fixed_cents cannot be negative".to_string(),
            ));
        }

        if self.email.provider != EmailProvider::Log && self.email.api_key.is_none() {
            return Err(ConfigError::MissingConfig(
                "email.api_key is required for the configured provider".to_string(),
            ));
        }

        if self.eth.enabled {
            if self.eth.nft_contract.is_none() {
                return Err(ConfigError::MissingConfig(
                    "eth.nft_contract is required when wallet verification is enabled".to_string(),
                ));
            }
            if self.eth.rpc_url.is_none() && self.eth.alchemy_api_key.is_none() {
                return Err(ConfigError::MissingConfig(
                    "eth.rpc_url or eth.alchemy_api_key is required".to_string(),
                ));
            }
        }

        if self.rate_limit.enabled && self.rate_limit.window_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "rate_limit.window_secs must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.pricing.nft_workspace_discount_bp, 5000);
        assert_eq!(config.pricing.nft_cafe_discount_bp, 1000);
    }

    #[test]
    fn test_invalid_opening_hours() {
        let mut config = Config::default();
        config.booking.open_hour = 20;
        config.booking.close_hour = 8;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidValue(_))));
    }

    #[test]
    fn test_email_provider_requires_key() {
        let mut config = Config::default();
        config.email.provider = EmailProvider::Resend;
        assert!(matches!(config.validate(), Err(ConfigError::MissingConfig(_))));

        config.email.api_key = Some("re_test".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_discount_above_full_price_rejected() {
        let mut config = Config::default();
        config.pricing.nft_cafe_discount_bp = 12_000;
        assert!(config.validate().is_err());
    }
}
