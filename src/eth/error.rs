//! Error types for the Ethereum module.

use thiserror::Error;

/// Errors that can occur when verifying wallets and token balances.
#[derive(Debug, Error)]
pub enum EthError {
    /// Error when interacting with a provider
    #[error("Provider error: {0}")]
    ProviderError(String),

    /// Malformed or non-matching wallet signature
    #[error("Signature error: {0}")]
    SignatureError(String),

    /// Address could not be parsed
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for Ethereum operations
pub type Result<T> = std::result::Result<T, EthError>;

/// Ethereum network types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkKind {
    /// Ethereum mainnet
    Mainnet,
    /// Base mainnet
    Base,
    /// Polygon mainnet
    Polygon,
    /// Sepolia testnet
    Sepolia,
    /// Base Sepolia testnet
    BaseSepolia,
}

impl NetworkKind {
    /// Parse a configured network name
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "mainnet" => Ok(NetworkKind::Mainnet),
            "base" => Ok(NetworkKind::Base),
            "polygon" => Ok(NetworkKind::Polygon),
            "sepolia" => Ok(NetworkKind::Sepolia),
            "base-sepolia" => Ok(NetworkKind::BaseSepolia),
            other => Err(EthError::ConfigError(format!("unknown network '{other}'"))),
        }
    }

    /// Get the network name
    pub fn name(&self) -> &str {
        match self {
            NetworkKind::Mainnet => "mainnet",
            NetworkKind::Base => "base",
            NetworkKind::Polygon => "polygon",
            NetworkKind::Sepolia => "sepolia",
            NetworkKind::BaseSepolia => "base-sepolia",
        }
    }

    /// Get the Alchemy RPC URL for this network
    pub fn alchemy_url(&self, api_key: &str) -> String {
        let host = match self {
            NetworkKind::Mainnet => "eth-mainnet",
            NetworkKind::Base => "base-mainnet",
            NetworkKind::Polygon => "polygon-mainnet",
            NetworkKind::Sepolia => "eth-sepolia",
            NetworkKind::BaseSepolia => "base-sepolia",
        };
        format!("https://{host}.g.alchemy.com/v2/{api_key}")
    }
}
