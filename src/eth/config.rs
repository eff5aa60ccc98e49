use serde::{Deserialize, Serialize};

/// Configuration for NFT holder verification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EthConfig {
    /// Whether wallet verification is available at all
    #[serde(default)]
    pub enabled: bool,

    /// Alchemy API key, used when no explicit RPC URL is given
    pub alchemy_api_key: Option<String>,

    /// Explicit JSON-RPC endpoint, takes precedence over Alchemy
    pub rpc_url: Option<String>,

    /// Network the membership collection lives on
    #[serde(default = "default_network")]
    pub default_network: String,

    /// ERC-721 contract whose holders get member pricing
    pub nft_contract: Option<String>,

    /// Holders verified longer ago than this are re-checked
    #[serde(default = "default_reverify_after_secs")]
    pub reverify_after_secs: u64,

    /// How often the refresh service wakes up
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,

    /// Users re-checked per refresh pass
    #[serde(default = "default_refresh_batch_size")]
    pub refresh_batch_size: i64,
}

/// Default network
fn default_network() -> String {
    "mainnet".to_string()
}

fn default_reverify_after_secs() -> u64 {
    24 * 60 * 60
}

fn default_refresh_interval_secs() -> u64 {
    15 * 60
}

fn default_refresh_batch_size() -> i64 {
    100
}

impl Default for EthConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            alchemy_api_key: None,
            rpc_url: None,
            default_network: default_network(),
            nft_contract: None,
            reverify_after_secs: default_reverify_after_secs(),
            refresh_interval_secs: default_refresh_interval_secs(),
            refresh_batch_size: default_refresh_batch_size(),
        }
    }
}
