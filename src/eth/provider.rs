//! JSON-RPC backed ERC-721 balance lookups.

use crate::eth::{
    config::EthConfig,
    error::{EthError, NetworkKind, Result},
};
use alloy_primitives::{Address, U256};
use alloy_provider::{Provider, ProviderBuilder};
use alloy_rpc_types_eth::TransactionRequest;
use alloy_sol_types::{SolCall, sol};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;
use url::Url;

sol! {
    function balanceOf(address owner) external view returns (uint256);
}

/// Reads token balances for wallet verification
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NftVerifier: Send + Sync {
    /// Number of tokens from `contract` held by `owner`
    async fn balance_of(&self, contract: Address, owner: Address) -> Result<U256>;
}

#[derive(Clone)]
pub struct RpcNftVerifier {
    provider: Arc<dyn Provider + Send + Sync>,

    /// Network named in the balance lookup logs
    network: NetworkKind,
}

impl RpcNftVerifier {
    /// Create a verifier talking to the given RPC endpoint.
    pub fn new(network: NetworkKind, url: &str) -> Result<Self> {
        let url =
            Url::parse(url).map_err(|e| EthError::ProviderError(format!("Invalid URL: {}", e)))?;

        // on_http() returns a provider directly, not a Result
        let provider = ProviderBuilder::new().on_http(url);

        Ok(Self { provider: Arc::new(provider), network })
    }

    /// Create a verifier from configuration; an explicit RPC URL wins over Alchemy.
    pub fn from_config(config: &EthConfig) -> Result<Self> {
        let network = NetworkKind::from_name(&config.default_network)?;

        let url = match (&config.rpc_url, &config.alchemy_api_key) {
            (Some(url), _) => url.clone(),
            (None, Some(key)) => network.alchemy_url(key),
            (None, None) => {
                return Err(EthError::ConfigError(
                    "either eth.rpc_url or eth.alchemy_api_key is required".to_string(),
                ));
            },
        };

        Self::new(network, &url)
    }
}

#[async_trait]
impl NftVerifier for RpcNftVerifier {
    async fn balance_of(&self, contract: Address, owner: Address) -> Result<U256> {
        debug!(network = self.network.name(), %contract, %owner, "Reading NFT balance");
        let data = balanceOfCall { owner }.abi_encode();
        let tx = TransactionRequest::default().to(contract).input(data.into());

        let result = self
            .provider
            .call(tx)
            .await
            .map_err(|e| EthError::ProviderError(e.to_string()))?;

        decode_balance(&result)
    }
}

/// Decode a single `uint256` return word
pub fn decode_balance(result: &[u8]) -> Result<U256> {
    if result.len() < 32 {
        return Err(EthError::ProviderError(format!(
            "balanceOf returned {} bytes, expected 32",
            result.len()
        )));
    }
    Ok(U256::from_be_slice(&result[..32]))
}
