mod config;
mod error;
mod provider;
mod signature;

pub use config::EthConfig;
pub use error::{EthError, NetworkKind};
pub use provider::{NftVerifier, RpcNftVerifier, decode_balance};
pub use signature::{parse_address, verification_message, verify_wallet_signature};

#[cfg(test)]
pub use provider::MockNftVerifier;

/// Re-export essential types from alloy-primitives for convenience
pub mod types {
    pub use super::NetworkKind;
    pub use alloy_primitives::{Address, U256};
}
