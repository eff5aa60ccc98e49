//! Wallet linking and NFT holder status
use crate::core::repository::{AuditLogRepository, UserRepository};
use crate::core::types::{User, UserId};
use crate::core::{DomainError, DomainResult};
use crate::eth::types::{Address, U256};
use crate::eth::{EthConfig, NftVerifier, parse_address, verification_message, verify_wallet_signature};
use crate::metrics::MetricsTimer;
use crate::services::{Actor, audit};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Signed proof that the caller controls `address`
#[derive(Debug, Clone, Deserialize)]
pub struct WalletProof {
    pub address: String,
    pub signature: String,
}

/// Message the client has to sign
#[derive(Debug, Clone, Serialize)]
pub struct WalletChallenge {
    pub message: String,
}

pub struct NftService {
    users: Arc<dyn UserRepository>,
    audit: Arc<dyn AuditLogRepository>,
    verifier: Option<Arc<dyn NftVerifier>>,
    config: EthConfig,
}

impl NftService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        audit: Arc<dyn AuditLogRepository>,
        verifier: Option<Arc<dyn NftVerifier>>,
        config: EthConfig,
    ) -> Self {
        Self { users, audit, verifier, config }
    }

    fn verifier(&self) -> DomainResult<(&dyn NftVerifier, Address)> {
        let verifier = self
            .verifier
            .as_deref()
            .ok_or_else(|| DomainError::Upstream("wallet verification is not enabled".into()))?;
        let contract = self
            .config
            .nft_contract
            .as_deref()
            .ok_or_else(|| DomainError::Upstream("no membership contract configured".into()))?;
        Ok((verifier, parse_address(contract)?))
    }

    pub fn challenge(&self, user: &User) -> WalletChallenge {
        WalletChallenge { message: verification_message(user.id) }
    }

    /// Check the signature, then the on-chain balance, and store the outcome
    pub async fn verify(&self, user: &User, proof: WalletProof, actor: &Actor) -> DomainResult<User> {
        let address = parse_address(&proof.address)?;
        verify_wallet_signature(address, &verification_message(user.id), &proof.signature)?;

        let updated = self.record_holding(user.id, address).await?;
        audit(
            self.audit.as_ref(),
            actor,
            "nft.verify",
            "user",
            Some(user.id.to_string()),
            serde_json::json!({ "wallet": updated.wallet_address, "is_nft_holder": updated.is_nft_holder }),
        )
        .await;
        Ok(updated)
    }

    /// Query the balance for a proven wallet and persist holder status
    pub(crate) async fn record_holding(&self, user_id: UserId, address: Address) -> DomainResult<User> {
        let (verifier, contract) = self.verifier()?;
        let balance = verifier.balance_of(contract, address).await?;
        let holder = balance > U256::ZERO;

        let user = self
            .users
            .update_wallet(user_id, Some(address.to_checksum(None)), holder, Utc::now())
            .await?;
        info!(user_id = %user_id, wallet = %address, holder, "Wallet verified");
        crate::metrics::incr(if holder { "nft.verified_holder" } else { "nft.verified_non_holder" });
        Ok(user)
    }

    /// Re-check wallets whose status is older than the configured age.
    ///
    /// RPC failures keep the previous status; the user is retried next pass.
    pub async fn refresh_stale(&self) -> DomainResult<usize> {
        if self.verifier.is_none() {
            return Ok(0);
        }
        let _timer = MetricsTimer::new("nft.refresh_ms");
        let before = Utc::now() - Duration::seconds(self.config.reverify_after_secs as i64);
        let stale = self.users.stale_wallets(before, self.config.refresh_batch_size).await?;

        let mut refreshed = 0;
        for user in stale {
            let Some(wallet) = user.wallet_address.as_deref() else { continue };
            let address = match parse_address(wallet) {
                Ok(address) => address,
                Err(e) => {
                    warn!(user_id = %user.id, "Stored wallet is unusable: {}", e);
                    continue;
                },
            };
            match self.record_holding(user.id, address).await {
                Ok(updated) if updated.is_nft_holder != user.is_nft_holder => {
                    info!(user_id = %user.id, holder = updated.is_nft_holder, "Holder status changed");
                    refreshed += 1;
                },
                Ok(_) => refreshed += 1,
                Err(e) => warn!(user_id = %user.id, "Holder re-check failed: {}", e),
            }
        }
        debug!(refreshed, "Holder refresh pass finished");
        Ok(refreshed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::memory::MemoryStore;
    use crate::eth::{EthError, MockNftVerifier};
    use crate::services::testing::member;

    const CONTRACT: &str = "0x5af0d9827e0c53e4799bb226655a1de152a425a5";
    const WALLET: &str = "0x742d35cc6634c0532925a3b844bc454e4438f44e";

    fn config() -> EthConfig {
        EthConfig { enabled: true, nft_contract: Some(CONTRACT.into()), ..Default::default() }
    }

    fn service(store: &Arc<MemoryStore>, verifier: MockNftVerifier) -> NftService {
        let repos = store.repositories();
        NftService::new(repos.users, repos.audit, Some(Arc::new(verifier)), config())
    }

    #[tokio::test]
    async fn test_positive_balance_marks_holder() {
        let store = Arc::new(MemoryStore::default());
        let user = member(&store, "holder@example.com").await;
        let mut verifier = MockNftVerifier::new();
        verifier.expect_balance_of().times(1).returning(|_, _| Ok(U256::from(2u64)));

        let updated = service(&store, verifier)
            .record_holding(user.id, parse_address(WALLET).unwrap())
            .await
            .unwrap();
        assert!(updated.is_nft_holder);
        assert!(updated.nft_verified_at.is_some());
        // Stored checksummed
        assert_eq!(updated.wallet_address.as_deref(), Some("0x742d35Cc6634C0532925a3b844Bc454e4438f44e"));
    }

    #[tokio::test]
    async fn test_signed_proof_links_wallet() {
        const USER_ID: &str = "7d1f0c2e-5b8a-4e63-9f0a-2c4d6e8b1a35";
        const SIGNER: &str = "0x2c7536E3605D9C16a7a3D7b1898e529396a65c23";
        const SIGNATURE: &str = "0xbb50e2d89a4ed70663d080659fe0ad4b9bc3e06c17a227433966cb59ceee020d024db081b7ffdd42201dbbc3090fbb764a60c0d5f421d87dd8cde82522adc4861b";

        let store = Arc::new(MemoryStore::default());
        member(&store, "signer@example.com").await;
        let user_id: UserId = USER_ID.parse().unwrap();
        store.users.lock()[0].id = user_id;
        let user = store.users.lock()[0].clone();

        let signer = parse_address(SIGNER).unwrap();
        let mut verifier = MockNftVerifier::new();
        verifier
            .expect_balance_of()
            .withf(move |_, owner| *owner == signer)
            .times(1)
            .returning(|_, _| Ok(U256::from(1u64)));
        let nft = service(&store, verifier);

        // Someone else's wallet with the same signature is refused
        let stolen = WalletProof { address: WALLET.into(), signature: SIGNATURE.into() };
        let err = nft.verify(&user, stolen, &Actor::default()).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        let proof = WalletProof { address: SIGNER.to_lowercase(), signature: SIGNATURE.into() };
        let updated = nft.verify(&user, proof, &Actor::default()).await.unwrap();
        assert!(updated.is_nft_holder);
        assert_eq!(updated.wallet_address.as_deref(), Some(SIGNER));
        assert_eq!(store.audit.lock().len(), 1);
        assert_eq!(store.audit.lock()[0].action, "nft.verify");
    }

    #[tokio::test]
    async fn test_bad_signature_rejected_before_rpc() {
        let store = Arc::new(MemoryStore::default());
        let user = member(&store, "forger@example.com").await;
        let mut verifier = MockNftVerifier::new();
        verifier.expect_balance_of().never();

        let proof = WalletProof { address: WALLET.into(), signature: format!("0x{}", "ab".repeat(65)) };
        let err = service(&store, verifier)
            .verify(&user, proof, &Actor::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert!(store.audit.lock().is_empty());
    }

    #[tokio::test]
    async fn test_disabled_verification_is_upstream_error() {
        let store = Arc::new(MemoryStore::default());
        let user = member(&store, "nobody@example.com").await;
        let repos = store.repositories();
        let nft = NftService::new(repos.users, repos.audit, None, EthConfig::default());
        let err = nft.record_holding(user.id, parse_address(WALLET).unwrap()).await.unwrap_err();
        assert!(matches!(err, DomainError::Upstream(_)));
        assert_eq!(nft.refresh_stale().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_refresh_keeps_status_when_rpc_fails() {
        let store = Arc::new(MemoryStore::default());
        let user = member(&store, "stale@example.com").await;
        let wallet = parse_address(WALLET).unwrap();
        let stale_at = Utc::now() - Duration::days(3);
        UserRepository::update_wallet(store.as_ref(), user.id, Some(wallet.to_checksum(None)), true, stale_at)
            .await
            .unwrap();

        let mut verifier = MockNftVerifier::new();
        verifier
            .expect_balance_of()
            .returning(|_, _| Err(EthError::ProviderError("timeout".into())));
        assert_eq!(service(&store, verifier).refresh_stale().await.unwrap(), 0);
        assert!(store.users.lock()[0].is_nft_holder);

        let mut verifier = MockNftVerifier::new();
        verifier.expect_balance_of().returning(|_, _| Ok(U256::ZERO));
        assert_eq!(service(&store, verifier).refresh_stale().await.unwrap(), 1);
        assert!(!store.users.lock()[0].is_nft_holder);
    }
}
