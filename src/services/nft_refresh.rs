//! Periodic re-verification of NFT holder status
use crate::app::{Result, Service, ServiceContext, ServiceHandle};
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{error, info};

/// Re-checks wallets whose holder status has gone stale
#[derive(Default)]
pub struct NftRefreshService;

impl NftRefreshService {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Service for NftRefreshService {
    fn name(&self) -> &str {
        "nft-refresh"
    }

    async fn start<'a>(&'a self, context: ServiceContext<'a>) -> Result<ServiceHandle> {
        let interval = Duration::from_secs(context.config.eth.refresh_interval_secs.max(1));
        let nft = context.state.services.nft.clone();
        let (stop_tx, mut stop_rx) = oneshot::channel();

        info!("Starting NFT holder refresh every {:?}", interval);
        let join_handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = &mut stop_rx => {
                        info!("NFT holder refresh stopping");
                        break;
                    }
                    _ = ticker.tick() => {
                        match nft.refresh_stale().await {
                            Ok(0) => {},
                            Ok(n) => info!(refreshed = n, "Refreshed NFT holder status"),
                            Err(e) => error!("NFT holder refresh failed: {}", e),
                        }
                    }
                }
            }
        });

        Ok(ServiceHandle::new(stop_tx, join_handle))
    }
}
