//! Background sweep over booking holds and finished bookings
use crate::app::{Result, Service, ServiceContext, ServiceHandle};
use crate::metrics::MetricsTimer;
use crate::services::BookingService;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{error, info};

/// Expires unpaid holds and completes bookings that have ended
#[derive(Default)]
pub struct BookingLifecycleService {
    interval: Option<Duration>,
}

impl BookingLifecycleService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the sweep interval from configuration
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }
}

/// One pass; errors are logged so the next tick retries
pub(crate) async fn sweep(bookings: &BookingService) {
    let _timer = MetricsTimer::new("lifecycle.sweep_ms");
    if let Err(e) = bookings.expire_stale().await {
        error!("Failed to expire unpaid bookings: {}", e);
    }
    if let Err(e) = bookings.complete_finished().await {
        error!("Failed to complete finished bookings: {}", e);
    }
}

#[async_trait]
impl Service for BookingLifecycleService {
    fn name(&self) -> &str {
        "booking-lifecycle"
    }

    async fn start<'a>(&'a self, context: ServiceContext<'a>) -> Result<ServiceHandle> {
        let interval = self
            .interval
            .unwrap_or_else(|| Duration::from_secs(context.config.booking.sweep_interval_secs.max(1)));
        let bookings: Arc<BookingService> = context.state.services.bookings.clone();
        let (stop_tx, mut stop_rx) = oneshot::channel();

        info!("Starting booking lifecycle sweep every {:?}", interval);
        let join_handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = &mut stop_rx => {
                        info!("Booking lifecycle sweep stopping");
                        break;
                    }
                    _ = ticker.tick() => sweep(&bookings).await,
                }
            }
        });

        Ok(ServiceHandle::new(stop_tx, join_handle))
    }
}
