//! HTTP API service
use crate::api::{self, ApiState, RateLimiter};
use crate::app::{Result, Service, ServiceContext, ServiceError, ServiceHandle};
use async_trait::async_trait;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Serves the JSON API and sweeps rate limit windows
#[derive(Default)]
pub struct ApiService {
    bind_address: Option<String>,
    port: Option<u16>,
}

impl ApiService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the listener from configuration
    pub fn configure(mut self, bind_address: String, port: u16) -> Self {
        self.bind_address = Some(bind_address);
        self.port = Some(port);
        self
    }
}

#[async_trait]
impl Service for ApiService {
    fn name(&self) -> &str {
        "api"
    }

    async fn start<'a>(&'a self, context: ServiceContext<'a>) -> Result<ServiceHandle> {
        let server = &context.config.server;
        let bind_address = self.bind_address.clone().unwrap_or_else(|| server.bind_address.clone());
        let port = self.port.unwrap_or(server.port);
        let socket_addr = format!("{}:{}", bind_address, port)
            .parse::<SocketAddr>()
            .map_err(|e| ServiceError::Initialization(format!("Invalid socket address: {}", e)))?;

        let limiter = Arc::new(RateLimiter::new(context.config.rate_limit.clone()));
        let state = ApiState::new(context.state.services.clone(), limiter.clone());
        let app = api::router(state);

        let listener = tokio::net::TcpListener::bind(socket_addr)
            .await
            .map_err(|e| ServiceError::Start(format!("Failed to bind {}: {}", socket_addr, e)))?;
        info!("Starting API service on {}", socket_addr);

        let cancellation_token = CancellationToken::new();

        // Forget finished windows so the map does not grow with every client seen
        let sweep_token = cancellation_token.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(limiter.window());
            loop {
                tokio::select! {
                    _ = sweep_token.cancelled() => break,
                    _ = ticker.tick() => {
                        let removed = limiter.sweep();
                        if removed > 0 {
                            debug!(removed, "Swept rate limit windows");
                        }
                    }
                }
            }
        });

        let ct = cancellation_token.clone();
        let join_handle = tokio::spawn(async move {
            let served = axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
                .with_graceful_shutdown(async move { ct.cancelled().await })
                .await;
            match served {
                Ok(()) => info!("API service shut down"),
                Err(e) => error!("API service error: {}", e),
            }
        });

        // Create stop channel to allow service to be cleanly shutdown
        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel();
        tokio::spawn(async move {
            let _ = stop_rx.await;
            cancellation_token.cancel();
        });

        Ok(ServiceHandle::new(stop_tx, join_handle))
    }
}
