//! Application module for composition and dependency management

mod service;
mod state;

pub use service::{Service, ServiceContext, ServiceError, ServiceHandle};
pub use state::{AppState, StateProvider};

use crate::{config::Config, health::HealthServer};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Redis error: {0}")]
    Redis(String),

    #[error("Integration error: {0}")]
    Integration(String),

    #[error("Service error: {0}")]
    Service(#[from] ServiceError),
}

/// Application result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Core application struct
pub struct App {
    state: Arc<AppState>,
    services: Vec<Box<dyn Service>>,
    health_server: Option<HealthServer>,
    config: Config,
}

impl App {
    /// Create a new application instance with the given configuration
    pub async fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let state = StateProvider::new(&config).provide().await?;
        Ok(Self { state, services: Vec::new(), health_server: None, config })
    }

    /// Register a service with the application
    pub fn register_service<S: Service + 'static>(&mut self, service: S) -> &mut Self {
        self.services.push(Box::new(service));
        self
    }

    /// Configure a health server on the given port
    pub fn with_health_server(&mut self, port: u16) -> &mut Self {
        self.health_server = Some(HealthServer::new(port));
        self
    }

    /// Get a reference to the application configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Start the application and run until shutdown is requested
    pub async fn run_until_shutdown(self) -> Result<()> {
        let health_server_handle = if let Some(mut health_server) = self.health_server {
            let redis = self.state.redis.clone();
            let database = self.state.database.clone();

            let health_server_clone = health_server.clone();
            let handle = tokio::spawn(async move {
                if let Err(e) = health_server.run(database, redis).await {
                    error!("Health server error: {}", e);
                }
            });

            Some((health_server_clone, handle))
        } else {
            None
        };

        let mut service_handles = Vec::new();
        for service in self.services {
            info!("Starting {} service", service.name());
            let context = ServiceContext::with_config(Arc::clone(&self.state), &self.config);
            let handle = service.start(context).await?;
            service_handles.push(handle);
        }

        wait_for_shutdown().await;

        info!("Shutdown initiated, first updating health probes...");

        if let Some((mut health_server, handle)) = health_server_handle {
            // Fail readiness first so the load balancer drains traffic
            health_server.stopping.store(true, std::sync::atomic::Ordering::SeqCst);
            tokio::time::sleep(std::time::Duration::from_secs(3)).await;

            info!("Stopping application services...");
            for service_handle in service_handles {
                service_handle.stop().await;
            }

            info!("Shutting down health server...");
            health_server.shutdown().await;
            let _ = handle.await;
        } else {
            info!("Stopping application services...");
            for handle in service_handles {
                handle.stop().await;
            }
        }

        info!("Shutdown complete");
        Ok(())
    }
}

/// Wait for a shutdown signal (SIGTERM, SIGINT, or SIGHUP)
async fn wait_for_shutdown() {
    use std::time::Duration;
    use tokio::signal::unix::{SignalKind, signal};

    let signals = (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
        signal(SignalKind::hangup()),
    );
    match signals {
        (Ok(mut sigterm), Ok(mut sigint), Ok(mut sighup)) => {
            tokio::select! {
                _ = sigterm.recv() => info!("SIGTERM received, initiating graceful shutdown"),
                _ = sigint.recv() => info!("SIGINT received, initiating graceful shutdown"),
                _ = sighup.recv() => info!("SIGHUP received, initiating graceful shutdown"),
            }
        },
        _ => {
            error!("Failed to install signal handlers, falling back to Ctrl-C");
            let _ = tokio::signal::ctrl_c().await;
        },
    }

    // Hard stop if graceful shutdown stalls
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(30)).await;
        info!("Shutdown timeout reached (30s), forcing exit");
        std::process::exit(0);
    });
}
