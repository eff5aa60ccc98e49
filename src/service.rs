use color_eyre::eyre::{self, Result};
use cowork::{
    app::App,
    config::Config,
    services::{ApiService, BookingLifecycleService, NftRefreshService},
};
use std::time::Duration;
use tracing::info;

/// Run the API with its background services until a shutdown signal
pub async fn run_service(config: &Config) -> Result<()> {
    info!("Starting Cowork");

    let mut app = App::new(config.clone())
        .await
        .map_err(|e| eyre::eyre!("Failed to create application: {}", e))?;

    app.with_health_server(config.server.health_port);

    app.register_service(
        ApiService::new().configure(config.server.bind_address.clone(), config.server.port),
    );
    info!("API service registered on {}:{}", config.server.bind_address, config.server.port);

    app.register_service(
        BookingLifecycleService::new()
            .with_interval(Duration::from_secs(config.booking.sweep_interval_secs.max(1))),
    );

    if config.eth.enabled {
        app.register_service(NftRefreshService::new());
        info!("NFT holder refresh registered");
    } else {
        info!("NFT holder refresh disabled in configuration");
    }

    app.run_until_shutdown().await.map_err(|e| eyre::eyre!("Application error: {}", e))?;

    info!("Shutdown complete");
    Ok(())
}
