pub mod admin;
pub mod credits;

use clap::Command;
use color_eyre::eyre::{self, Result};
use cowork::config::Config;
use cowork::database::Database;
use tracing::info;

/// Register all application commands
pub fn register_commands(app: Command) -> Command {
    app.subcommand(Command::new("start").about("Apply migrations and start the service"))
        .subcommand(Command::new("migrate").about("Apply pending database migrations"))
        .subcommand(admin::register_commands(Command::new("admin")))
        .subcommand(credits::register_commands(Command::new("credits")))
}

/// Handle all application commands
pub async fn handle_commands(matches: clap::ArgMatches, config: &Config) -> Result<()> {
    config.validate().map_err(|e| eyre::eyre!("Invalid configuration: {}", e))?;

    match matches.subcommand() {
        Some(("start", _)) => {
            migrate(config).await?;
            crate::service::run_service(config).await
        },
        Some(("migrate", _)) => migrate(config).await,
        Some(("admin", admin_matches)) => admin::handle_command(admin_matches, config).await,
        Some(("credits", credits_matches)) => credits::handle_command(credits_matches, config).await,
        _ => {
            println!("Please specify a subcommand. Use --help for more information.");
            Ok(())
        },
    }
}

async fn migrate(config: &Config) -> Result<()> {
    let database = Database::new(&config.database)
        .await
        .map_err(|e| eyre::eyre!("Failed to connect to database: {}", e))?;
    database.migrate().await.map_err(|e| eyre::eyre!("Migration failed: {}", e))?;
    info!("Database migrations applied");
    Ok(())
}

/// Build the service graph for one-off commands
pub(crate) async fn services(config: &Config) -> Result<cowork::services::Services> {
    let state = cowork::app::StateProvider::new(config)
        .provide()
        .await
        .map_err(|e| eyre::eyre!("Failed to initialize: {}", e))?;
    Ok(state.services.clone())
}
