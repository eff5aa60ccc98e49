use clap::{Arg, ArgMatches, Command};
use color_eyre::eyre::{self, Result};
use cowork::auth::Registration;
use cowork::config::Config;
use tracing::info;

/// Register admin commands
pub fn register_commands(app: Command) -> Command {
    app.about("Administrator accounts").subcommand(
        Command::new("create")
            .about("Create an admin account, or promote an existing one")
            .arg(Arg::new("email").long("email").required(true).help("Account email"))
            .arg(Arg::new("password").long("password").required(true).help("Initial password"))
            .arg(Arg::new("name").long("name").default_value("Administrator").help("Display name")),
    )
}

/// Handle admin commands
pub async fn handle_command(matches: &ArgMatches, config: &Config) -> Result<()> {
    match matches.subcommand() {
        Some(("create", create)) => {
            let arg = |name: &str| create.get_one::<String>(name).cloned().unwrap_or_default();
            let registration =
                Registration { email: arg("email"), password: arg("password"), name: arg("name") };

            let services = super::services(config).await?;
            let user = services
                .auth
                .create_admin(registration)
                .await
                .map_err(|e| eyre::eyre!("Failed to create admin: {}", e))?;
            info!(user_id = %user.id, email = %user.email, "Admin account ready");
            println!("Admin account ready: {} ({})", user.email, user.id);
            Ok(())
        },
        _ => {
            register_commands(Command::new("admin")).print_help()?;
            Ok(())
        },
    }
}
