use clap::{Arg, ArgMatches, Command, value_parser};
use color_eyre::eyre::{self, Result};
use cowork::config::Config;
use cowork::core::CreditKind;

/// Register credit commands
pub fn register_commands(app: Command) -> Command {
    app.about("Membership credits").subcommand(
        Command::new("grant")
            .about("Grant prepaid hours to a member")
            .arg(Arg::new("email").long("email").required(true).help("Member email"))
            .arg(
                Arg::new("kind")
                    .long("kind")
                    .required(true)
                    .value_parser(|s: &str| s.parse::<CreditKind>())
                    .help("meeting_room_hours or desk_hours"),
            )
            .arg(
                Arg::new("hours")
                    .long("hours")
                    .required(true)
                    .value_parser(value_parser!(i32))
                    .help("Whole hours to grant"),
            )
            .arg(
                Arg::new("days")
                    .long("days")
                    .default_value("30")
                    .value_parser(value_parser!(i64))
                    .help("Days the grant stays valid, starting today"),
            ),
    )
}

/// Handle credit commands
pub async fn handle_command(matches: &ArgMatches, config: &Config) -> Result<()> {
    match matches.subcommand() {
        Some(("grant", grant)) => {
            let email = grant
                .get_one::<String>("email")
                .ok_or_else(|| eyre::eyre!("--email is required"))?;
            let kind = *grant
                .get_one::<CreditKind>("kind")
                .ok_or_else(|| eyre::eyre!("--kind is required"))?;
            let hours = *grant.get_one::<i32>("hours").ok_or_else(|| eyre::eyre!("--hours is required"))?;
            let days = grant.get_one::<i64>("days").copied().unwrap_or(30);

            let services = super::services(config).await?;
            let credit = services
                .credits
                .grant_by_email(email, kind, hours, days)
                .await
                .map_err(|e| eyre::eyre!("Failed to grant credits: {}", e))?;
            println!(
                "Granted {} {} to {} (valid {} to {})",
                credit.total_hours, credit.kind, email, credit.valid_from, credit.valid_until
            );
            Ok(())
        },
        _ => {
            register_commands(Command::new("credits")).print_help()?;
            Ok(())
        },
    }
}
