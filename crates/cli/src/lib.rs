pub mod commands;
pub mod logging;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

use commands::customers::CustomersCommand;
use commands::reservations::ReservationsCommand;
use lunchly_core::config::{AppConfig, ConfigError, LoadOptions, LoggingConfig};

#[derive(Debug, Parser)]
#[command(
    name = "lunchly",
    about = "Lunchly restaurant operator CLI",
    long_about = "Manage Lunchly customers and reservations, apply migrations, load demo data and inspect configuration.",
    after_help = "Examples:\n  lunchly migrate\n  lunchly seed\n  lunchly customers search john smith\n  lunchly customers top\n  lunchly doctor --json"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the demo customers and reservations, then verify them")]
    Seed,
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Validate config and database connectivity")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(subcommand, about = "List, search, rank and edit customers")]
    Customers(CustomersCommand),
    #[command(subcommand, about = "Book and list reservations")]
    Reservations(ReservationsCommand),
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let loaded = AppConfig::load(LoadOptions::default());
    if let Err(error) = logging::init(&logging_config(&loaded)) {
        eprintln!("{error}");
    }
    if let Err(error) = &loaded {
        tracing::warn!(
            event_name = "cli.config.load_failed",
            error = %error,
            "configuration did not load; logging with defaults"
        );
    }

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Config => commands::config::run(),
        Command::Doctor { json } => commands::doctor::run(json),
        Command::Customers(command) => commands::customers::run(command),
        Command::Reservations(command) => commands::reservations::run(command),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

/// Logging settings from the loaded config, or the defaults when the config
/// failed to load so the failure itself still gets logged.
fn logging_config(loaded: &Result<AppConfig, ConfigError>) -> LoggingConfig {
    match loaded {
        Ok(config) => config.logging.clone(),
        Err(_) => AppConfig::default().logging,
    }
}
