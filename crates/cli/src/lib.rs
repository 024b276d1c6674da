pub mod commands;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;

use rentline_core::config::{AppConfig, LoadOptions, LogFormat, LoggingConfig};

#[derive(Debug, Parser)]
#[command(
    name = "rentline",
    about = "Rentline operator CLI",
    long_about = "Operate the Rentline equipment-rental backend: migrations, demo fleet \
                  seeding, inventory inspection, and scripted call simulation.",
    after_help = "Examples:\n  rentline migrate\n  rentline seed\n  rentline fleet\n  rentline simulate --equipment excavator --offer 2000"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the deterministic demo fleet into the equipment ledger")]
    Seed,
    #[command(about = "List every unit on the ledger with its rental status")]
    Fleet,
    #[command(about = "Drive one scripted rental call through all seven stages")]
    Simulate {
        #[arg(
            long,
            default_value = "excavator",
            help = "Free-text equipment description to match against the fleet"
        )]
        equipment: String,
        #[arg(long, help = "Opening price offer per day; defaults to the unit's listed rate")]
        offer: Option<Decimal>,
    },
    #[command(about = "Inspect effective configuration values with secrets redacted")]
    Config,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    init_logging();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Fleet => commands::fleet::run(),
        Command::Simulate { equipment, offer } => commands::simulate::run(&equipment, offer),
        Command::Config => commands::config::run(),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

/// Command output goes to stdout as JSON; diagnostics go to stderr through
/// the subscriber. A config that fails to load falls back to default logging
/// so the command itself can report the failure.
fn init_logging() {
    let logging = AppConfig::load(LoadOptions::default())
        .map(|config| config.logging)
        .unwrap_or_else(|_| LoggingConfig {
            level: "info".to_string(),
            format: LogFormat::Compact,
        });

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let result = match logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    // A second init in-process (tests) is harmless.
    let _ = result;
}
