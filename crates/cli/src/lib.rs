pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "asesor",
    about = "Asesor operator CLI",
    long_about = "Chat with the business advisors from a terminal and operate migrations, demo data, config inspection, and runtime readiness.",
    after_help = "Examples:\n  asesor chat --domain financiero\n  asesor doctor --json\n  asesor config"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Hold an advisor conversation in the terminal")]
    Chat {
        #[arg(
            long,
            value_name = "SLUG",
            help = "Advisor to talk to: financiero, marketing or mercado"
        )]
        domain: String,
    },
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the deterministic demo dataset and verify it")]
    Seed,
    #[command(
        about = "Inspect effective configuration values with source attribution per field"
    )]
    Config,
    #[command(about = "Validate config, database connectivity, and model endpoint readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Chat { domain } => commands::chat::run(&domain),
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
    };

    // The chat loop prints as it goes and finishes with an empty output.
    if !result.output.is_empty() {
        println!("{}", result.output);
    }
    ExitCode::from(result.exit_code)
}
