pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "munchbot",
    about = "Munchbot operator CLI",
    long_about = "Inspect munchbot configuration, check credential readiness, and answer webhook verification challenges.",
    after_help = "Examples:\n  munchbot doctor --json\n  munchbot config\n  munchbot sign 3f9a1c"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config and credential readiness checks")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Compute the signed verification response for a webhook challenge")]
    Sign {
        #[arg(help = "Challenge string sent by the workspace platform")]
        challenge: String,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Config => commands::config::run(),
        Command::Doctor { json } => commands::doctor::run(json),
        Command::Sign { challenge } => commands::sign::run(&challenge),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
