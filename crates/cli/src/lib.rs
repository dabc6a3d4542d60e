pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "ganvie",
    about = "Ganvie survey operator CLI",
    long_about = "Operate the survey database: migrations, demo fixtures, survey target, config inspection, and readiness checks.",
    after_help = "Examples:\n  ganvie doctor --json\n  ganvie target --set 1500\n  ganvie seed"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the deterministic demo dataset covering all six lakeside zones")]
    Seed,
    #[command(about = "Show the survey target, or replace it with --set")]
    Target {
        #[arg(long, value_name = "HOUSEHOLDS", help = "Replace the household survey target")]
        set: Option<i64>,
    },
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Validate config, DB connectivity, and schema readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Target { set } => commands::target::run(set),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
