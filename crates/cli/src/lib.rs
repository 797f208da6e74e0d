pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "pdsdesk",
    about = "PDSdesk routing operator CLI",
    long_about = "Inspect configuration, check readiness, manage the routing schema, and try routing rules against sample tickets.",
    after_help = "Examples:\n  pdsdesk doctor --json\n  pdsdesk rules --all\n  pdsdesk route --mailbox facilities@pdsdesk.example"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the demo operator groups and routing rules")]
    Seed,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, DB connectivity, and default queue readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "List routing rules in evaluation order")]
    Rules {
        #[arg(long, help = "Include inactive rules")]
        all: bool,
    },
    #[command(about = "Resolve the assignment group for a sample ticket")]
    Route {
        #[arg(long)]
        mailbox: Option<String>,
        #[arg(long = "ticket-type")]
        ticket_type: Option<String>,
        #[arg(long)]
        category: Option<String>,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
        Command::Rules { all } => commands::rules::run(all),
        Command::Route { mailbox, ticket_type, category } => {
            commands::route::run(commands::route::RouteArgs { mailbox, ticket_type, category })
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
