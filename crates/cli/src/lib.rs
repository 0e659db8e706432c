pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use studioflow_core::config::{AppConfig, LoadOptions, LogFormat};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "studioflow",
    about = "Studioflow approval and stage-gate operator CLI",
    long_about = "Inspect configuration, run migrations, and query approval rules, approval requests, and stage completion gates.",
    after_help = "Examples:\n  studioflow doctor --json\n  studioflow rules list --project proj-1\n  studioflow gate --project proj-1 --stage design --snapshot design.json"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Validate config, storage connectivity, and migration status")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Apply pending storage migrations and return structured status output")]
    Migrate,
    #[command(about = "Inspect approval rules")]
    Rules {
        #[command(subcommand)]
        action: RulesAction,
    },
    #[command(about = "Inspect approval requests")]
    Approvals {
        #[command(subcommand)]
        action: ApprovalsAction,
    },
    #[command(about = "Check whether a project stage may be marked complete")]
    Gate {
        #[arg(long)]
        project: String,
        #[arg(long, help = "Stage key or display name, e.g. `technical_design`")]
        stage: String,
        #[arg(long, help = "JSON file with the stage's tasks, files, and documents")]
        snapshot: PathBuf,
    },
}

#[derive(Debug, Subcommand)]
enum RulesAction {
    #[command(about = "List global rules and project rules")]
    List {
        #[arg(long, help = "Only show project rules for this project")]
        project: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
enum ApprovalsAction {
    #[command(about = "List a project's approval requests")]
    List {
        #[arg(long)]
        project: String,
        #[arg(long, help = "Only show open requests assigned to this user id")]
        assignee: Option<String>,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    init_logging();

    let result = match cli.command {
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
        Command::Migrate => commands::migrate::run(),
        Command::Rules { action: RulesAction::List { project } } => {
            commands::rules::list(project.as_deref())
        }
        Command::Approvals { action: ApprovalsAction::List { project, assignee } } => {
            commands::approvals::list(&project, assignee.as_deref())
        }
        Command::Gate { project, stage, snapshot } => {
            commands::gate::run(&project, &stage, &snapshot)
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

/// Logs go to stderr so command payloads on stdout stay parseable. A config
/// that fails to load falls back to defaults; the command reports the error.
fn init_logging() {
    let config = AppConfig::load(LoadOptions::default()).unwrap_or_default();
    let filter = EnvFilter::try_new(&config.logging.level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let _ = match config.logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}
