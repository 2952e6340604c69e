//! CLI entry point for ChatterTracker.

use clap::{Parser, Subcommand};

use chattertracker::commands;
use chattertracker::config;
use chattertracker::error::SyncError;

#[derive(Parser)]
#[command(
    name = "chattertracker",
    version,
    about = "Incremental Gmail-to-Sheets sync with a two-way communication report"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Google Sheet ID (overrides the config file)
    #[arg(long, global = true, value_name = "ID")]
    spreadsheet_id: Option<String>,

    /// Sheet holding the email log
    #[arg(long, global = true, value_name = "NAME")]
    log_sheet: Option<String>,

    /// Sheet holding the student roster
    #[arg(long, global = true, value_name = "NAME")]
    roster_sheet: Option<String>,

    /// Teacher email address
    #[arg(long, global = true, value_name = "EMAIL")]
    teacher_email: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect a Google account (browser consent flow)
    Auth,
    /// Fetch new emails into the log sheet, then print the updated report
    Sync,
    /// Print the two-way communication report without syncing
    Report {
        /// Emit the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove the stored Google token
    Disconnect,
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    if let Err(message) = run(cli).await {
        eprintln!("{}", message);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), String> {
    let overrides = config::Overrides {
        spreadsheet_id: cli.spreadsheet_id.clone(),
        log_sheet: cli.log_sheet.clone(),
        roster_sheet: cli.roster_sheet.clone(),
        teacher_email: cli.teacher_email.clone(),
    };

    match cli.command {
        Commands::Auth => commands::connect().await.map_err(|e| e.to_string()),
        Commands::Disconnect => commands::disconnect().await.map_err(|e| e.to_string()),
        Commands::Sync => {
            let cfg = resolve_config(overrides)?;
            commands::run_sync(&cfg).await.map_err(describe_sync_error)
        }
        Commands::Report { json } => {
            let cfg = resolve_config(overrides)?;
            commands::run_report(&cfg, json)
                .await
                .map_err(describe_sync_error)
        }
    }
}

fn resolve_config(overrides: config::Overrides) -> Result<config::Config, String> {
    let file = config::load_file_config()?;
    config::resolve(file, overrides)
}

fn describe_sync_error(err: SyncError) -> String {
    if err.needs_reauth() {
        format!(
            "{}\nRun `chattertracker auth` to connect your Google account.",
            err
        )
    } else {
        err.to_string()
    }
}
