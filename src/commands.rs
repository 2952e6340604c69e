//! Operator command handlers behind the CLI.

use std::collections::BTreeMap;

use crate::config::Config;
use crate::error::SyncError;
use crate::google_api::{self, auth, sheets, GoogleApiError};
use crate::report;
use crate::sync;
use crate::types::ReciprocityEntry;

/// Run the browser consent flow and report the connected account.
pub async fn connect() -> Result<(), GoogleApiError> {
    let email = auth::run_consent_flow().await?;
    println!("Connected Google account: {}", email);
    Ok(())
}

/// Remove the stored token.
pub async fn disconnect() -> Result<(), GoogleApiError> {
    google_api::delete_token()?;
    println!("Disconnected. Stored token removed.");
    Ok(())
}

/// One full cycle: sync new emails into the log, then recompute and print
/// the report from the freshly persisted log.
pub async fn run_sync(cfg: &Config) -> Result<(), SyncError> {
    let access_token = google_api::access_token().await?;

    let outcome = sync::run_cycle(&access_token, cfg).await?;
    if outcome.appended > 0 {
        println!(
            "Fetched and saved {} emails (since {}).",
            outcome.appended, outcome.watermark
        );
    } else {
        println!("No new emails since {}.", outcome.watermark);
    }

    let entries = load_report(&access_token, cfg).await?;
    println!();
    print!("{}", report::render_table(&entries));
    Ok(())
}

/// Print the two-way communication report without syncing.
pub async fn run_report(cfg: &Config, json: bool) -> Result<(), SyncError> {
    let access_token = google_api::access_token().await?;
    let entries = load_report(&access_token, cfg).await?;

    if json {
        let rendered =
            serde_json::to_string_pretty(&entries).map_err(GoogleApiError::Json)?;
        println!("{}", rendered);
    } else {
        print!("{}", report::render_table(&entries));
    }
    Ok(())
}

/// Re-read the full log and rebuild the report from scratch.
async fn load_report(
    access_token: &str,
    cfg: &Config,
) -> Result<BTreeMap<String, ReciprocityEntry>, SyncError> {
    let rows = sheets::read_rows(access_token, &cfg.spreadsheet_id, &cfg.log_sheet, "A:D").await?;
    let data_rows = rows.get(1..).unwrap_or_default();
    Ok(report::analyze(data_rows, &cfg.teacher_email))
}
