//! Incremental sync engine.
//!
//! One cycle: resolve the watermark from the log sheet, scope two
//! direction-bound Gmail queries to the roster and the epoch cutoff,
//! fetch, keep only records strictly after the watermark, sort ascending,
//! append. The query-layer `after:` filter is a fetch-volume optimization;
//! the in-process strict-after check is the correctness guarantee.

use chrono::{Duration, Local, NaiveDateTime};

use crate::config::Config;
use crate::datefmt;
use crate::error::SyncError;
use crate::google_api::{gmail, sheets};
use crate::types::EmailRecord;

/// Fall-back window when the log sheet has no saved dates yet.
const DEFAULT_LOOKBACK_DAYS: i64 = 7;

/// What one sync cycle did, for operator feedback.
#[derive(Debug, Clone)]
pub struct SyncOutcome {
    /// Watermark the cycle ran against (sheet date format).
    pub watermark: String,
    /// Records that survived the strict-after filter.
    pub fetched: usize,
    /// Rows appended to the log sheet.
    pub appended: usize,
}

fn default_watermark() -> String {
    datefmt::format_sheet(Local::now().naive_local() - Duration::days(DEFAULT_LOOKBACK_DAYS))
}

/// Determine the newest timestamp already persisted.
///
/// The log sheet is append-ordered, so the last cell of the date column
/// holds the newest saved date. An empty or unreadable column falls back
/// to a 7-day look-back.
pub async fn resolve_watermark(access_token: &str, cfg: &Config) -> String {
    match sheets::read_column(access_token, &cfg.spreadsheet_id, &cfg.log_sheet, "A2:A").await {
        Ok(dates) => match dates.last() {
            Some(last) => last.clone(),
            None => {
                log::info!(
                    "No saved dates in {:?}; defaulting to {} days ago",
                    cfg.log_sheet,
                    DEFAULT_LOOKBACK_DAYS
                );
                default_watermark()
            }
        },
        Err(e) => {
            log::warn!(
                "Could not read the last saved date: {}; defaulting to {} days ago",
                e,
                DEFAULT_LOOKBACK_DAYS
            );
            default_watermark()
        }
    }
}

/// Direction-scoped Gmail queries: sent (teacher to roster) and received
/// (roster to teacher), both bounded below by the epoch cutoff.
pub fn build_queries(roster: &[String], cutoff_epoch: i64) -> (String, String) {
    let group = roster.join(" OR ");
    (
        format!("from:me to:({}) after:{}", group, cutoff_epoch),
        format!("to:me from:({}) after:{}", group, cutoff_epoch),
    )
}

/// Keep records strictly newer than the watermark, oldest first.
///
/// The sort is stable, so records with equal timestamps keep their fetch
/// order.
pub fn filter_and_sort(
    mut records: Vec<EmailRecord>,
    watermark: NaiveDateTime,
) -> Vec<EmailRecord> {
    records.retain(|r| r.timestamp > watermark);
    records.sort_by_key(|r| r.timestamp);
    records
}

/// Run one full sync cycle.
pub async fn run_cycle(access_token: &str, cfg: &Config) -> Result<SyncOutcome, SyncError> {
    let watermark = resolve_watermark(access_token, cfg).await;
    let Some(watermark_dt) = datefmt::parse_sheet(&watermark) else {
        return Err(SyncError::Window(watermark));
    };
    let Some(epoch) = datefmt::epoch_seconds(watermark_dt) else {
        return Err(SyncError::Window(watermark));
    };
    log::info!("Syncing emails newer than {}", watermark);

    let roster = read_roster(access_token, cfg).await?;
    if roster.is_empty() {
        log::warn!(
            "Student roster in {:?} is empty; nothing to sync",
            cfg.roster_sheet
        );
        return Ok(SyncOutcome {
            watermark,
            fetched: 0,
            appended: 0,
        });
    }

    // +1 second: the query layer filters `after:` at whole-second
    // granularity with an inclusive boundary.
    let (sent_query, inbox_query) = build_queries(&roster, epoch + 1);

    let mut ids = search_ids(access_token, &sent_query).await?;
    log::info!("Found {} sent messages", ids.len());
    let inbox_ids = search_ids(access_token, &inbox_query).await?;
    log::info!("Found {} received messages", inbox_ids.len());
    ids.extend(inbox_ids);

    let mut records = Vec::with_capacity(ids.len());
    for id in &ids {
        match gmail::fetch_message(access_token, id, cfg.body_char_limit).await {
            Ok(Some(record)) => records.push(record),
            Ok(None) => {}
            Err(e) if e.needs_reauth() => return Err(e.into()),
            Err(e) => log::warn!("Skipping message {}: {}", id, e),
        }
    }

    let records = filter_and_sort(records, watermark_dt);
    let fetched = records.len();
    let appended = append_records(access_token, cfg, &records).await?;

    Ok(SyncOutcome {
        watermark,
        fetched,
        appended,
    })
}

/// Search degrades to an empty id list on transport or API failure; only
/// an auth failure propagates.
async fn search_ids(access_token: &str, query: &str) -> Result<Vec<String>, SyncError> {
    match gmail::list_message_ids(access_token, query).await {
        Ok(ids) => Ok(ids),
        Err(e) if e.needs_reauth() => Err(e.into()),
        Err(e) => {
            log::warn!("Search failed ({}); treating as no matches", e);
            Ok(Vec::new())
        }
    }
}

/// Student addresses from the roster sheet, blanks dropped.
async fn read_roster(access_token: &str, cfg: &Config) -> Result<Vec<String>, SyncError> {
    match sheets::read_column(access_token, &cfg.spreadsheet_id, &cfg.roster_sheet, "A2:A").await {
        Ok(roster) => Ok(roster
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()),
        Err(e) if e.needs_reauth() => Err(e.into()),
        Err(e) => {
            log::warn!("Could not read the student roster: {}", e);
            Ok(Vec::new())
        }
    }
}

/// Bulk-append records to the log sheet, oldest first.
///
/// One all-or-nothing call; a failure surfaces as [`SyncError::Append`]
/// and the records are re-fetched on the next successful cycle.
pub async fn append_records(
    access_token: &str,
    cfg: &Config,
    records: &[EmailRecord],
) -> Result<usize, SyncError> {
    if records.is_empty() {
        log::info!("No new emails to append");
        return Ok(0);
    }

    let rows: Vec<Vec<String>> = records.iter().map(EmailRecord::to_row).collect();
    let appended = sheets::append_rows(access_token, &cfg.spreadsheet_id, &cfg.log_sheet, &rows)
        .await
        .map_err(SyncError::Append)?;
    log::info!("Appended {} emails to {:?}", appended, cfg.log_sheet);
    Ok(appended)
}
