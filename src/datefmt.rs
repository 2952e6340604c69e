//! Date parsing and formatting for the sync pipeline.
//!
//! Two textual representations flow through the system: Gmail's RFC-2822
//! `Date` header on the way in, and the sheet cell format
//! `MM/DD/YYYY HH:MM:SS` everywhere else. Gmail's `after:` search filter
//! takes local epoch seconds.

use chrono::{DateTime, Local, LocalResult, NaiveDateTime, TimeZone};

/// Cell format used in the email log sheet, e.g. `01/31/2024 09:15:00`.
pub const SHEET_DATE_FORMAT: &str = "%m/%d/%Y %H:%M:%S";

/// Parse a Gmail `Date` header into a local-timezone naive datetime.
///
/// Returns `None` (and warns) on malformed input so one bad header never
/// aborts a batch.
pub fn parse_rfc2822(raw: &str) -> Option<NaiveDateTime> {
    match DateTime::parse_from_rfc2822(raw.trim()) {
        Ok(dt) => Some(dt.with_timezone(&Local).naive_local()),
        Err(e) => {
            log::warn!("Unparseable Date header {:?}: {}", raw, e);
            None
        }
    }
}

/// Render a datetime in the sheet cell format.
pub fn format_sheet(dt: NaiveDateTime) -> String {
    dt.format(SHEET_DATE_FORMAT).to_string()
}

/// Parse a sheet cell back into a datetime. `None` on malformed cells.
pub fn parse_sheet(text: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text.trim(), SHEET_DATE_FORMAT).ok()
}

/// Local epoch seconds for a naive local datetime.
///
/// DST fold picks the earliest mapping; a nonexistent local time (spring-
/// forward gap) returns `None`.
pub fn epoch_seconds(dt: NaiveDateTime) -> Option<i64> {
    match Local.from_local_datetime(&dt) {
        LocalResult::Single(local) => Some(local.timestamp()),
        LocalResult::Ambiguous(earliest, _) => Some(earliest.timestamp()),
        LocalResult::None => None,
    }
}

/// Convert a sheet-format date to local epoch seconds for Gmail's `after:`
/// filter.
///
/// `None` means the sync window cannot be scoped and the cycle must abort
/// before any fetch.
pub fn to_epoch_seconds(text: &str) -> Option<i64> {
    let dt = parse_sheet(text)?;
    let epoch = epoch_seconds(dt);
    if epoch.is_none() {
        log::warn!("Date {:?} does not exist in the local timezone", text);
    }
    epoch
}
