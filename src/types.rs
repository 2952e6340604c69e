//! Core domain types shared across the sync and reporting pipeline.

use chrono::NaiveDateTime;

use crate::datefmt;

/// One harvested email. Immutable once built; ordering key is `timestamp`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailRecord {
    /// Message date, converted to the local timezone.
    pub timestamp: NaiveDateTime,
    /// Raw `From` header (may embed a display name).
    pub sender: String,
    /// Raw `To` header (may embed a display name).
    pub recipient: String,
    /// Truncated plain-text body, when the message has one.
    pub body: Option<String>,
}

impl EmailRecord {
    /// Sheet row form: `[date, sender, recipient, body]`.
    pub fn to_row(&self) -> Vec<String> {
        vec![
            datefmt::format_sheet(self.timestamp),
            self.sender.clone(),
            self.recipient.clone(),
            self.body.clone().unwrap_or_default(),
        ]
    }
}

/// Directional message counts between the teacher and one student.
///
/// Rebuilt from scratch on every analysis pass so it always reflects the
/// full persisted log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReciprocityEntry {
    /// Messages the teacher sent to this student.
    pub outbound: u32,
    /// Messages this student sent to the teacher.
    pub inbound: u32,
    /// Both directions have at least one message.
    pub reciprocal: bool,
}
