//! Pipeline error types.
//!
//! Transport and parse problems degrade at the call site and the cycle
//! continues. Only two conditions abort a sync cycle: an unusable sync
//! window and a failed append. Authentication failures propagate so the
//! operator can re-run the consent flow.

use thiserror::Error;

use crate::google_api::GoogleApiError;

#[derive(Debug, Error)]
pub enum SyncError {
    /// The saved watermark could not be converted to an epoch cutoff; the
    /// cycle aborts before any fetch.
    #[error("cannot determine sync window from saved date {0:?}")]
    Window(String),

    /// The bulk append failed. Fetched records are dropped; the stale
    /// watermark makes the next successful cycle re-fetch them.
    #[error("append to the email log failed: {0}")]
    Append(#[source] GoogleApiError),

    #[error(transparent)]
    Google(#[from] GoogleApiError),
}

impl SyncError {
    /// True when the fix is re-running the consent flow.
    pub fn needs_reauth(&self) -> bool {
        match self {
            SyncError::Window(_) => false,
            SyncError::Append(e) | SyncError::Google(e) => e.needs_reauth(),
        }
    }
}
