//! Sheets API v4 — the tabular store backing the email log and the
//! student roster.
//!
//! Three operations: column read (watermark + roster), full-range read
//! (report input) and bulk append (persistence). No schema beyond column
//! position.

use serde::Deserialize;

use super::{send_with_retry, GoogleApiError, RetryPolicy};

const SHEETS_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";

// ============================================================================
// API response types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppendResponse {
    #[serde(default)]
    updates: Option<UpdateSummary>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateSummary {
    #[serde(default)]
    updated_rows: usize,
}

// ============================================================================
// Sheets API
// ============================================================================

/// Read a single column, e.g. `A2:A` of the log sheet for the watermark or
/// of the roster sheet for student addresses. Sheet names may contain
/// spaces; URL parsing percent-encodes them.
pub async fn read_column(
    access_token: &str,
    spreadsheet_id: &str,
    sheet: &str,
    column_range: &str,
) -> Result<Vec<String>, GoogleApiError> {
    let url = format!(
        "{}/{}/values/{}!{}",
        SHEETS_URL, spreadsheet_id, sheet, column_range
    );

    let range = get_values(access_token, &url, &[("majorDimension", "COLUMNS")]).await?;
    Ok(range.values.into_iter().next().unwrap_or_default())
}

/// Read a row-major cell range, e.g. `A:D` for the full email log.
pub async fn read_rows(
    access_token: &str,
    spreadsheet_id: &str,
    sheet: &str,
    cell_range: &str,
) -> Result<Vec<Vec<String>>, GoogleApiError> {
    let url = format!(
        "{}/{}/values/{}!{}",
        SHEETS_URL, spreadsheet_id, sheet, cell_range
    );

    let range = get_values(access_token, &url, &[]).await?;
    Ok(range.values)
}

async fn get_values(
    access_token: &str,
    url: &str,
    params: &[(&str, &str)],
) -> Result<ValueRange, GoogleApiError> {
    let client = reqwest::Client::new();
    let resp = send_with_retry(
        client.get(url).bearer_auth(access_token).query(params),
        &RetryPolicy::default(),
    )
    .await?;

    let status = resp.status();
    if status == reqwest::StatusCode::UNAUTHORIZED {
        return Err(GoogleApiError::AuthExpired);
    }
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(GoogleApiError::ApiError {
            status: status.as_u16(),
            message: body,
        });
    }

    Ok(resp.json().await?)
}

/// Bulk-append rows after the sheet's existing content.
///
/// One all-or-nothing call with `valueInputOption=RAW`; returns the number
/// of rows the API reports appended.
pub async fn append_rows(
    access_token: &str,
    spreadsheet_id: &str,
    sheet: &str,
    rows: &[Vec<String>],
) -> Result<usize, GoogleApiError> {
    let url = format!("{}/{}/values/{}:append", SHEETS_URL, spreadsheet_id, sheet);
    let body = serde_json::json!({ "values": rows });

    let client = reqwest::Client::new();
    let resp = send_with_retry(
        client
            .post(&url)
            .bearer_auth(access_token)
            .query(&[("valueInputOption", "RAW")])
            .json(&body),
        &RetryPolicy::default(),
    )
    .await?;

    let status = resp.status();
    if status == reqwest::StatusCode::UNAUTHORIZED {
        return Err(GoogleApiError::AuthExpired);
    }
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(GoogleApiError::ApiError {
            status: status.as_u16(),
            message: body,
        });
    }

    let appended: AppendResponse = resp.json().await?;
    Ok(appended
        .updates
        .map(|u| u.updated_rows)
        .unwrap_or(rows.len()))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_range_column_major() {
        // majorDimension=COLUMNS returns one inner vec per column.
        let json = r#"{
            "range": "'Email Summary'!A2:A10",
            "majorDimension": "COLUMNS",
            "values": [["01/01/2024 10:00:00", "01/02/2024 11:30:00"]]
        }"#;

        let range: ValueRange = serde_json::from_str(json).unwrap();
        assert_eq!(range.values.len(), 1);
        assert_eq!(range.values[0].last().unwrap(), "01/02/2024 11:30:00");
    }

    #[test]
    fn test_value_range_empty_sheet() {
        // The API omits "values" entirely for an empty range.
        let json = r#"{"range": "'Email Summary'!A2:A", "majorDimension": "COLUMNS"}"#;
        let range: ValueRange = serde_json::from_str(json).unwrap();
        assert!(range.values.is_empty());
    }

    #[test]
    fn test_value_range_row_major() {
        let json = r#"{
            "values": [
                ["Date", "From", "To", "Body"],
                ["01/01/2024 10:00:00", "teacher@x.com", "a@y.com", "hi"]
            ]
        }"#;

        let range: ValueRange = serde_json::from_str(json).unwrap();
        assert_eq!(range.values.len(), 2);
        assert_eq!(range.values[1][1], "teacher@x.com");
    }

    #[test]
    fn test_append_response() {
        let json = r#"{
            "spreadsheetId": "abc",
            "updates": {"updatedRange": "A3:D5", "updatedRows": 3, "updatedCells": 12}
        }"#;

        let resp: AppendResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.updates.unwrap().updated_rows, 3);
    }

    #[test]
    fn test_append_response_without_updates() {
        let resp: AppendResponse = serde_json::from_str(r#"{"spreadsheetId": "abc"}"#).unwrap();
        assert!(resp.updates.is_none());
    }
}
