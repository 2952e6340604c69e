//! Gmail API v1 — search and fetch the teacher/student correspondence.
//!
//! Lists message ids for a search query (`from:me to:(...) after:<epoch>`),
//! then fetches each message with `format=full` to extract the Date, From
//! and To headers plus a truncated plain-text body.

use serde::Deserialize;

use super::{send_with_retry, GoogleApiError, RetryPolicy};
use crate::datefmt;
use crate::types::EmailRecord;
use crate::util::truncate_chars;

const MESSAGES_URL: &str = "https://gmail.googleapis.com/gmail/v1/users/me/messages";

// ============================================================================
// API response types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageListResponse {
    #[serde(default)]
    messages: Vec<MessageStub>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessageStub {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageDetail {
    #[serde(default)]
    id: String,
    #[serde(default)]
    payload: Option<MessagePayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessagePayload {
    #[serde(default)]
    mime_type: String,
    #[serde(default)]
    headers: Vec<Header>,
    #[serde(default)]
    body: Option<PayloadBody>,
    #[serde(default)]
    parts: Vec<MessagePayload>,
}

#[derive(Debug, Deserialize)]
struct Header {
    #[serde(default)]
    name: String,
    #[serde(default)]
    value: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PayloadBody {
    #[serde(default)]
    data: Option<String>,
}

// ============================================================================
// Gmail API
// ============================================================================

/// List all message ids matching a search query, following pagination
/// until the result set is exhausted.
pub async fn list_message_ids(
    access_token: &str,
    query: &str,
) -> Result<Vec<String>, GoogleApiError> {
    let client = reqwest::Client::new();
    let mut ids = Vec::new();
    let mut page_token: Option<String> = None;

    loop {
        let mut params: Vec<(&str, String)> = vec![
            ("q", query.to_string()),
            ("maxResults", "100".to_string()),
        ];
        if let Some(ref token) = page_token {
            params.push(("pageToken", token.clone()));
        }

        let resp = send_with_retry(
            client
                .get(MESSAGES_URL)
                .bearer_auth(access_token)
                .query(&params),
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

        let list: MessageListResponse = resp.json().await?;
        ids.extend(list.messages.into_iter().map(|stub| stub.id));

        page_token = list.next_page_token;
        if page_token.is_none() {
            break;
        }
    }

    Ok(ids)
}

/// Fetch one message and reduce it to an [`EmailRecord`].
///
/// Returns `Ok(None)` when the message is missing a Date, From or To header
/// or its date cannot be parsed; such messages are skipped, never fatal.
pub async fn fetch_message(
    access_token: &str,
    message_id: &str,
    body_char_limit: usize,
) -> Result<Option<EmailRecord>, GoogleApiError> {
    let client = reqwest::Client::new();
    let url = format!("{}/{}", MESSAGES_URL, message_id);

    let resp = send_with_retry(
        client
            .get(&url)
            .bearer_auth(access_token)
            .query(&[("format", "full")]),
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

    let detail: MessageDetail = resp.json().await?;
    Ok(record_from_detail(detail, body_char_limit))
}

fn record_from_detail(detail: MessageDetail, body_char_limit: usize) -> Option<EmailRecord> {
    let payload = match detail.payload {
        Some(p) => p,
        None => {
            log::debug!("Message {} has no payload; skipping", detail.id);
            return None;
        }
    };

    let get_header = |name: &str| -> Option<String> {
        payload
            .headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.clone())
    };

    let (Some(date), Some(sender), Some(recipient)) =
        (get_header("Date"), get_header("From"), get_header("To"))
    else {
        log::debug!("Message {} is missing Date/From/To headers; skipping", detail.id);
        return None;
    };

    let timestamp = datefmt::parse_rfc2822(&date)?;
    let body = extract_plain_text(&payload).map(|text| truncate_chars(&text, body_char_limit));

    Some(EmailRecord {
        timestamp,
        sender,
        recipient,
        body,
    })
}

/// Walk the MIME tree for the first `text/plain` body.
///
/// Covers both a part inside a multipart message and a plain single-part
/// message (where the match is the root payload itself).
fn extract_plain_text(payload: &MessagePayload) -> Option<String> {
    if payload.mime_type == "text/plain" {
        if let Some(data) = payload.body.as_ref().and_then(|b| b.data.as_deref()) {
            return decode_url_safe_base64(data);
        }
    }
    for part in &payload.parts {
        if let Some(text) = extract_plain_text(part) {
            return Some(text);
        }
    }
    None
}

/// Decode URL-safe base64 (no padding) as used by Gmail API body data.
fn decode_url_safe_base64(data: &str) -> Option<String> {
    use base64::Engine;
    match base64::engine::general_purpose::URL_SAFE_NO_PAD.decode(data) {
        Ok(bytes) => String::from_utf8(bytes).ok(),
        Err(_) => None,
    }
}

/// Fetch the authenticated account's email address.
pub async fn fetch_profile_email(access_token: &str) -> Result<String, GoogleApiError> {
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Profile {
        email_address: String,
    }

    let client = reqwest::Client::new();
    let resp = send_with_retry(
        client
            .get("https://gmail.googleapis.com/gmail/v1/users/me/profile")
            .bearer_auth(access_token),
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

    let profile: Profile = resp.json().await?;
    Ok(profile.email_address)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;

    fn b64(text: &str) -> String {
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(text)
    }

    #[test]
    fn test_message_list_deserialization() {
        let json = r#"{
            "messages": [
                {"id": "msg1", "threadId": "t1"},
                {"id": "msg2", "threadId": "t2"}
            ],
            "nextPageToken": "token123"
        }"#;

        let resp: MessageListResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.messages.len(), 2);
        assert_eq!(resp.messages[0].id, "msg1");
        assert_eq!(resp.next_page_token.as_deref(), Some("token123"));
    }

    #[test]
    fn test_message_list_empty() {
        let json = r#"{"resultSizeEstimate": 0}"#;
        let resp: MessageListResponse = serde_json::from_str(json).unwrap();
        assert!(resp.messages.is_empty());
        assert!(resp.next_page_token.is_none());
    }

    fn detail_json(body_data: &str) -> String {
        format!(
            r#"{{
                "id": "msg123",
                "payload": {{
                    "mimeType": "multipart/alternative",
                    "headers": [
                        {{"name": "Date", "value": "Mon, 1 Jan 2024 10:00:00 +0000"}},
                        {{"name": "From", "value": "Teacher <teacher@school.edu>"}},
                        {{"name": "To", "value": "student@school.edu"}}
                    ],
                    "parts": [
                        {{"mimeType": "text/plain", "body": {{"data": "{}"}}}},
                        {{"mimeType": "text/html", "body": {{"data": "{}"}}}}
                    ]
                }}
            }}"#,
            body_data,
            b64("<p>html</p>")
        )
    }

    #[test]
    fn test_record_from_detail_multipart() {
        let detail: MessageDetail =
            serde_json::from_str(&detail_json(&b64("hello from class"))).unwrap();
        let record = record_from_detail(detail, 200).unwrap();

        assert_eq!(record.sender, "Teacher <teacher@school.edu>");
        assert_eq!(record.recipient, "student@school.edu");
        assert_eq!(record.body.as_deref(), Some("hello from class"));
    }

    #[test]
    fn test_record_from_detail_truncates_body() {
        let long_body = "x".repeat(500);
        let detail: MessageDetail = serde_json::from_str(&detail_json(&b64(&long_body))).unwrap();
        let record = record_from_detail(detail, 200).unwrap();

        assert_eq!(record.body.unwrap().chars().count(), 200);
    }

    #[test]
    fn test_record_from_detail_missing_headers() {
        let json = r#"{
            "id": "msg1",
            "payload": {
                "mimeType": "text/plain",
                "headers": [
                    {"name": "From", "value": "a@x.com"}
                ]
            }
        }"#;
        let detail: MessageDetail = serde_json::from_str(json).unwrap();
        assert!(record_from_detail(detail, 200).is_none());
    }

    #[test]
    fn test_record_from_detail_bad_date() {
        let json = r#"{
            "id": "msg1",
            "payload": {
                "mimeType": "text/plain",
                "headers": [
                    {"name": "Date", "value": "yesterday-ish"},
                    {"name": "From", "value": "a@x.com"},
                    {"name": "To", "value": "b@y.com"}
                ]
            }
        }"#;
        let detail: MessageDetail = serde_json::from_str(json).unwrap();
        assert!(record_from_detail(detail, 200).is_none());
    }

    #[test]
    fn test_extract_plain_text_single_part() {
        let json = format!(
            r#"{{
                "mimeType": "text/plain",
                "body": {{"data": "{}"}}
            }}"#,
            b64("plain body")
        );
        let payload: MessagePayload = serde_json::from_str(&json).unwrap();
        assert_eq!(extract_plain_text(&payload).as_deref(), Some("plain body"));
    }

    #[test]
    fn test_extract_plain_text_nested_multipart() {
        // multipart/mixed wrapping multipart/alternative, as Gmail nests
        // messages with attachments.
        let json = format!(
            r#"{{
                "mimeType": "multipart/mixed",
                "parts": [
                    {{
                        "mimeType": "multipart/alternative",
                        "parts": [
                            {{"mimeType": "text/plain", "body": {{"data": "{}"}}}},
                            {{"mimeType": "text/html", "body": {{"data": "{}"}}}}
                        ]
                    }},
                    {{"mimeType": "application/pdf", "body": {{}}}}
                ]
            }}"#,
            b64("nested body"),
            b64("<p>nested</p>")
        );
        let payload: MessagePayload = serde_json::from_str(&json).unwrap();
        assert_eq!(extract_plain_text(&payload).as_deref(), Some("nested body"));
    }

    #[test]
    fn test_extract_plain_text_html_only() {
        let json = format!(
            r#"{{
                "mimeType": "text/html",
                "body": {{"data": "{}"}}
            }}"#,
            b64("<p>no plain part</p>")
        );
        let payload: MessagePayload = serde_json::from_str(&json).unwrap();
        assert_eq!(extract_plain_text(&payload), None);
    }

    #[test]
    fn test_decode_url_safe_base64_invalid() {
        assert_eq!(decode_url_safe_base64("!!!not base64!!!"), None);
    }
}
