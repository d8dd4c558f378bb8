//! Normalize carrier failures into the envelopes the frontend understands.
//!
//! UPS reports errors in three places: a JSON body, a plain-text body, or the
//! `errorcode` / `errordescription` response headers with an empty body.
//! [`normalize_error`] reads all three without touching the network.

use reqwest::header::{HeaderMap, CONTENT_TYPE};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedError {
    pub status: u16,
    pub content_type: String,
    pub error_code: String,
    pub error_description: String,
    pub error_text: String,
    pub error_json: Option<serde_json::Value>,
    pub message: String,
    pub response_headers: BTreeMap<String, String>,
}

/// Inspect a failed carrier response. Pure: `(status, headers, body) -> NormalizedError`.
pub fn normalize_error(status: u16, headers: &HeaderMap, body: &[u8]) -> NormalizedError {
    let content_type = header_str(headers, CONTENT_TYPE.as_str());
    let error_code = header_str(headers, "errorcode");
    let error_description = header_str(headers, "errordescription");

    let error_text = String::from_utf8_lossy(body).into_owned();
    let error_json = parse_json_body(&error_text);

    let message = if !error_text.trim().is_empty() {
        error_text.clone()
    } else if !error_code.is_empty() || !error_description.is_empty() {
        format!("UPS API Error: {error_code} - {error_description}")
            .trim()
            .to_string()
    } else {
        format!("UPS API returned {status} with empty response body")
    };

    NormalizedError {
        status,
        content_type,
        error_code,
        error_description,
        error_text,
        error_json,
        message,
        response_headers: flatten_headers(headers),
    }
}

/// Parse a body that looks like a JSON object; anything else yields `None`.
pub fn parse_json_body(text: &str) -> Option<serde_json::Value> {
    let trimmed = text.trim();
    if !trimmed.starts_with('{') {
        return None;
    }
    serde_json::from_str(trimmed).ok()
}

/// Lowercase header names to values, repeated headers joined with `", "`.
pub fn flatten_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut out: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes());
        out.entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert_with(|| value.into_owned());
    }
    out
}

fn header_str(headers: &HeaderMap, name: &str) -> String {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// Request facts echoed in the `debug` block of a tracking failure.
#[derive(Debug, Clone, Copy)]
pub struct TrackContext<'a> {
    pub tracking_number: &'a str,
    pub has_access_token: bool,
    pub has_client_id: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackErrorEnvelope {
    pub error: String,
    pub ups_status: u16,
    pub ups_error_code: String,
    pub ups_error_description: String,
    pub ups_error: String,
    pub ups_error_json: Option<serde_json::Value>,
    pub message: String,
    pub debug: TrackErrorDebug,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackErrorDebug {
    pub content_type: String,
    pub tracking_number: String,
    pub has_access_token: bool,
    pub has_client_id: bool,
    pub error_text_length: usize,
    pub all_response_headers: BTreeMap<String, String>,
}

impl TrackErrorEnvelope {
    pub fn new(err: NormalizedError, ctx: TrackContext<'_>) -> Self {
        Self {
            error: "UPS API returned an error".to_string(),
            ups_status: err.status,
            message: format!("UPS API returned status {}. {}", err.status, err.message),
            debug: TrackErrorDebug {
                content_type: err.content_type,
                tracking_number: ctx.tracking_number.to_string(),
                has_access_token: ctx.has_access_token,
                has_client_id: ctx.has_client_id,
                error_text_length: err.error_text.chars().count(),
                all_response_headers: err.response_headers,
            },
            ups_error_code: err.error_code,
            ups_error_description: err.error_description,
            ups_error: err.message,
            ups_error_json: err.error_json,
        }
    }
}

/// Body relayed when a track alert subscription is rejected.
pub fn subscription_error(status: u16, text: &str) -> serde_json::Value {
    serde_json::json!({
        "error": "Track Alert subscription failed",
        "upsStatus": status,
        "upsError": text,
        "upsErrorJson": serde_json::from_str::<serde_json::Value>(text).ok(),
    })
}

/// Body relayed when the OAuth endpoint rejects the client credentials.
pub fn token_error(text: &str) -> serde_json::Value {
    serde_json::json!({ "error": text })
}
