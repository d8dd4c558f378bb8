use crate::carrier::request::{
    build_subscribe_request, build_token_request, build_track_request, OutboundBody,
    OutboundRequest,
};
use crate::carrier::response::{
    normalize_error, subscription_error, token_error, TrackContext, TrackErrorEnvelope,
};
use crate::carrier::types::{present, SubscribeRequest, TokenRequest, TrackRequest};
use crate::config::ProxyConfig;
use crate::error::{ProxyError, Result};

use axum::http::StatusCode;
use bytes::Bytes;
use chrono::Utc;
use tracing::{debug, info, warn};

/// Outcome of a call the carrier answered.
#[derive(Debug)]
pub enum ProxyResult {
    /// Carrier JSON body, relayed byte for byte.
    Success(Bytes),
    /// Carrier rejected the call; `body` is what the frontend receives with `status`.
    UpstreamError { status: u16, body: serde_json::Value },
}

/// Exchange client credentials for an OAuth bearer token.
pub async fn exchange_token(
    req: &TokenRequest,
    config: &ProxyConfig,
    client: &reqwest::Client,
) -> Result<ProxyResult> {
    let outbound = build_token_request(req, config)?;
    info!(url = %outbound.url, "Requesting OAuth token");

    let response = send(client, outbound, config).await?;
    let status = response.status();

    if !status.is_success() {
        let text = response.text().await.map_err(|e| {
            ProxyError::carrier(format!("Failed to read token error body: {e}"))
        })?;
        warn!(status = status.as_u16(), body = %truncate(&text, 300), "OAuth token request rejected");
        return Ok(ProxyResult::UpstreamError {
            status: status.as_u16(),
            body: token_error(&text),
        });
    }

    let body = read_json_body(response).await?;
    info!("OAuth token issued");
    Ok(ProxyResult::Success(body))
}

/// Look up a single tracking number, normalizing any carrier failure into a 502 envelope.
pub async fn track(
    req: &TrackRequest,
    config: &ProxyConfig,
    client: &reqwest::Client,
) -> Result<ProxyResult> {
    let outbound = build_track_request(req, config, Utc::now())?;
    info!(
        method = %outbound.method,
        url = %outbound.url,
        api = ?config.carrier.track_api,
        "Calling UPS tracking API"
    );

    let response = send(client, outbound, config).await?;
    let status = response.status();
    debug!(status = status.as_u16(), headers = ?response.headers(), "Tracking response received");

    if !status.is_success() {
        let headers = response.headers().clone();
        let body = match response.bytes().await {
            Ok(b) => b,
            Err(e) => Bytes::from(format!("Failed to read error response: {e}")),
        };
        let normalized = normalize_error(status.as_u16(), &headers, &body);

        warn!(
            status = normalized.status,
            content_type = %normalized.content_type,
            error_code = %normalized.error_code,
            error_description = %normalized.error_description,
            error_text = %truncate(&normalized.error_text, 500),
            parsed_json = normalized.error_json.is_some(),
            "UPS tracking API returned an error"
        );

        let envelope = TrackErrorEnvelope::new(
            normalized,
            TrackContext {
                tracking_number: req.tracking_number.as_deref().unwrap_or_default(),
                has_access_token: present(&req.access_token).is_some(),
                has_client_id: present(&req.client_id).is_some(),
            },
        );

        return Ok(ProxyResult::UpstreamError {
            status: StatusCode::BAD_GATEWAY.as_u16(),
            body: serde_json::to_value(envelope)?,
        });
    }

    let body = read_json_body(response).await?;
    info!(len = body.len(), "Tracking response relayed");
    Ok(ProxyResult::Success(body))
}

/// Subscribe tracking numbers to track alert push notifications.
pub async fn subscribe(
    req: &SubscribeRequest,
    config: &ProxyConfig,
    client: &reqwest::Client,
) -> Result<ProxyResult> {
    let outbound = build_subscribe_request(req, config, Utc::now())?;
    info!(
        url = %outbound.url,
        webhook_url = req.webhook_url.as_deref().unwrap_or_default(),
        "Subscribing to track alerts"
    );

    let response = send(client, outbound, config).await?;
    let status = response.status();

    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        warn!(status = status.as_u16(), body = %truncate(&text, 300), "Track alert subscription failed");
        return Ok(ProxyResult::UpstreamError {
            status: status.as_u16(),
            body: subscription_error(status.as_u16(), &text),
        });
    }

    let body = read_json_body(response).await?;
    info!("Track alert subscription accepted");
    Ok(ProxyResult::Success(body))
}

async fn send(
    client: &reqwest::Client,
    outbound: OutboundRequest,
    config: &ProxyConfig,
) -> Result<reqwest::Response> {
    let OutboundRequest {
        method,
        url,
        headers,
        body,
    } = outbound;

    let builder = client
        .request(method, url)
        .headers(headers)
        .timeout(config.timeout());

    let builder = match body {
        Some(OutboundBody::Form(form)) => builder.body(form),
        Some(OutboundBody::Json(json)) => builder.json(&json),
        None => builder,
    };

    builder.send().await.map_err(|e| {
        if e.is_timeout() {
            ProxyError::carrier(format!(
                "UPS API did not respond within {}s",
                config.timeout_secs
            ))
        } else {
            ProxyError::carrier(e.to_string())
        }
    })
}

/// Read a success body and make sure it is JSON before relaying it untouched.
async fn read_json_body(response: reqwest::Response) -> Result<Bytes> {
    let body = response
        .bytes()
        .await
        .map_err(|e| ProxyError::carrier(format!("Failed to read response body: {e}")))?;

    serde_json::from_slice::<serde::de::IgnoredAny>(&body).map_err(|e| {
        ProxyError::internal(format!(
            "Failed to parse UPS response: {}. Body: {}",
            e,
            truncate(&String::from_utf8_lossy(&body), 300)
        ))
    })?;

    Ok(body)
}

fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
