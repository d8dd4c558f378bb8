use crate::carrier::types::{SubscribeRequest, TokenRequest, TrackRequest};
use crate::carrier::webhook;
use crate::config::ProxyConfig;
use crate::error::{ProxyError, Result};
use crate::proxy::{self, ProxyResult};

use axum::body::Body;
use axum::extract::State;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderName, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use chrono::{SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub const SERVICE_NAME: &str = "UPS Proxy Server";

const AVAILABLE_ENDPOINTS: &[&str] = &[
    "GET /",
    "GET /health",
    "POST /api/ups/token",
    "POST /api/ups/track",
    "POST /api/ups/track-alert/subscribe",
    "POST /api/ups/track-alert/webhook",
    "POST /api/ups/test",
];

#[derive(Clone)]
pub struct AppState {
    pub config: ProxyConfig,
    pub client: reqwest::Client,
}

pub fn build_router(state: Arc<AppState>) -> Router {
    // Mirror whatever origin the browser sends; requests without one pass through untouched.
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            CONTENT_TYPE,
            AUTHORIZATION,
            HeaderName::from_static("x-merchant-id"),
            HeaderName::from_static("transid"),
            HeaderName::from_static("transactionsrc"),
        ]);

    // Wrong-method requests on known paths get the same 404 as unknown paths.
    Router::new()
        .route("/", get(handle_root).fallback(handle_not_found))
        .route("/health", get(handle_health).fallback(handle_not_found))
        .route("/api/ups/token", post(handle_token).fallback(handle_not_found))
        .route("/api/ups/track", post(handle_track).fallback(handle_not_found))
        .route(
            "/api/ups/track-alert/subscribe",
            post(handle_subscribe).fallback(handle_not_found),
        )
        .route(
            "/api/ups/track-alert/webhook",
            post(handle_webhook).fallback(handle_not_found),
        )
        .route("/api/ups/test", post(handle_test).fallback(handle_not_found))
        .fallback(handle_not_found)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn handle_root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "service": SERVICE_NAME,
        "status": "running",
        "endpoints": {
            "health": "GET /health",
            "token": "POST /api/ups/token",
            "track": "POST /api/ups/track",
            "track-alert-subscribe": "POST /api/ups/track-alert/subscribe",
            "track-alert-webhook": "POST /api/ups/track-alert/webhook",
            "test": "POST /api/ups/test",
        },
    }))
}

async fn handle_health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": SERVICE_NAME,
    }))
}

async fn handle_token(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let req: TokenRequest = match parse_body(&body) {
        Ok(r) => r,
        Err(e) => return e.into_response(),
    };
    relay("token", proxy::exchange_token(&req, &state.config, &state.client).await)
}

async fn handle_track(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let req: TrackRequest = match parse_body(&body) {
        Ok(r) => r,
        Err(e) => return e.into_response(),
    };

    info!(
        tracking_number = req.tracking_number.as_deref().unwrap_or_default(),
        has_access_token = req.access_token.is_some(),
        environment = req.environment.as_deref().unwrap_or("default"),
        "Tracking request"
    );

    relay("track", proxy::track(&req, &state.config, &state.client).await)
}

async fn handle_subscribe(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let req: SubscribeRequest = match parse_body(&body) {
        Ok(r) => r,
        Err(e) => return e.into_response(),
    };
    relay(
        "track-alert-subscribe",
        proxy::subscribe(&req, &state.config, &state.client).await,
    )
}

/// Acknowledge first; decoding happens on a detached task and cannot change the reply.
async fn handle_webhook(headers: HeaderMap, body: Bytes) -> (StatusCode, Json<serde_json::Value>) {
    let has_credential = headers.contains_key(AUTHORIZATION);

    tokio::spawn(async move {
        match webhook::interpret(&body, Utc::now()) {
            Ok(summary) => info!(
                tracking_number = summary.tracking_number.as_deref().unwrap_or_default(),
                status = %summary.status,
                status_type = %summary.status_type,
                status_code = %summary.status_code,
                status_description = %summary.status_description,
                location = %summary.location.as_ref().map(|l| l.to_string()).unwrap_or_default(),
                delivery_date = summary.delivery_date.as_deref().unwrap_or_default(),
                delivery_time = summary.delivery_time.as_deref().unwrap_or_default(),
                scheduled_date = summary.scheduled_date.as_deref().unwrap_or_default(),
                received_at = %summary.received_at.to_rfc3339(),
                has_credential,
                "Track alert event"
            ),
            Err(e) => warn!(error = %e, body_len = body.len(), "Failed to process track alert webhook"),
        }
    });

    (StatusCode::OK, Json(serde_json::json!({ "received": true })))
}

async fn handle_test(body: Bytes) -> Json<serde_json::Value> {
    let echoed = if body.iter().all(u8::is_ascii_whitespace) {
        serde_json::json!({})
    } else {
        serde_json::from_slice(&body)
            .unwrap_or_else(|_| serde_json::Value::String(String::from_utf8_lossy(&body).into_owned()))
    };

    Json(serde_json::json!({
        "message": "Test endpoint works!",
        "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        "body": echoed,
    }))
}

async fn handle_not_found(method: Method, uri: Uri) -> (StatusCode, Json<serde_json::Value>) {
    let url = uri
        .path_and_query()
        .map_or_else(|| uri.path().to_string(), |pq| pq.to_string());
    warn!(%method, path = uri.path(), "No route matched");
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({
            "error": "Endpoint not found",
            "method": method.as_str(),
            "path": uri.path(),
            "url": url,
            "originalUrl": url,
            "availableEndpoints": AVAILABLE_ENDPOINTS,
        })),
    )
}

/// Decode a JSON request body; an empty body reads as `{}`.
fn parse_body<T: DeserializeOwned + Default>(body: &[u8]) -> Result<T> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| ProxyError::invalid_input(format!("Invalid request body: {e}")))
}

fn relay(route: &str, result: Result<ProxyResult>) -> Response {
    match result {
        Ok(ProxyResult::Success(body)) => Response::builder()
            .status(StatusCode::OK)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response()),
        Ok(ProxyResult::UpstreamError { status, body }) => {
            let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
            (status, Json(body)).into_response()
        }
        Err(e) => {
            match &e {
                ProxyError::InvalidInput { message } => {
                    info!(route, %message, "Rejected invalid request");
                }
                other => warn!(route, error = %other, "Proxy error"),
            }
            e.into_response()
        }
    }
}
