//! Build carrier HTTP requests from the simplified frontend requests.
//!
//! Every builder validates its input first and returns [`ProxyError::InvalidInput`]
//! before anything else happens, so a rejected request never reaches the network.
//! The result is a plain [`OutboundRequest`] value; `proxy` is the only place that sends it.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, Url};

use super::types::{
    present, scalar_string, RequestHeader, SubscribeRequest, SubscriptionDestination,
    SubscriptionRequest, TokenRequest, TrackEnvelope, TrackRequest, TrackRequestBody,
    TransactionReference,
};
use crate::config::{ProxyConfig, TrackApi};
use crate::error::{ProxyError, Result};

pub const MAX_SUBSCRIPTION_NUMBERS: usize = 100;

const MERCHANT_ID: HeaderName = HeaderName::from_static("x-merchant-id");
const TRANS_ID: HeaderName = HeaderName::from_static("transid");
const TRANSACTION_SRC: HeaderName = HeaderName::from_static("transactionsrc");

const LOCALE: &str = "en_US";

#[derive(Debug, Clone, PartialEq)]
pub enum OutboundBody {
    Form(String),
    Json(serde_json::Value),
}

#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<OutboundBody>,
}

/// `POST /security/v1/oauth/token` with a client-credentials grant.
pub fn build_token_request(req: &TokenRequest, config: &ProxyConfig) -> Result<OutboundRequest> {
    let (Some(client_id), Some(client_secret)) =
        (present(&req.client_id), present(&req.client_secret))
    else {
        return Err(ProxyError::invalid_input(
            "Client ID and Client Secret are required",
        ));
    };

    let base_url = config.base_url_for(req.environment.as_deref());
    let url = carrier_url(base_url, &["security", "v1", "oauth", "token"])?;

    let mut headers = HeaderMap::new();
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static("application/x-www-form-urlencoded"),
    );
    headers.insert(
        AUTHORIZATION,
        header_value(
            &format!("Basic {}", basic_credential(client_id, client_secret)),
            "clientId/clientSecret",
        )?,
    );
    headers.insert(MERCHANT_ID, header_value(client_id, "clientId")?);

    Ok(OutboundRequest {
        method: Method::POST,
        url,
        headers,
        body: Some(OutboundBody::Form("grant_type=client_credentials".to_string())),
    })
}

/// Tracking lookup, shaped by the configured [`TrackApi`].
pub fn build_track_request(
    req: &TrackRequest,
    config: &ProxyConfig,
    now: DateTime<Utc>,
) -> Result<OutboundRequest> {
    let (Some(tracking_number), Some(access_token)) =
        (present(&req.tracking_number), present(&req.access_token))
    else {
        return Err(ProxyError::invalid_input(
            "Tracking number and access token are required",
        ));
    };

    let trans_id = transaction_id("tracking", now);
    let mut headers = bearer_headers(access_token, &trans_id, &config.carrier.transaction_src)?;
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

    if config.carrier.forward_merchant_id {
        if let Some(client_id) = present(&req.client_id) {
            headers.insert(MERCHANT_ID, header_value(client_id, "clientId")?);
        }
    }

    let base_url = config.base_url_for(req.environment.as_deref());

    match config.carrier.track_api {
        TrackApi::DetailsGet => Ok(OutboundRequest {
            method: Method::GET,
            url: carrier_url(base_url, &["track", "v1", "details", tracking_number])?,
            headers,
            body: None,
        }),
        TrackApi::LegacyPost => {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            let envelope = TrackEnvelope {
                track_request: TrackRequestBody {
                    request: RequestHeader {
                        request_option: "1".to_string(),
                        transaction_reference: TransactionReference {
                            customer_context: trans_id,
                        },
                        locale: LOCALE.to_string(),
                    },
                    inquiry_number: tracking_number.to_string(),
                },
            };
            Ok(OutboundRequest {
                method: Method::POST,
                url: carrier_url(base_url, &["api", "track", "v1", "details"])?,
                headers,
                body: Some(OutboundBody::Json(serde_json::to_value(&envelope)?)),
            })
        }
    }
}

/// Track alert subscription for up to [`MAX_SUBSCRIPTION_NUMBERS`] packages.
pub fn build_subscribe_request(
    req: &SubscribeRequest,
    config: &ProxyConfig,
    now: DateTime<Utc>,
) -> Result<OutboundRequest> {
    let tracking_numbers = validate_tracking_numbers(req.tracking_numbers.as_ref())?;

    let Some(webhook_url) = present(&req.webhook_url) else {
        return Err(ProxyError::invalid_input("webhookUrl is required"));
    };
    let Some(access_token) = present(&req.access_token) else {
        return Err(ProxyError::invalid_input("accessToken is required"));
    };

    let trans_id = transaction_id("track-alert", now);
    let mut headers = bearer_headers(access_token, &trans_id, &config.carrier.transaction_src)?;
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    if let Some(client_id) = present(&req.client_id) {
        headers.insert(MERCHANT_ID, header_value(client_id, "clientId")?);
    }

    let subscription = SubscriptionRequest {
        locale: LOCALE.to_string(),
        country_code: "US".to_string(),
        tracking_number_list: tracking_numbers,
        destination: SubscriptionDestination {
            url: webhook_url.to_string(),
            credential_type: "Bearer".to_string(),
            // Echoed back by the carrier in the webhook headers
            credential: access_token.to_string(),
        },
    };

    let base_url = config.base_url_for(req.environment.as_deref());
    Ok(OutboundRequest {
        method: Method::POST,
        url: carrier_url(
            base_url,
            &["api", "track", "v1", "subscription", "standard", "package"],
        )?,
        headers,
        body: Some(OutboundBody::Json(serde_json::to_value(&subscription)?)),
    })
}

fn validate_tracking_numbers(value: Option<&serde_json::Value>) -> Result<Vec<String>> {
    let list = match value.and_then(|v| v.as_array()) {
        Some(list) if !list.is_empty() => list,
        _ => return Err(ProxyError::invalid_input("trackingNumbers array is required")),
    };

    if list.len() > MAX_SUBSCRIPTION_NUMBERS {
        return Err(ProxyError::invalid_input(format!(
            "Maximum {MAX_SUBSCRIPTION_NUMBERS} tracking numbers per request"
        )));
    }

    list.iter()
        .enumerate()
        .map(|(i, n)| match scalar_string(n) {
            Some(s) if !s.is_empty() => Ok(s),
            _ => Err(ProxyError::invalid_input(format!(
                "trackingNumbers[{i}] must be a non-empty string"
            ))),
        })
        .collect()
}

/// Base64 of `clientId:clientSecret` for HTTP Basic auth.
pub fn basic_credential(client_id: &str, client_secret: &str) -> String {
    STANDARD.encode(format!("{client_id}:{client_secret}"))
}

/// Correlation id the carrier echoes back, e.g. `tracking-1718000000000`.
pub fn transaction_id(prefix: &str, now: DateTime<Utc>) -> String {
    format!("{}-{}", prefix, now.timestamp_millis())
}

fn bearer_headers(access_token: &str, trans_id: &str, transaction_src: &str) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        header_value(&format!("Bearer {access_token}"), "accessToken")?,
    );
    headers.insert(TRANS_ID, header_value(trans_id, "transId")?);
    headers.insert(
        TRANSACTION_SRC,
        header_value(transaction_src, "transactionSrc")?,
    );
    Ok(headers)
}

fn header_value(value: &str, field: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value).map_err(|_| {
        ProxyError::invalid_input(format!(
            "{field} contains characters that are not allowed in an HTTP header"
        ))
    })
}

/// Join path segments onto the base URL, percent-encoding each one.
fn carrier_url(base_url: &str, segments: &[&str]) -> Result<Url> {
    let mut url = Url::parse(base_url).map_err(|e| {
        ProxyError::config(format!("Invalid carrier base URL '{base_url}': {e}"))
    })?;

    url.path_segments_mut()
        .map_err(|()| ProxyError::config(format!("Carrier base URL '{base_url}' cannot be a base")))?
        .pop_if_empty()
        .extend(segments);

    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.timestamp_millis_opt(1_718_000_000_123).unwrap()
    }

    fn track_req(number: &str, token: &str) -> TrackRequest {
        TrackRequest {
            tracking_number: Some(number.to_string()),
            access_token: Some(token.to_string()),
            client_id: Some("merchant-1".to_string()),
            environment: None,
        }
    }

    fn header<'a>(req: &'a OutboundRequest, name: &str) -> Option<&'a str> {
        req.headers.get(name).and_then(|v| v.to_str().ok())
    }

    #[test]
    fn test_basic_credential() {
        // "id:secret"
        assert_eq!(basic_credential("id", "secret"), "aWQ6c2VjcmV0");
    }

    #[test]
    fn test_transaction_id() {
        assert_eq!(
            transaction_id("tracking", fixed_now()),
            "tracking-1718000000123"
        );
    }

    #[test]
    fn test_token_request_shape() {
        let req = TokenRequest {
            client_id: Some("id".to_string()),
            client_secret: Some("secret".to_string()),
            environment: Some("test".to_string()),
        };
        let out = build_token_request(&req, &ProxyConfig::default()).unwrap();

        assert_eq!(out.method, Method::POST);
        assert_eq!(
            out.url.as_str(),
            "https://wwwcie.ups.com/security/v1/oauth/token"
        );
        assert_eq!(header(&out, "authorization"), Some("Basic aWQ6c2VjcmV0"));
        assert_eq!(
            header(&out, "content-type"),
            Some("application/x-www-form-urlencoded")
        );
        assert_eq!(header(&out, "x-merchant-id"), Some("id"));
        assert_eq!(
            out.body,
            Some(OutboundBody::Form("grant_type=client_credentials".to_string()))
        );
    }

    #[test]
    fn test_token_request_requires_both_credentials() {
        let config = ProxyConfig::default();
        let missing_secret = TokenRequest {
            client_id: Some("id".to_string()),
            ..Default::default()
        };
        let empty_id = TokenRequest {
            client_id: Some(String::new()),
            client_secret: Some("secret".to_string()),
            environment: None,
        };

        for req in [missing_secret, empty_id] {
            let err = build_token_request(&req, &config).unwrap_err();
            assert!(matches!(err, ProxyError::InvalidInput { .. }));
        }
    }

    #[test]
    fn test_track_get_shape() {
        let out =
            build_track_request(&track_req("1Z999AA10123456784", "tok"), &ProxyConfig::default(), fixed_now())
                .unwrap();

        assert_eq!(out.method, Method::GET);
        assert_eq!(
            out.url.as_str(),
            "https://onlinetools.ups.com/track/v1/details/1Z999AA10123456784"
        );
        assert_eq!(header(&out, "authorization"), Some("Bearer tok"));
        assert_eq!(header(&out, "accept"), Some("application/json"));
        assert_eq!(header(&out, "transid"), Some("tracking-1718000000123"));
        assert_eq!(header(&out, "transactionsrc"), Some("budget-manager"));
        assert!(header(&out, "x-merchant-id").is_none());
        assert!(out.body.is_none());
    }

    #[test]
    fn test_track_number_is_percent_encoded() {
        let out = build_track_request(&track_req("1Z 99/9", "tok"), &ProxyConfig::default(), fixed_now())
            .unwrap();
        assert_eq!(
            out.url.as_str(),
            "https://onlinetools.ups.com/track/v1/details/1Z%2099%2F9"
        );
    }

    #[test]
    fn test_track_legacy_post_envelope() {
        let mut config = ProxyConfig::default();
        config.carrier.track_api = TrackApi::LegacyPost;
        config.carrier.forward_merchant_id = true;

        let out = build_track_request(&track_req("1Z999", "tok"), &config, fixed_now()).unwrap();

        assert_eq!(out.method, Method::POST);
        assert_eq!(
            out.url.as_str(),
            "https://onlinetools.ups.com/api/track/v1/details"
        );
        assert_eq!(header(&out, "x-merchant-id"), Some("merchant-1"));

        let Some(OutboundBody::Json(body)) = out.body else {
            panic!("Expected JSON body");
        };
        assert_eq!(body["TrackRequest"]["InquiryNumber"], "1Z999");
        assert_eq!(
            body["TrackRequest"]["Request"]["TransactionReference"]["CustomerContext"],
            "tracking-1718000000123"
        );
    }

    #[test]
    fn test_track_requires_number_and_token() {
        let config = ProxyConfig::default();
        let no_token = TrackRequest {
            tracking_number: Some("1Z".to_string()),
            ..Default::default()
        };
        let no_number = TrackRequest {
            access_token: Some("tok".to_string()),
            ..Default::default()
        };

        for req in [no_token, no_number] {
            let err = build_track_request(&req, &config, fixed_now()).unwrap_err();
            assert!(matches!(err, ProxyError::InvalidInput { .. }));
        }
    }

    #[test]
    fn test_track_rejects_token_with_newline() {
        let err = build_track_request(&track_req("1Z", "tok\nevil"), &ProxyConfig::default(), fixed_now())
            .unwrap_err();
        assert!(matches!(err, ProxyError::InvalidInput { .. }));
    }

    #[test]
    fn test_base_url_with_trailing_slash() {
        let mut config = ProxyConfig::default();
        config.carrier.production_url = "http://127.0.0.1:9000/".to_string();
        let out = build_track_request(&track_req("1Z", "tok"), &config, fixed_now()).unwrap();
        assert_eq!(out.url.as_str(), "http://127.0.0.1:9000/track/v1/details/1Z");
    }

    fn subscribe_req(numbers: serde_json::Value) -> SubscribeRequest {
        SubscribeRequest {
            tracking_numbers: Some(numbers),
            webhook_url: Some("https://example.com/hook".to_string()),
            access_token: Some("tok".to_string()),
            client_id: Some("merchant-1".to_string()),
            environment: None,
        }
    }

    #[test]
    fn test_subscribe_shape() {
        let out = build_subscribe_request(
            &subscribe_req(serde_json::json!(["1Z1", "1Z2"])),
            &ProxyConfig::default(),
            fixed_now(),
        )
        .unwrap();

        assert_eq!(
            out.url.as_str(),
            "https://onlinetools.ups.com/api/track/v1/subscription/standard/package"
        );
        assert_eq!(header(&out, "transid"), Some("track-alert-1718000000123"));
        assert_eq!(header(&out, "x-merchant-id"), Some("merchant-1"));

        let Some(OutboundBody::Json(body)) = out.body else {
            panic!("Expected JSON body");
        };
        assert_eq!(
            body,
            serde_json::json!({
                "locale": "en_US",
                "countryCode": "US",
                "trackingNumberList": ["1Z1", "1Z2"],
                "destination": {
                    "url": "https://example.com/hook",
                    "credentialType": "Bearer",
                    "credential": "tok"
                }
            })
        );
    }

    #[test]
    fn test_subscribe_validation_messages() {
        let config = ProxyConfig::default();
        let message = |req: SubscribeRequest| {
            build_subscribe_request(&req, &config, fixed_now())
                .unwrap_err()
                .to_string()
        };

        assert_eq!(
            message(subscribe_req(serde_json::json!([]))),
            "trackingNumbers array is required"
        );
        assert_eq!(
            message(subscribe_req(serde_json::json!("1Z1"))),
            "trackingNumbers array is required"
        );

        let too_many: Vec<String> = (0..101).map(|i| format!("1Z{i}")).collect();
        assert_eq!(
            message(subscribe_req(serde_json::json!(too_many))),
            "Maximum 100 tracking numbers per request"
        );

        let mut no_url = subscribe_req(serde_json::json!(["1Z1"]));
        no_url.webhook_url = None;
        assert_eq!(message(no_url), "webhookUrl is required");

        let mut no_token = subscribe_req(serde_json::json!(["1Z1"]));
        no_token.access_token = Some(String::new());
        assert_eq!(message(no_token), "accessToken is required");
    }

    #[test]
    fn test_subscribe_numeric_entries_become_strings() {
        let out = build_subscribe_request(
            &subscribe_req(serde_json::json!(["1Z1", 12345])),
            &ProxyConfig::default(),
            fixed_now(),
        )
        .unwrap();
        let Some(OutboundBody::Json(body)) = out.body else {
            panic!("Expected JSON body");
        };
        assert_eq!(body["trackingNumberList"], serde_json::json!(["1Z1", "12345"]));
    }

    #[test]
    fn test_subscribe_accepts_exactly_one_hundred() {
        let numbers: Vec<String> = (0..100).map(|i| format!("1Z{i}")).collect();
        assert!(build_subscribe_request(
            &subscribe_req(serde_json::json!(numbers)),
            &ProxyConfig::default(),
            fixed_now()
        )
        .is_ok());
    }
}
