use serde::{Deserialize, Deserializer, Serialize};

// ---------------------------------------------------------------------------
// Inbound types (what the browser frontend sends TO us)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRequest {
    #[serde(default, deserialize_with = "loose_string")]
    pub client_id: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub client_secret: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub environment: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackRequest {
    #[serde(default, deserialize_with = "loose_string")]
    pub tracking_number: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub access_token: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub client_id: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub environment: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeRequest {
    // Kept loose so a non-array gets the same message as a missing field
    #[serde(default)]
    pub tracking_numbers: Option<serde_json::Value>,
    #[serde(default, deserialize_with = "loose_string")]
    pub webhook_url: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub access_token: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub client_id: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub environment: Option<String>,
}

/// Accept a string or a number; any other JSON value reads as absent.
pub fn loose_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(scalar_string))
}

/// String form of a JSON string or number.
pub fn scalar_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn loose_activity_status<'de, D>(deserializer: D) -> Result<Option<ActivityStatus>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}

/// Treat `""` the same as an absent field.
pub fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.is_empty())
}

// ---------------------------------------------------------------------------
// Outbound wire types (what we send TO the carrier)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TrackEnvelope {
    pub track_request: TrackRequestBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TrackRequestBody {
    pub request: RequestHeader,
    pub inquiry_number: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RequestHeader {
    pub request_option: String,
    pub transaction_reference: TransactionReference,
    pub locale: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TransactionReference {
    pub customer_context: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionRequest {
    pub locale: String,
    pub country_code: String,
    pub tracking_number_list: Vec<String>,
    pub destination: SubscriptionDestination,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionDestination {
    pub url: String,
    pub credential_type: String,
    pub credential: String,
}

// ---------------------------------------------------------------------------
// Track alert push payload (what the carrier sends to our webhook)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrackAlertEvent {
    #[serde(deserialize_with = "loose_string")]
    pub tracking_number: Option<String>,
    #[serde(deserialize_with = "loose_activity_status")]
    pub activity_status: Option<ActivityStatus>,
    pub activity_location: Option<serde_json::Value>,
    #[serde(deserialize_with = "loose_string")]
    pub local_activity_date: Option<String>,
    #[serde(deserialize_with = "loose_string")]
    pub local_activity_time: Option<String>,
    #[serde(deserialize_with = "loose_string")]
    pub scheduled_delivery_date: Option<String>,
    #[serde(deserialize_with = "loose_string")]
    pub actual_delivery_date: Option<String>,
    #[serde(deserialize_with = "loose_string")]
    pub actual_delivery_time: Option<String>,
    #[serde(deserialize_with = "loose_string")]
    pub gmt_activity_date: Option<String>,
    #[serde(deserialize_with = "loose_string")]
    pub gmt_activity_time: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivityStatus {
    #[serde(rename = "type", deserialize_with = "loose_string")]
    pub status_type: Option<String>,
    #[serde(deserialize_with = "loose_string")]
    pub code: Option<String>,
    #[serde(deserialize_with = "loose_string")]
    pub description: Option<String>,
}
