//! Decode track alert push notifications.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

use super::types::TrackAlertEvent;
use crate::error::{ProxyError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DeliveryStatus {
    #[serde(rename = "Delivered")]
    Delivered,
    #[serde(rename = "Out for Delivery")]
    OutForDelivery,
    #[serde(rename = "Exception")]
    Exception,
    #[serde(rename = "In Transit")]
    InTransit,
    #[serde(rename = "Manifest")]
    Manifest,
    #[serde(rename = "Update")]
    Update,
}

impl DeliveryStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Delivered => "Delivered",
            Self::OutForDelivery => "Out for Delivery",
            Self::Exception => "Exception",
            Self::InTransit => "In Transit",
            Self::Manifest => "Manifest",
            Self::Update => "Update",
        }
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Map a UPS activity status type onto a delivery status.
pub fn delivery_status(status_type: &str, actual_delivery_date: Option<&str>) -> DeliveryStatus {
    match status_type {
        "D" if actual_delivery_date.is_some_and(|d| !d.is_empty()) => DeliveryStatus::Delivered,
        "D" => DeliveryStatus::OutForDelivery,
        "X" => DeliveryStatus::Exception,
        "M" | "MV" => DeliveryStatus::Manifest,
        "U" => DeliveryStatus::Update,
        // "I" and anything unrecognised
        _ => DeliveryStatus::InTransit,
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackAlertSummary {
    pub tracking_number: Option<String>,
    pub status: DeliveryStatus,
    pub status_type: String,
    pub status_code: String,
    pub status_description: String,
    pub location: Option<serde_json::Value>,
    pub delivery_date: Option<String>,
    pub delivery_time: Option<String>,
    pub scheduled_date: Option<String>,
    pub received_at: DateTime<Utc>,
}

impl TrackAlertSummary {
    pub fn from_event(event: TrackAlertEvent, received_at: DateTime<Utc>) -> Self {
        let activity = event.activity_status.unwrap_or_default();
        let status_type = activity.status_type.unwrap_or_default();
        let status = delivery_status(&status_type, event.actual_delivery_date.as_deref());

        Self {
            tracking_number: event.tracking_number,
            status,
            status_type,
            status_code: activity.code.unwrap_or_default(),
            status_description: activity.description.unwrap_or_default(),
            location: event.activity_location,
            delivery_date: event.actual_delivery_date,
            delivery_time: event.actual_delivery_time,
            scheduled_date: event.scheduled_delivery_date,
            received_at,
        }
    }
}

/// Decode a raw webhook body.
///
/// # Errors
/// Returns `ProxyError::Json` when the body is not JSON and `ProxyError::InvalidInput`
/// when it is JSON but not an event object.
pub fn interpret(body: &[u8], received_at: DateTime<Utc>) -> Result<TrackAlertSummary> {
    let value: serde_json::Value = serde_json::from_slice(body)?;
    if !value.is_object() {
        return Err(ProxyError::invalid_input(
            "Track alert payload is not a JSON object",
        ));
    }
    let event: TrackAlertEvent = serde_json::from_value(value)?;
    Ok(TrackAlertSummary::from_event(event, received_at))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            delivery_status("D", Some("20240612")),
            DeliveryStatus::Delivered
        );
        assert_eq!(delivery_status("D", None), DeliveryStatus::OutForDelivery);
        assert_eq!(delivery_status("D", Some("")), DeliveryStatus::OutForDelivery);
        assert_eq!(delivery_status("X", None), DeliveryStatus::Exception);
        assert_eq!(delivery_status("I", None), DeliveryStatus::InTransit);
        assert_eq!(delivery_status("M", None), DeliveryStatus::Manifest);
        assert_eq!(delivery_status("MV", None), DeliveryStatus::Manifest);
        assert_eq!(delivery_status("U", None), DeliveryStatus::Update);
        assert_eq!(delivery_status("", None), DeliveryStatus::InTransit);
        assert_eq!(delivery_status("Q", None), DeliveryStatus::InTransit);
    }

    #[test]
    fn test_interpret_delivered_event() {
        let body = serde_json::json!({
            "trackingNumber": "1Z999AA10123456784",
            "activityStatus": { "type": "D", "code": "KB", "description": "Delivered" },
            "activityLocation": { "city": "ATLANTA", "stateProvince": "GA" },
            "actualDeliveryDate": "20240612",
            "actualDeliveryTime": "143000"
        });
        let summary = interpret(body.to_string().as_bytes(), Utc::now()).unwrap();

        assert_eq!(summary.status, DeliveryStatus::Delivered);
        assert_eq!(summary.status_code, "KB");
        assert_eq!(summary.tracking_number.as_deref(), Some("1Z999AA10123456784"));
        assert_eq!(summary.location.unwrap()["city"], "ATLANTA");
    }

    #[test]
    fn test_interpret_missing_activity_status() {
        let summary = interpret(br#"{"trackingNumber":"1Z1"}"#, Utc::now()).unwrap();
        assert_eq!(summary.status, DeliveryStatus::InTransit);
        assert_eq!(summary.status_type, "");
    }

    #[test]
    fn test_interpret_numeric_fields_still_delivered() {
        let body = br#"{"trackingNumber":"1Z1","activityStatus":{"type":"D","code":11},"actualDeliveryDate":20240612}"#;
        let summary = interpret(body, Utc::now()).unwrap();

        assert_eq!(summary.status, DeliveryStatus::Delivered);
        assert_eq!(summary.status_code, "11");
        assert_eq!(summary.delivery_date.as_deref(), Some("20240612"));
    }

    #[test]
    fn test_interpret_rejects_garbage() {
        assert!(interpret(b"not json", Utc::now()).is_err());
        assert!(interpret(b"[1,2,3]", Utc::now()).is_err());
        assert!(interpret(b"", Utc::now()).is_err());
    }

    #[test]
    fn test_status_serializes_as_label() {
        let json = serde_json::to_value(DeliveryStatus::OutForDelivery).unwrap();
        assert_eq!(json, "Out for Delivery");
        assert_eq!(DeliveryStatus::OutForDelivery.to_string(), "Out for Delivery");
    }
}
