//! Messaging vendor wire types.
//!
//! Shared between the vendor simulator, the campaign dispatcher, and the
//! REST layer. Field names follow the vendor's camelCase JSON contract.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// ─── Outbound Messages ──────────────────────────────────────────────────────

/// Customer context attached to an outbound message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CustomerData {
    pub id: String,
    pub name: String,
    pub email: String,
}

/// One message handed to the vendor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VendorMessage {
    pub to: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_data: Option<CustomerData>,
}

/// `POST /vendor/send-message` body. Fields are optional on the wire so
/// that missing values surface as vendor validation errors.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub customer_data: Option<CustomerData>,
}

/// `POST /vendor/batch-send` body.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BatchSendRequest {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub messages: Vec<VendorMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub campaign_id: Option<String>,
}

// ─── Delivery Results ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Sent,
    Failed,
    Pending,
}

/// Per-message outcome reported by the vendor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryResult {
    pub to: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    pub delivery_status: DeliveryStatus,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_count: Option<u32>,
}

impl DeliveryResult {
    pub fn delivered(to: impl Into<String>, message_id: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            success: true,
            message_id: Some(message_id.into()),
            error: None,
            error_code: None,
            delivery_status: DeliveryStatus::Sent,
            timestamp: Utc::now(),
            retry_count: None,
        }
    }

    pub fn failed(
        to: impl Into<String>,
        error: impl Into<String>,
        error_code: impl Into<String>,
    ) -> Self {
        Self {
            to: to.into(),
            success: false,
            message_id: None,
            error: Some(error.into()),
            error_code: Some(error_code.into()),
            delivery_status: DeliveryStatus::Failed,
            timestamp: Utc::now(),
            retry_count: None,
        }
    }

    pub fn with_retry_count(mut self, retry_count: u32) -> Self {
        self.retry_count = Some(retry_count);
        self
    }
}

/// Aggregate response for a batch send.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BatchSendResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    pub total_messages: usize,
    pub success_count: usize,
    pub failure_count: usize,
    pub results: Vec<DeliveryResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub campaign_id: Option<String>,
}

impl BatchSendResponse {
    /// Build a successful batch response from per-message results.
    pub fn from_results(results: Vec<DeliveryResult>, campaign_id: Option<String>) -> Self {
        let success_count = results.iter().filter(|r| r.success).count();
        Self {
            success: true,
            error: None,
            error_code: None,
            total_messages: results.len(),
            success_count,
            failure_count: results.len() - success_count,
            results,
            campaign_id,
        }
    }

    /// A batch the vendor refused as a whole: every message is reported
    /// failed with the rejection code.
    pub fn rejected(
        messages: &[VendorMessage],
        error: impl Into<String>,
        error_code: impl Into<String>,
        campaign_id: Option<String>,
    ) -> Self {
        let error = error.into();
        let error_code = error_code.into();
        let results: Vec<DeliveryResult> = messages
            .iter()
            .map(|m| DeliveryResult::failed(m.to.clone(), error.clone(), error_code.clone()))
            .collect();
        Self {
            success: false,
            error: Some(error),
            error_code: Some(error_code),
            total_messages: messages.len(),
            success_count: 0,
            failure_count: messages.len(),
            results,
            campaign_id,
        }
    }
}

// ─── Health ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitUsage {
    pub requests_per_minute: u32,
    pub current_usage: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VendorHealth {
    pub status: String,
    pub service: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub rate_limits: RateLimitUsage,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(to: &str) -> VendorMessage {
        VendorMessage {
            to: to.to_string(),
            message: "hello".to_string(),
            customer_data: None,
        }
    }

    #[test]
    fn test_from_results_counts() {
        let results = vec![
            DeliveryResult::delivered("+1", "msg_1"),
            DeliveryResult::failed("+2", "Carrier rejected", "CARRIER_REJECTED"),
            DeliveryResult::delivered("+3", "msg_3"),
        ];
        let response = BatchSendResponse::from_results(results, Some("c-1".into()));
        assert!(response.success);
        assert_eq!(response.total_messages, 3);
        assert_eq!(response.success_count, 2);
        assert_eq!(response.failure_count, 1);
        assert_eq!(response.campaign_id.as_deref(), Some("c-1"));
    }

    #[test]
    fn test_rejected_marks_every_message_failed() {
        let messages = vec![message("+1"), message("+2")];
        let response = BatchSendResponse::rejected(&messages, "Invalid API key", "AUTH_FAILED", None);
        assert!(!response.success);
        assert_eq!(response.success_count, 0);
        assert_eq!(response.failure_count, 2);
        assert!(response
            .results
            .iter()
            .all(|r| !r.success && r.error_code.as_deref() == Some("AUTH_FAILED")));
    }

    #[test]
    fn test_send_request_wire_format() {
        let body = serde_json::json!({
            "apiKey": "k",
            "to": "+91-9876543210",
            "message": "hi",
            "customerData": { "id": "1", "name": "John", "email": "john@example.com" }
        });
        let request: SendMessageRequest = serde_json::from_value(body).unwrap();
        assert_eq!(request.api_key.as_deref(), Some("k"));
        assert_eq!(request.customer_data.unwrap().name, "John");

        let result = DeliveryResult::delivered("+1", "msg_1");
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["deliveryStatus"], "sent");
        assert_eq!(json["messageId"], "msg_1");
        assert!(json.get("errorCode").is_none());
    }
}
