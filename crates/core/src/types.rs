//! Core CRM domain types — customers, campaigns, and delivery logs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A stored record addressable by id. Repositories order listings by
/// creation time.
pub trait Entity {
    fn id(&self) -> Uuid;
    fn created_at(&self) -> DateTime<Utc>;
}

// ─── Customer ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub total_spend: f64,
    /// Date text exactly as entered (`YYYY-MM-DD` expected, not enforced).
    pub last_purchase_date: Option<String>,
    pub location: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        phone: impl Into<String>,
        total_spend: f64,
        location: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            email: email.into(),
            phone: phone.into(),
            total_spend,
            last_purchase_date: None,
            location: location.into(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_last_purchase(mut self, date: impl Into<String>) -> Self {
        self.last_purchase_date = Some(date.into());
        self
    }
}

impl Entity for Customer {
    fn id(&self) -> Uuid {
        self.id
    }
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

// ─── Campaign ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Campaign {
    pub id: Uuid,
    pub name: String,
    pub message: String,
    pub segment_id: Uuid,
    pub segment_name: String,
    pub sent_count: u64,
    pub failed_count: u64,
    pub status: CampaignStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// `draft -> sending -> completed | failed`. A campaign may be sent again
/// from any state except `sending`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    Draft,
    Sending,
    Completed,
    Failed,
}

impl Campaign {
    pub fn new(
        name: impl Into<String>,
        message: impl Into<String>,
        segment_id: Uuid,
        segment_name: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            message: message.into(),
            segment_id,
            segment_name: segment_name.into(),
            sent_count: 0,
            failed_count: 0,
            status: CampaignStatus::Draft,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn set_status(&mut self, status: CampaignStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }
}

impl Entity for Campaign {
    fn id(&self) -> Uuid {
        self.id
    }
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

// ─── Campaign Log ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LogStatus {
    Sent,
    Failed,
}

impl LogStatus {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "sent" => Some(LogStatus::Sent),
            "failed" => Some(LogStatus::Failed),
            _ => None,
        }
    }
}

/// One delivery attempt against one customer, referenced by campaign id
/// without any integrity check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignLog {
    pub id: Uuid,
    pub campaign_id: Uuid,
    pub customer_id: Option<Uuid>,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub status: LogStatus,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub delivery_attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor_message_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor_error_code: Option<String>,
}

impl Entity for CampaignLog {
    fn id(&self) -> Uuid {
        self.id
    }
    fn created_at(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_customer_serializes_camel_case() {
        let customer = Customer::new("John Doe", "john@example.com", "+91-9876543210", 15000.0, "Mumbai")
            .with_last_purchase("2024-01-15");
        let json = serde_json::to_value(&customer).unwrap();
        assert_eq!(json["totalSpend"], 15000.0);
        assert_eq!(json["lastPurchaseDate"], "2024-01-15");
        assert_eq!(json["location"], "Mumbai");
        assert!(json.get("total_spend").is_none());
    }

    #[test]
    fn test_new_campaign_is_draft() {
        let segment_id = Uuid::new_v4();
        let campaign = Campaign::new("Summer Sale", "20% off", segment_id, "High Value");
        assert_eq!(campaign.status, CampaignStatus::Draft);
        assert_eq!(campaign.sent_count, 0);
        assert_eq!(campaign.failed_count, 0);
        assert_eq!(campaign.segment_id, segment_id);

        let json = serde_json::to_value(&campaign).unwrap();
        assert_eq!(json["status"], "draft");
        assert_eq!(json["segmentName"], "High Value");
    }

    #[test]
    fn test_log_status_parse() {
        assert_eq!(LogStatus::parse("sent"), Some(LogStatus::Sent));
        assert_eq!(LogStatus::parse("failed"), Some(LogStatus::Failed));
        assert_eq!(LogStatus::parse("all"), None);
    }
}
