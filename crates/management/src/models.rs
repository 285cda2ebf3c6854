//! Request and response bodies for the CRM management API.

use chrono::{DateTime, Utc};
use crm_core::types::{Campaign, CampaignLog, Customer};
use crm_segmentation::Segment;
use serde::{Deserialize, Serialize};

use crate::dispatcher::DeliverySummary;

pub const DEFAULT_PAGE_LIMIT: usize = 50;

// ─── Customers ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCustomerRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    /// Number or numeric string.
    pub total_spend: Option<serde_json::Value>,
    pub last_purchase_date: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCustomerRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub total_spend: Option<serde_json::Value>,
    pub last_purchase_date: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomerQuery {
    pub search: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CustomerPage {
    pub customers: Vec<Customer>,
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeletedCustomerResponse {
    pub message: String,
    pub customer: Customer,
}

// ─── Segments ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSegmentRequest {
    pub name: Option<String>,
    pub rule_text: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSegmentRequest {
    pub name: Option<String>,
    pub rule_text: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SegmentsResponse {
    pub segments: Vec<Segment>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SegmentResponse {
    pub segment: Segment,
}

// ─── Campaigns ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCampaignRequest {
    pub name: Option<String>,
    pub message: Option<String>,
    pub segment_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CampaignsResponse {
    pub campaigns: Vec<Campaign>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CampaignResponse {
    pub campaign: Campaign,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendCampaignResponse {
    pub campaign: Campaign,
    pub delivery_results: DeliverySummary,
    pub vendor_api_used: bool,
}

// ─── Logs ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogQuery {
    pub campaign_id: Option<String>,
    /// `sent`, `failed`, or `all`.
    pub status: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLogRequest {
    pub campaign_id: Option<String>,
    pub customer_id: Option<String>,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub status: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub delivery_attempts: Option<u32>,
    pub vendor_message_id: Option<String>,
    pub vendor_error_code: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
    pub has_more: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct LogPage {
    pub logs: Vec<CampaignLog>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Serialize)]
pub struct LogResponse {
    pub log: CampaignLog,
}

// ─── Common ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}
