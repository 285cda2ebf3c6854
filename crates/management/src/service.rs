//! CRM service — customer, segment, campaign, and log operations over the
//! repositories. Handlers stay thin and delegate here.

use chrono::Utc;
use crm_core::types::{Campaign, CampaignLog, Customer, LogStatus};
use crm_core::{CrmError, CrmResult};
use crm_segmentation::{ParsedRule, RuleParser, Segment, SegmentMatcher};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::parse_id;
use crate::models::*;
use crate::store::CrmStore;

pub struct CrmService {
    store: CrmStore,
    parser: Arc<dyn RuleParser>,
    matcher: SegmentMatcher,
    default_location: String,
}

impl CrmService {
    pub fn new(store: CrmStore, parser: Arc<dyn RuleParser>, default_location: impl Into<String>) -> Self {
        Self {
            store,
            parser,
            matcher: SegmentMatcher::new(),
            default_location: default_location.into(),
        }
    }

    // ─── Customers ─────────────────────────────────────────────────────────

    pub async fn list_customers(&self, query: CustomerQuery) -> CrmResult<CustomerPage> {
        let limit = query.limit.unwrap_or(DEFAULT_PAGE_LIMIT);
        let offset = query.offset.unwrap_or(0);
        let mut customers = self.store.customers.list().await?;

        if let Some(term) = query.search.as_deref().filter(|s| !s.is_empty()) {
            let needle = term.to_lowercase();
            customers.retain(|c| {
                c.name.to_lowercase().contains(&needle)
                    || c.email.to_lowercase().contains(&needle)
                    || c.phone.contains(term)
            });
        }

        let total = customers.len();
        let customers = customers.into_iter().skip(offset).take(limit).collect();
        Ok(CustomerPage {
            customers,
            total,
            limit,
            offset,
        })
    }

    pub async fn get_customer(&self, id: Uuid) -> CrmResult<Customer> {
        self.store
            .customers
            .get(id)
            .await?
            .ok_or_else(|| CrmError::NotFound("Customer not found".into()))
    }

    pub async fn create_customer(&self, req: CreateCustomerRequest) -> CrmResult<Customer> {
        let (Some(name), Some(email), Some(phone)) = (
            non_empty(req.name),
            non_empty(req.email),
            non_empty(req.phone),
        ) else {
            return Err(CrmError::Validation("Name, email, and phone are required".into()));
        };
        self.ensure_email_free(&email, None).await?;

        let total_spend = match req.total_spend {
            Some(value) => parse_spend(&value)?,
            None => 0.0,
        };
        let location = non_empty(req.location).unwrap_or_else(|| self.default_location.clone());
        let mut customer = Customer::new(name, email, phone, total_spend, location);
        customer.last_purchase_date = non_empty(req.last_purchase_date);

        self.store.customers.insert(customer.clone()).await?;
        metrics::counter!("crm.customers.created").increment(1);
        info!(customer_id = %customer.id, "Customer created");
        Ok(customer)
    }

    pub async fn update_customer(&self, id: Uuid, req: UpdateCustomerRequest) -> CrmResult<Customer> {
        let mut customer = self.get_customer(id).await?;

        if let Some(email) = non_empty(req.email) {
            self.ensure_email_free(&email, Some(id)).await?;
            customer.email = email;
        }
        if let Some(name) = non_empty(req.name) {
            customer.name = name;
        }
        if let Some(phone) = non_empty(req.phone) {
            customer.phone = phone;
        }
        if let Some(value) = req.total_spend {
            customer.total_spend = parse_spend(&value)?;
        }
        if let Some(date) = req.last_purchase_date {
            customer.last_purchase_date = Some(date).filter(|d| !d.is_empty());
        }
        if let Some(location) = non_empty(req.location) {
            customer.location = location;
        }
        customer.updated_at = Utc::now();

        if !self.store.customers.update(customer.clone()).await? {
            return Err(CrmError::NotFound("Customer not found".into()));
        }
        metrics::counter!("crm.customers.updated").increment(1);
        Ok(customer)
    }

    pub async fn delete_customer(&self, id: Uuid) -> CrmResult<Customer> {
        let customer = self
            .store
            .customers
            .delete(id)
            .await?
            .ok_or_else(|| CrmError::NotFound("Customer not found".into()))?;
        metrics::counter!("crm.customers.deleted").increment(1);
        info!(customer_id = %id, "Customer deleted");
        Ok(customer)
    }

    async fn ensure_email_free(&self, email: &str, except: Option<Uuid>) -> CrmResult<()> {
        let taken = self
            .store
            .customers
            .list()
            .await?
            .iter()
            .any(|c| Some(c.id) != except && c.email.eq_ignore_ascii_case(email));
        if taken {
            return Err(CrmError::Conflict("Customer with this email already exists".into()));
        }
        Ok(())
    }

    // ─── Segments ──────────────────────────────────────────────────────────

    pub async fn list_segments(&self) -> CrmResult<Vec<Segment>> {
        Ok(self.store.segments.list().await?)
    }

    pub async fn get_segment(&self, id: Uuid) -> CrmResult<Segment> {
        self.store
            .segments
            .get(id)
            .await?
            .ok_or_else(|| CrmError::NotFound("Segment not found".into()))
    }

    pub async fn create_segment(&self, req: CreateSegmentRequest) -> CrmResult<Segment> {
        let (Some(name), Some(rule_text)) = (non_empty(req.name), non_empty(req.rule_text)) else {
            return Err(CrmError::Validation("Name and rule text are required".into()));
        };
        let rule = self.parser.parse(&rule_text);
        let mut segment = Segment::new(name, rule_text, rule);
        segment.customer_count = self.count_customers(&segment.parsed_rule).await?;

        self.store.segments.insert(segment.clone()).await?;
        metrics::counter!("crm.segments.created").increment(1);
        info!(
            segment_id = %segment.id,
            customer_count = segment.customer_count,
            "Segment created"
        );
        Ok(segment)
    }

    pub async fn update_segment(&self, id: Uuid, req: UpdateSegmentRequest) -> CrmResult<Segment> {
        let mut segment = self.get_segment(id).await?;
        if let Some(name) = non_empty(req.name) {
            segment.name = name;
        }
        if let Some(rule_text) = non_empty(req.rule_text) {
            segment.parsed_rule = self.parser.parse(&rule_text);
            segment.rule_text = rule_text;
        }
        segment.customer_count = self.count_customers(&segment.parsed_rule).await?;
        segment.updated_at = Utc::now();

        if !self.store.segments.update(segment.clone()).await? {
            return Err(CrmError::NotFound("Segment not found".into()));
        }
        metrics::counter!("crm.segments.updated").increment(1);
        Ok(segment)
    }

    /// Campaigns that target the segment keep their dangling reference.
    pub async fn delete_segment(&self, id: Uuid) -> CrmResult<Segment> {
        let segment = self
            .store
            .segments
            .delete(id)
            .await?
            .ok_or_else(|| CrmError::NotFound("Segment not found".into()))?;
        metrics::counter!("crm.segments.deleted").increment(1);
        info!(segment_id = %id, "Segment deleted");
        Ok(segment)
    }

    async fn count_customers(&self, rule: &ParsedRule) -> CrmResult<usize> {
        let customers = self.store.customers.list().await?;
        Ok(self.matcher.count_matches(&customers, Some(rule)))
    }

    // ─── Campaigns ─────────────────────────────────────────────────────────

    pub async fn list_campaigns(&self) -> CrmResult<Vec<Campaign>> {
        Ok(self.store.campaigns.list().await?)
    }

    pub async fn get_campaign(&self, id: Uuid) -> CrmResult<Campaign> {
        self.store
            .campaigns
            .get(id)
            .await?
            .ok_or_else(|| CrmError::NotFound("Campaign not found".into()))
    }

    pub async fn create_campaign(&self, req: CreateCampaignRequest) -> CrmResult<Campaign> {
        let (Some(name), Some(message), Some(segment_id)) = (
            non_empty(req.name),
            non_empty(req.message),
            non_empty(req.segment_id),
        ) else {
            return Err(CrmError::Validation("Name, message, and segment ID are required".into()));
        };
        let segment = self.get_segment(parse_id(&segment_id, "Segment")?).await?;

        let campaign = Campaign::new(name, message, segment.id, segment.name);
        self.store.campaigns.insert(campaign.clone()).await?;
        metrics::counter!("crm.campaigns.created").increment(1);
        info!(campaign_id = %campaign.id, segment_id = %segment.id, "Campaign created");
        Ok(campaign)
    }

    // ─── Logs ──────────────────────────────────────────────────────────────

    /// Logs newest first, filtered by campaign and status.
    pub async fn query_logs(&self, query: LogQuery) -> CrmResult<LogPage> {
        let limit = query.limit.unwrap_or(DEFAULT_PAGE_LIMIT);
        let offset = query.offset.unwrap_or(0);
        let status = match query.status.as_deref() {
            None | Some("") | Some("all") => None,
            Some(raw) => Some(
                LogStatus::parse(raw)
                    .ok_or_else(|| CrmError::Validation(format!("Invalid status filter: {}", raw)))?,
            ),
        };

        let mut logs = self.store.logs.list().await?;
        if let Some(campaign_id) = query.campaign_id.as_deref().filter(|s| !s.is_empty()) {
            logs.retain(|log| log.campaign_id.to_string() == campaign_id);
        }
        if let Some(status) = status {
            logs.retain(|log| log.status == status);
        }
        logs.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        let total = logs.len();
        let logs: Vec<CampaignLog> = logs.into_iter().skip(offset).take(limit).collect();
        debug!(total, returned = logs.len(), "Log query");
        Ok(LogPage {
            logs,
            pagination: Pagination {
                total,
                limit,
                offset,
                has_more: offset.saturating_add(limit) < total,
            },
        })
    }

    pub async fn create_log(&self, req: CreateLogRequest) -> CrmResult<CampaignLog> {
        let (Some(campaign_id), Some(status)) = (non_empty(req.campaign_id), non_empty(req.status)) else {
            return Err(CrmError::Validation("Campaign ID and status are required".into()));
        };
        let campaign_id = Uuid::parse_str(&campaign_id)
            .map_err(|_| CrmError::Validation("Invalid campaign ID".into()))?;
        let status = LogStatus::parse(&status)
            .ok_or_else(|| CrmError::Validation(format!("Invalid status: {}", status)))?;
        let customer_id = match non_empty(req.customer_id) {
            Some(raw) => Some(
                Uuid::parse_str(&raw).map_err(|_| CrmError::Validation("Invalid customer ID".into()))?,
            ),
            None => None,
        };

        let log = CampaignLog {
            id: Uuid::new_v4(),
            campaign_id,
            customer_id,
            customer_name: req.customer_name.unwrap_or_default(),
            customer_email: req.customer_email.unwrap_or_default(),
            customer_phone: req.customer_phone.unwrap_or_default(),
            status,
            timestamp: req.timestamp.unwrap_or_else(Utc::now),
            error_message: req.error_message,
            delivery_attempts: req.delivery_attempts.unwrap_or(1),
            vendor_message_id: req.vendor_message_id,
            vendor_error_code: req.vendor_error_code,
        };
        self.store.logs.insert(log.clone()).await?;
        metrics::counter!("crm.logs.created").increment(1);
        Ok(log)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Accepts a JSON number or a string with a leading decimal number
/// ("1500", "1500.50 INR"). Null counts as zero.
fn parse_spend(value: &serde_json::Value) -> CrmResult<f64> {
    let invalid = || CrmError::Validation("totalSpend must be a number".into());
    match value {
        serde_json::Value::Null => Ok(0.0),
        serde_json::Value::Number(n) => n.as_f64().ok_or_else(invalid),
        serde_json::Value::String(s) => leading_number(s).ok_or_else(invalid),
        _ => Err(invalid()),
    }
}

fn leading_number(text: &str) -> Option<f64> {
    let text = text.trim_start();
    let mut end = 0;
    let mut seen_dot = false;
    for (i, c) in text.char_indices() {
        match c {
            '0'..='9' => end = i + 1,
            '.' if !seen_dot => seen_dot = true,
            '-' | '+' if i == 0 => {}
            _ => break,
        }
    }
    text[..end].parse().ok()
}
