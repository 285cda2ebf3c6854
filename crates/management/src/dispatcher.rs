//! Campaign dispatcher — drives a campaign through
//! `draft → sending → completed | failed`.
//!
//! A send resolves the target segment, matches every customer against its
//! rule, hands the resulting messages to the vendor as one batch, then
//! folds the per-message results back into campaign counters and logs.

use chrono::Utc;
use crm_channels::VendorService;
use crm_core::channels::{BatchSendRequest, CustomerData, DeliveryResult, VendorMessage};
use crm_core::types::{Campaign, CampaignLog, CampaignStatus, Customer, LogStatus};
use crm_core::{CrmError, CrmResult};
use crm_segmentation::SegmentMatcher;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::store::CrmStore;

/// Per-send delivery totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeliverySummary {
    pub sent: u64,
    pub failed: u64,
    pub total: u64,
}

#[derive(Debug, Clone)]
pub struct SendOutcome {
    pub campaign: Campaign,
    pub delivery_results: DeliverySummary,
    /// False when the segment matched nobody and the vendor was skipped.
    pub vendor_api_used: bool,
}

#[derive(Clone)]
pub struct CampaignDispatcher {
    store: CrmStore,
    matcher: SegmentMatcher,
    vendor: Arc<VendorService>,
    api_key: String,
}

impl CampaignDispatcher {
    /// Dispatcher that authenticates to `vendor` with its own configured key.
    pub fn new(store: CrmStore, vendor: Arc<VendorService>) -> Self {
        let api_key = vendor.config().api_key.clone();
        Self::with_api_key(store, vendor, api_key)
    }

    pub fn with_api_key(store: CrmStore, vendor: Arc<VendorService>, api_key: impl Into<String>) -> Self {
        Self {
            store,
            matcher: SegmentMatcher::new(),
            vendor,
            api_key: api_key.into(),
        }
    }

    /// Send a campaign to its segment.
    ///
    /// Fails with `NotFound` for an unknown campaign and `Conflict` while a
    /// previous send is still in flight; neither mutates the campaign. Any
    /// later error leaves the campaign `failed`.
    ///
    /// The send runs on its own task, so dropping the returned future does
    /// not abandon a campaign in `sending`.
    pub async fn send(&self, campaign_id: Uuid) -> CrmResult<SendOutcome> {
        let dispatcher = self.clone();
        let task = tokio::spawn(async move { dispatcher.run(campaign_id).await });
        match task.await {
            Ok(result) => result,
            Err(join_err) => {
                error!(campaign_id = %campaign_id, error = %join_err, "Campaign send task aborted");
                metrics::counter!("dispatch.campaigns", "status" => "failed").increment(1);
                self.mark_failed(campaign_id).await;
                Err(CrmError::Internal(anyhow::anyhow!(
                    "campaign send task aborted: {}",
                    join_err
                )))
            }
        }
    }

    async fn run(&self, campaign_id: Uuid) -> CrmResult<SendOutcome> {
        let mut campaign = self
            .store
            .campaigns
            .get(campaign_id)
            .await?
            .ok_or_else(|| CrmError::NotFound("Campaign not found".into()))?;
        if campaign.status == CampaignStatus::Sending {
            warn!(campaign_id = %campaign_id, "Campaign send already in progress");
            return Err(CrmError::Conflict("Campaign is already being sent".into()));
        }

        campaign.set_status(CampaignStatus::Sending);
        self.save(&campaign).await?;
        let started = Instant::now();
        info!(campaign_id = %campaign_id, segment_id = %campaign.segment_id, "Campaign send started");

        match self.deliver(&mut campaign).await {
            Ok(outcome) => {
                metrics::counter!("dispatch.campaigns", "status" => "completed").increment(1);
                metrics::histogram!("dispatch.duration_seconds").record(started.elapsed().as_secs_f64());
                Ok(outcome)
            }
            Err(err) => {
                error!(campaign_id = %campaign_id, error = %err, "Campaign send failed");
                metrics::counter!("dispatch.campaigns", "status" => "failed").increment(1);
                campaign.set_status(CampaignStatus::Failed);
                if let Err(save_err) = self.save(&campaign).await {
                    error!(campaign_id = %campaign_id, error = %save_err, "Could not mark campaign failed");
                }
                Err(err)
            }
        }
    }

    /// Move a campaign left in `sending` by an aborted task to `failed`.
    async fn mark_failed(&self, campaign_id: Uuid) {
        let mut campaign = match self.store.campaigns.get(campaign_id).await {
            Ok(Some(campaign)) if campaign.status == CampaignStatus::Sending => campaign,
            Ok(_) => return,
            Err(err) => {
                error!(campaign_id = %campaign_id, error = %err, "Could not load aborted campaign");
                return;
            }
        };
        campaign.set_status(CampaignStatus::Failed);
        if let Err(err) = self.save(&campaign).await {
            error!(campaign_id = %campaign_id, error = %err, "Could not mark campaign failed");
        }
    }

    async fn deliver(&self, campaign: &mut Campaign) -> CrmResult<SendOutcome> {
        let segment = self
            .store
            .segments
            .get(campaign.segment_id)
            .await?
            .ok_or_else(|| CrmError::NotFound("Target segment not found".into()))?;

        let customers = self.store.customers.list().await?;
        let targets = self.matcher.match_customers(&customers, Some(&segment.parsed_rule));
        let messages: Vec<VendorMessage> = targets
            .iter()
            .map(|c| VendorMessage {
                to: c.phone.clone(),
                message: campaign.message.clone(),
                customer_data: Some(CustomerData {
                    id: c.id.to_string(),
                    name: c.name.clone(),
                    email: c.email.clone(),
                }),
            })
            .collect();

        let vendor_api_used = !messages.is_empty();
        let results = if vendor_api_used {
            self.call_vendor(campaign, messages).await
        } else {
            info!(campaign_id = %campaign.id, "Segment matched no customers, vendor skipped");
            Vec::new()
        };

        let sent = results.iter().filter(|r| r.success).count() as u64;
        let summary = DeliverySummary {
            sent,
            failed: results.len() as u64 - sent,
            total: results.len() as u64,
        };

        campaign.sent_count += summary.sent;
        campaign.failed_count += summary.failed;
        campaign.set_status(CampaignStatus::Completed);
        self.save(campaign).await?;

        for result in &results {
            self.store
                .logs
                .insert(log_entry(campaign.id, result, &targets))
                .await?;
        }

        metrics::counter!("dispatch.messages", "outcome" => "sent").increment(summary.sent);
        metrics::counter!("dispatch.messages", "outcome" => "failed").increment(summary.failed);
        info!(
            campaign_id = %campaign.id,
            sent = summary.sent,
            failed = summary.failed,
            total = summary.total,
            "Campaign send completed"
        );

        Ok(SendOutcome {
            campaign: campaign.clone(),
            delivery_results: summary,
            vendor_api_used,
        })
    }

    /// One batch call. A refused batch becomes one failed result per message.
    async fn call_vendor(&self, campaign: &Campaign, messages: Vec<VendorMessage>) -> Vec<DeliveryResult> {
        let campaign_ref = Some(campaign.id.to_string());
        let request = BatchSendRequest {
            api_key: Some(self.api_key.clone()),
            messages: messages.clone(),
            campaign_id: campaign_ref.clone(),
        };
        match self.vendor.batch_send(request).await {
            Ok(response) => response.results,
            Err(err) => {
                warn!(
                    campaign_id = %campaign.id,
                    code = err.code(),
                    error = %err,
                    "Vendor rejected campaign batch"
                );
                err.reject_batch(&messages, campaign_ref).results
            }
        }
    }

    async fn save(&self, campaign: &Campaign) -> CrmResult<()> {
        if self.store.campaigns.update(campaign.clone()).await? {
            Ok(())
        } else {
            Err(CrmError::NotFound("Campaign not found".into()))
        }
    }
}

/// Log row for one result, attributed to the first targeted customer with
/// the recipient phone number.
fn log_entry(campaign_id: Uuid, result: &DeliveryResult, customers: &[Customer]) -> CampaignLog {
    let customer = customers.iter().find(|c| c.phone == result.to);
    CampaignLog {
        id: Uuid::new_v4(),
        campaign_id,
        customer_id: customer.map(|c| c.id),
        customer_name: customer.map(|c| c.name.clone()).unwrap_or_default(),
        customer_email: customer.map(|c| c.email.clone()).unwrap_or_default(),
        customer_phone: result.to.clone(),
        status: if result.success { LogStatus::Sent } else { LogStatus::Failed },
        timestamp: Utc::now(),
        error_message: result.error.clone(),
        delivery_attempts: result.retry_count.unwrap_or(0).max(1),
        vendor_message_id: result.message_id.clone(),
        vendor_error_code: result.error_code.clone(),
    }
}
