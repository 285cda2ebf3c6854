//! Simulated messaging vendor — the "third party" campaigns are sent through.
//!
//! Validates a static API key, enforces a fixed one-minute request window on
//! single sends, sleeps to mimic network latency, and delegates the outcome
//! of each message to a [`DeliveryStrategy`].

use crate::delivery::{DeliveryStrategy, SimulatedDelivery};
use chrono::Utc;
use crm_core::channels::{
    BatchSendRequest, BatchSendResponse, DeliveryResult, RateLimitUsage, SendMessageRequest,
    VendorHealth, VendorMessage,
};
use crm_core::config::VendorConfig;
use parking_lot::Mutex;
use rand::Rng;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

const RATE_WINDOW: Duration = Duration::from_secs(60);
const SERVICE_NAME: &str = "Dummy Vendor Messaging API";
const SERVICE_VERSION: &str = "1.0.0";

/// Requests the vendor refuses outright.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VendorError {
    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("Missing required fields: 'to' and 'message'")]
    MissingFields,

    #[error("Rate limit exceeded. Try again later.")]
    RateLimitExceeded,

    #[error("No messages provided")]
    EmptyBatch,

    #[error("Batch size exceeds maximum of {max} messages")]
    BatchTooLarge { max: usize },
}

impl VendorError {
    pub fn code(&self) -> &'static str {
        match self {
            VendorError::InvalidApiKey => "AUTH_FAILED",
            VendorError::MissingFields | VendorError::EmptyBatch => "INVALID_REQUEST",
            VendorError::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            VendorError::BatchTooLarge { .. } => "BATCH_TOO_LARGE",
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            VendorError::InvalidApiKey => 401,
            VendorError::RateLimitExceeded => 429,
            VendorError::MissingFields | VendorError::EmptyBatch | VendorError::BatchTooLarge { .. } => 400,
        }
    }

    /// Per-message failure result for a message caught by this rejection.
    pub fn into_result(&self, to: impl Into<String>) -> DeliveryResult {
        DeliveryResult::failed(to, self.to_string(), self.code())
    }

    /// Batch response reporting every message failed with this rejection.
    pub fn reject_batch(&self, messages: &[VendorMessage], campaign_id: Option<String>) -> BatchSendResponse {
        BatchSendResponse::rejected(messages, self.to_string(), self.code(), campaign_id)
    }
}

/// Fixed-window request counter. Rejected requests still count.
#[derive(Debug)]
struct UsageWindow {
    count: u32,
    started: Instant,
}

impl UsageWindow {
    fn new() -> Self {
        Self {
            count: 0,
            started: Instant::now(),
        }
    }
}

/// In-process vendor endpoint.
pub struct VendorService {
    config: VendorConfig,
    strategy: Arc<dyn DeliveryStrategy>,
    usage: Mutex<UsageWindow>,
}

impl VendorService {
    /// Vendor with the default random delivery strategy.
    pub fn new(config: VendorConfig) -> Self {
        let strategy = Arc::new(SimulatedDelivery::new(config.success_rate));
        Self::with_strategy(config, strategy)
    }

    pub fn with_strategy(config: VendorConfig, strategy: Arc<dyn DeliveryStrategy>) -> Self {
        info!(
            success_rate = config.success_rate,
            rate_limit_per_minute = config.rate_limit_per_minute,
            max_batch_size = config.max_batch_size,
            "Vendor simulator initialized"
        );
        Self {
            config,
            strategy,
            usage: Mutex::new(UsageWindow::new()),
        }
    }

    pub fn config(&self) -> &VendorConfig {
        &self.config
    }

    pub fn health(&self) -> VendorHealth {
        VendorHealth {
            status: "healthy".to_string(),
            service: SERVICE_NAME.to_string(),
            version: SERVICE_VERSION.to_string(),
            timestamp: Utc::now(),
            rate_limits: RateLimitUsage {
                requests_per_minute: self.config.rate_limit_per_minute,
                current_usage: self.usage.lock().count,
            },
        }
    }

    /// Send one message. `Ok` carries the delivery outcome, which may itself
    /// be a failure; `Err` means the request was refused before delivery.
    pub async fn send_message(&self, request: SendMessageRequest) -> Result<DeliveryResult, VendorError> {
        self.authorize(request.api_key.as_deref())?;

        let (to, body) = match (request.to, request.message) {
            (Some(to), Some(body)) if !to.is_empty() && !body.is_empty() => (to, body),
            _ => {
                metrics::counter!("vendor.rejected", "reason" => "invalid_request").increment(1);
                return Err(VendorError::MissingFields);
            }
        };

        if !self.record_request() {
            warn!(to = %to, "Vendor rate limit exceeded");
            metrics::counter!("vendor.rejected", "reason" => "rate_limited").increment(1);
            return Err(VendorError::RateLimitExceeded);
        }

        self.pause(self.config.min_latency_ms, self.config.max_latency_ms).await;

        let message = VendorMessage {
            to,
            message: body,
            customer_data: request.customer_data,
        };
        let result = self.strategy.send(&message).await;
        record_outcome(&result);
        Ok(result)
    }

    /// Send a batch sequentially. Individual failures are reported in the
    /// results; `Err` means the whole batch was refused.
    pub async fn batch_send(&self, request: BatchSendRequest) -> Result<BatchSendResponse, VendorError> {
        self.authorize(request.api_key.as_deref())?;

        if request.messages.is_empty() {
            return Err(VendorError::EmptyBatch);
        }
        if request.messages.len() > self.config.max_batch_size {
            warn!(
                size = request.messages.len(),
                max = self.config.max_batch_size,
                "Vendor batch too large"
            );
            metrics::counter!("vendor.rejected", "reason" => "batch_too_large").increment(1);
            return Err(VendorError::BatchTooLarge {
                max: self.config.max_batch_size,
            });
        }

        info!(
            messages = request.messages.len(),
            campaign_id = ?request.campaign_id,
            "Vendor batch accepted"
        );

        self.pause(self.config.batch_min_latency_ms, self.config.batch_max_latency_ms)
            .await;

        let mut results = Vec::with_capacity(request.messages.len());
        for (i, message) in request.messages.iter().enumerate() {
            if i > 0 && self.config.inter_message_delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.config.inter_message_delay_ms)).await;
            }
            let result = self.strategy.send(message).await;
            record_outcome(&result);
            results.push(result);
        }

        let response = BatchSendResponse::from_results(results, request.campaign_id);
        debug!(
            total = response.total_messages,
            succeeded = response.success_count,
            failed = response.failure_count,
            "Vendor batch processed"
        );
        Ok(response)
    }

    fn authorize(&self, api_key: Option<&str>) -> Result<(), VendorError> {
        match api_key {
            Some(key) if key == self.config.api_key => Ok(()),
            _ => {
                warn!("Vendor request with invalid API key");
                metrics::counter!("vendor.rejected", "reason" => "auth_failed").increment(1);
                Err(VendorError::InvalidApiKey)
            }
        }
    }

    /// Count a request against the current window. Returns false once the
    /// window's allowance is used up.
    fn record_request(&self) -> bool {
        let mut usage = self.usage.lock();
        if usage.started.elapsed() > RATE_WINDOW {
            *usage = UsageWindow::new();
        }
        usage.count += 1;
        usage.count <= self.config.rate_limit_per_minute
    }

    async fn pause(&self, min_ms: u64, max_ms: u64) {
        let delay_ms = if max_ms > min_ms {
            rand::thread_rng().gen_range(min_ms..=max_ms)
        } else {
            min_ms
        };
        if delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }
    }
}

fn record_outcome(result: &DeliveryResult) {
    if result.success {
        metrics::counter!("vendor.messages", "outcome" => "sent").increment(1);
    } else {
        metrics::counter!(
            "vendor.messages",
            "outcome" => "failed",
            "code" => result.error_code.clone().unwrap_or_default()
        )
        .increment(1);
    }
}
