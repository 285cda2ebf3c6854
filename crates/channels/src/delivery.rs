//! Per-message delivery strategies.

use async_trait::async_trait;
use chrono::Utc;
use crm_core::channels::{DeliveryResult, VendorMessage};
use rand::Rng;
use tracing::debug;

const MESSAGE_ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const MESSAGE_ID_SUFFIX_LEN: usize = 9;

/// Decides the outcome of handing one message to the carrier network.
#[async_trait]
pub trait DeliveryStrategy: Send + Sync {
    async fn send(&self, message: &VendorMessage) -> DeliveryResult;
}

/// Canned carrier failures. `retryable` is reported metadata only; nothing
/// in the pipeline retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VendorFailure {
    InvalidPhone,
    OptedOut,
    NetworkTimeout,
    CarrierRejected,
    DailyLimitExceeded,
    ContentBlocked,
}

impl VendorFailure {
    pub const ALL: [VendorFailure; 6] = [
        VendorFailure::InvalidPhone,
        VendorFailure::OptedOut,
        VendorFailure::NetworkTimeout,
        VendorFailure::CarrierRejected,
        VendorFailure::DailyLimitExceeded,
        VendorFailure::ContentBlocked,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            VendorFailure::InvalidPhone => "INVALID_PHONE",
            VendorFailure::OptedOut => "OPTED_OUT",
            VendorFailure::NetworkTimeout => "NETWORK_TIMEOUT",
            VendorFailure::CarrierRejected => "CARRIER_REJECTED",
            VendorFailure::DailyLimitExceeded => "DAILY_LIMIT_EXCEEDED",
            VendorFailure::ContentBlocked => "CONTENT_BLOCKED",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            VendorFailure::InvalidPhone => "Invalid phone number format",
            VendorFailure::OptedOut => "Customer has opted out of marketing messages",
            VendorFailure::NetworkTimeout => "Network timeout - please retry",
            VendorFailure::CarrierRejected => "Carrier rejected the message",
            VendorFailure::DailyLimitExceeded => "Daily sending limit exceeded for this number",
            VendorFailure::ContentBlocked => "Message content blocked by spam filter",
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            VendorFailure::NetworkTimeout | VendorFailure::DailyLimitExceeded
        )
    }

    pub fn into_result(self, to: impl Into<String>) -> DeliveryResult {
        DeliveryResult::failed(to, self.message(), self.code()).with_retry_count(0)
    }
}

/// Random outcome: success with a fixed probability, otherwise a uniformly
/// chosen [`VendorFailure`].
#[derive(Debug, Clone)]
pub struct SimulatedDelivery {
    success_rate: f64,
}

impl SimulatedDelivery {
    pub fn new(success_rate: f64) -> Self {
        Self {
            success_rate: success_rate.clamp(0.0, 1.0),
        }
    }

    pub fn success_rate(&self) -> f64 {
        self.success_rate
    }

    fn draw(&self, to: &str) -> DeliveryResult {
        let mut rng = rand::thread_rng();
        if rng.gen::<f64>() < self.success_rate {
            DeliveryResult::delivered(to, generate_message_id(&mut rng))
        } else {
            let failure = VendorFailure::ALL[rng.gen_range(0..VendorFailure::ALL.len())];
            failure.into_result(to)
        }
    }
}

#[async_trait]
impl DeliveryStrategy for SimulatedDelivery {
    async fn send(&self, message: &VendorMessage) -> DeliveryResult {
        let result = self.draw(&message.to);
        debug!(
            to = %message.to,
            success = result.success,
            error_code = ?result.error_code,
            "Simulated delivery"
        );
        result
    }
}

/// Synthetic vendor id: `msg_<epoch millis>_<9 base36 chars>`.
pub fn generate_message_id<R: Rng>(rng: &mut R) -> String {
    let suffix: String = (0..MESSAGE_ID_SUFFIX_LEN)
        .map(|_| MESSAGE_ID_ALPHABET[rng.gen_range(0..MESSAGE_ID_ALPHABET.len())] as char)
        .collect();
    format!("msg_{}_{}", Utc::now().timestamp_millis(), suffix)
}
