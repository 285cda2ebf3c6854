//! Repository abstraction and the in-memory DashMap implementation.
//!
//! Callers only see `Arc<dyn Repository<T>>`, so a persistent backend can
//! replace the in-memory one without touching the service or dispatcher.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use crm_core::types::{Campaign, CampaignLog, CampaignStatus, Customer, Entity, LogStatus};
use crm_core::CrmError;
use crm_segmentation::{ParsedRule, RuleField, RuleOperator, Segment, SegmentMatcher};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("duplicate id: {0}")]
    DuplicateId(Uuid),

    #[error("storage backend error: {0}")]
    Backend(String),
}

impl From<RepositoryError> for CrmError {
    fn from(err: RepositoryError) -> Self {
        CrmError::Repository(err.to_string())
    }
}

/// Basic keyed storage for one entity type.
#[async_trait]
pub trait Repository<T: Send + Sync + 'static>: Send + Sync {
    async fn get(&self, id: Uuid) -> Result<Option<T>, RepositoryError>;

    /// All records, oldest first.
    async fn list(&self) -> Result<Vec<T>, RepositoryError>;

    async fn insert(&self, item: T) -> Result<(), RepositoryError>;

    /// Replace an existing record. Returns false when the id is unknown.
    async fn update(&self, item: T) -> Result<bool, RepositoryError>;

    /// Remove a record, returning it if it existed.
    async fn delete(&self, id: Uuid) -> Result<Option<T>, RepositoryError>;
}

/// Non-durable repository. Concurrent writers to the same record race
/// with last-write-wins.
pub struct InMemoryRepository<T> {
    items: DashMap<Uuid, T>,
}

impl<T> InMemoryRepository<T> {
    pub fn new() -> Self {
        Self {
            items: DashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T> Default for InMemoryRepository<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T> Repository<T> for InMemoryRepository<T>
where
    T: Entity + Clone + Send + Sync + 'static,
{
    async fn get(&self, id: Uuid) -> Result<Option<T>, RepositoryError> {
        Ok(self.items.get(&id).map(|r| r.value().clone()))
    }

    async fn list(&self) -> Result<Vec<T>, RepositoryError> {
        let mut items: Vec<T> = self.items.iter().map(|r| r.value().clone()).collect();
        items.sort_by_key(|item| item.created_at());
        Ok(items)
    }

    async fn insert(&self, item: T) -> Result<(), RepositoryError> {
        match self.items.entry(item.id()) {
            Entry::Occupied(entry) => Err(RepositoryError::DuplicateId(*entry.key())),
            Entry::Vacant(entry) => {
                entry.insert(item);
                Ok(())
            }
        }
    }

    async fn update(&self, item: T) -> Result<bool, RepositoryError> {
        match self.items.get_mut(&item.id()) {
            Some(mut entry) => {
                *entry.value_mut() = item;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<Option<T>, RepositoryError> {
        Ok(self.items.remove(&id).map(|(_, item)| item))
    }
}

/// The four repositories the CRM works against.
#[derive(Clone)]
pub struct CrmStore {
    pub customers: Arc<dyn Repository<Customer>>,
    pub segments: Arc<dyn Repository<Segment>>,
    pub campaigns: Arc<dyn Repository<Campaign>>,
    pub logs: Arc<dyn Repository<CampaignLog>>,
}

impl CrmStore {
    pub fn new(
        customers: Arc<dyn Repository<Customer>>,
        segments: Arc<dyn Repository<Segment>>,
        campaigns: Arc<dyn Repository<Campaign>>,
        logs: Arc<dyn Repository<CampaignLog>>,
    ) -> Self {
        Self {
            customers,
            segments,
            campaigns,
            logs,
        }
    }

    pub fn in_memory() -> Self {
        info!("CRM store initialized (in-memory, development mode)");
        Self::new(
            Arc::new(InMemoryRepository::<Customer>::new()),
            Arc::new(InMemoryRepository::<Segment>::new()),
            Arc::new(InMemoryRepository::<Campaign>::new()),
            Arc::new(InMemoryRepository::<CampaignLog>::new()),
        )
    }

    /// Load the demo dataset: three customers, two segments, two completed
    /// campaigns, and their sample logs.
    pub async fn seed_demo_data(&self, matcher: &SegmentMatcher) -> Result<(), RepositoryError> {
        let customers = vec![
            seeded_customer(
                "John Doe",
                "john@example.com",
                "+91-9876543210",
                15000.0,
                "2024-01-15",
                "Mumbai",
                at(2024, 1, 1, 0, 0),
            ),
            seeded_customer(
                "Jane Smith",
                "jane@example.com",
                "+91-9876543211",
                8500.0,
                "2023-11-20",
                "Delhi",
                at(2023, 10, 1, 0, 0),
            ),
            seeded_customer(
                "Bob Johnson",
                "bob@example.com",
                "+91-9876543212",
                25000.0,
                "2024-01-10",
                "Bangalore",
                at(2023, 12, 1, 0, 0),
            ),
        ];
        for customer in &customers {
            self.customers.insert(customer.clone()).await?;
        }

        let mut high_value = Segment::new(
            "High Value Customers",
            "spend > ₹10,000",
            ParsedRule::total_spend(RuleOperator::GreaterThan, 10000),
        );
        high_value.created_at = at(2024, 1, 10, 0, 0);
        let mut inactive = Segment::new(
            "Inactive Customers",
            "last_purchase_date older than 3 months",
            ParsedRule::new(
                RuleField::LastPurchaseDate,
                RuleOperator::LessThan,
                serde_json::Value::from("2023-10-01"),
            ),
        );
        inactive.created_at = at(2024, 1, 8, 0, 0);
        for segment in [&mut high_value, &mut inactive] {
            segment.customer_count = matcher.count_matches(&customers, Some(&segment.parsed_rule));
            segment.updated_at = segment.created_at;
            self.segments.insert(segment.clone()).await?;
        }

        let summer = seeded_campaign(
            "Summer Sale Campaign",
            "Get 20% OFF on all summer collection! Use code SUMMER20. Valid till July 31st.",
            &high_value,
            (45, 3),
            at(2024, 1, 15, 0, 0),
        );
        let win_back = seeded_campaign(
            "Win-back Campaign",
            "We miss you! Come back and get 15% OFF your next purchase. Use code COMEBACK15.",
            &inactive,
            (89, 12),
            at(2024, 1, 10, 0, 0),
        );
        self.campaigns.insert(summer.clone()).await?;
        self.campaigns.insert(win_back).await?;

        let logs = [
            (&customers[0], LogStatus::Sent, None, 1, at(2024, 1, 15, 10, 30)),
            (
                &customers[1],
                LogStatus::Failed,
                Some("Invalid phone number format".to_string()),
                3,
                at(2024, 1, 15, 10, 30) + chrono::Duration::seconds(5),
            ),
        ];
        for (customer, status, error_message, attempts, timestamp) in logs {
            self.logs
                .insert(CampaignLog {
                    id: Uuid::new_v4(),
                    campaign_id: summer.id,
                    customer_id: Some(customer.id),
                    customer_name: customer.name.clone(),
                    customer_email: customer.email.clone(),
                    customer_phone: customer.phone.clone(),
                    status,
                    timestamp,
                    error_message,
                    delivery_attempts: attempts,
                    vendor_message_id: None,
                    vendor_error_code: None,
                })
                .await?;
        }

        info!(
            customers = customers.len(),
            segments = 2,
            campaigns = 2,
            "Demo data seeded"
        );
        Ok(())
    }
}

fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, minute, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

fn seeded_customer(
    name: &str,
    email: &str,
    phone: &str,
    spend: f64,
    last_purchase: &str,
    location: &str,
    created_at: DateTime<Utc>,
) -> Customer {
    let mut customer = Customer::new(name, email, phone, spend, location).with_last_purchase(last_purchase);
    customer.created_at = created_at;
    customer.updated_at = created_at;
    customer
}

fn seeded_campaign(
    name: &str,
    message: &str,
    segment: &Segment,
    (sent, failed): (u64, u64),
    created_at: DateTime<Utc>,
) -> Campaign {
    let mut campaign = Campaign::new(name, message, segment.id, segment.name.clone());
    campaign.sent_count = sent;
    campaign.failed_count = failed;
    campaign.status = CampaignStatus::Completed;
    campaign.created_at = created_at;
    campaign.updated_at = created_at;
    campaign
}
