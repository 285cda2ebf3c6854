//! CRM backend — customers, segments, campaigns, and delivery logs.
//!
//! Provides the REST endpoints behind the dashboard plus the campaign
//! dispatch pipeline. Storage goes through the `Repository` abstraction;
//! the bundled implementation is in-memory (DashMap).

pub mod dispatcher;
pub mod error;
pub mod handlers;
pub mod models;
pub mod router;
pub mod service;
pub mod store;

pub use dispatcher::{CampaignDispatcher, DeliverySummary, SendOutcome};
pub use error::ApiError;
pub use handlers::ManagementState;
pub use router::crm_router;
pub use service::CrmService;
pub use store::{CrmStore, InMemoryRepository, Repository, RepositoryError};
