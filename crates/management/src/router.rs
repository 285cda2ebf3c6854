//! CRM router — mounts customer, segment, campaign, and log endpoints under /api.

use crate::handlers::{self, ManagementState};
use axum::routing::{get, post};
use axum::Router;

/// Build the CRM router. Merge into the main app.
pub fn crm_router(state: ManagementState) -> Router {
    Router::new()
        // Customers
        .route("/api/customers", get(handlers::list_customers).post(handlers::create_customer))
        .route("/api/customers/:id", get(handlers::get_customer).put(handlers::update_customer).delete(handlers::delete_customer))
        // Segments
        .route("/api/segments", get(handlers::list_segments).post(handlers::create_segment))
        .route("/api/segments/:id", get(handlers::get_segment).put(handlers::update_segment).delete(handlers::delete_segment))
        // Campaign logs
        .route("/api/campaigns/logs", get(handlers::query_logs).post(handlers::create_log))
        // Campaigns
        .route("/api/campaigns", get(handlers::list_campaigns).post(handlers::create_campaign))
        .route("/api/campaigns/:id", get(handlers::get_campaign))
        .route("/api/campaigns/:id/send", post(handlers::send_campaign))
        .with_state(state)
}
