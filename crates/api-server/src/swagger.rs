//! OpenAPI document for the vendor and operational endpoints.

use axum::Json;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "CRM Express API",
        version = "0.1.0",
        description = "Customer management, rule-based segmentation, and campaign messaging through a simulated delivery vendor.",
        license(name = "MIT"),
    ),
    tags(
        (name = "Operations", description = "Health, readiness, and liveness probes"),
        (name = "Vendor", description = "Simulated third-party messaging vendor"),
    ),
    paths(
        // Operations
        crate::rest::health_check,
        crate::rest::readiness,
        crate::rest::liveness,
        // Vendor
        crate::vendor_rest::handle_send_message,
        crate::vendor_rest::handle_batch_send,
        crate::vendor_rest::handle_vendor_health,
    ),
    components(schemas(
        crate::rest::HealthResponse,
        crm_core::channels::CustomerData,
        crm_core::channels::VendorMessage,
        crm_core::channels::SendMessageRequest,
        crm_core::channels::BatchSendRequest,
        crm_core::channels::DeliveryStatus,
        crm_core::channels::DeliveryResult,
        crm_core::channels::BatchSendResponse,
        crm_core::channels::RateLimitUsage,
        crm_core::channels::VendorHealth,
    ))
)]
pub struct ApiDoc;

/// GET /api-docs/openapi.json
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
