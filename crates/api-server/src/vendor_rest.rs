//! Simulated vendor REST endpoints — single send, batch send, health.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use crm_channels::{VendorError, VendorService};
use crm_core::channels::*;
use std::sync::Arc;
use tracing::warn;

/// Shared state for vendor endpoints.
#[derive(Clone)]
pub struct VendorState {
    pub vendor: Arc<VendorService>,
}

fn status_of(err: &VendorError) -> StatusCode {
    StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::BAD_REQUEST)
}

/// POST /api/vendor/send-message — Deliver one message.
///
/// A delivery the carrier refuses is still answered with the result body,
/// under status 400.
#[utoipa::path(
    post,
    path = "/api/vendor/send-message",
    tag = "Vendor",
    request_body = SendMessageRequest,
    responses(
        (status = 200, description = "Message delivered", body = DeliveryResult),
        (status = 400, description = "Missing fields or delivery failed", body = DeliveryResult),
        (status = 401, description = "Invalid API key", body = DeliveryResult),
        (status = 429, description = "Rate limit exceeded", body = DeliveryResult),
    )
)]
pub async fn handle_send_message(
    State(state): State<VendorState>,
    body: Result<Json<SendMessageRequest>, JsonRejection>,
) -> (StatusCode, Json<DeliveryResult>) {
    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => {
            warn!(error = %rejection.body_text(), "Malformed vendor send request");
            return (
                StatusCode::BAD_REQUEST,
                Json(VendorError::MissingFields.into_result("")),
            );
        }
    };
    let to = request.to.clone().unwrap_or_default();

    match state.vendor.send_message(request).await {
        Ok(result) if result.success => {
            metrics::counter!("api.vendor.requests", "endpoint" => "send_message", "outcome" => "sent").increment(1);
            (StatusCode::OK, Json(result))
        }
        Ok(result) => {
            metrics::counter!("api.vendor.requests", "endpoint" => "send_message", "outcome" => "failed").increment(1);
            (StatusCode::BAD_REQUEST, Json(result))
        }
        Err(err) => {
            metrics::counter!("api.vendor.requests", "endpoint" => "send_message", "outcome" => "rejected").increment(1);
            (status_of(&err), Json(err.into_result(to)))
        }
    }
}

/// POST /api/vendor/batch-send — Deliver a batch sequentially.
#[utoipa::path(
    post,
    path = "/api/vendor/batch-send",
    tag = "Vendor",
    request_body = BatchSendRequest,
    responses(
        (status = 200, description = "Batch processed", body = BatchSendResponse),
        (status = 400, description = "Empty or oversized batch", body = BatchSendResponse),
        (status = 401, description = "Invalid API key", body = BatchSendResponse),
    )
)]
pub async fn handle_batch_send(
    State(state): State<VendorState>,
    body: Result<Json<BatchSendRequest>, JsonRejection>,
) -> (StatusCode, Json<BatchSendResponse>) {
    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => {
            warn!(error = %rejection.body_text(), "Malformed vendor batch request");
            return (
                StatusCode::BAD_REQUEST,
                Json(BatchSendResponse::rejected(
                    &[],
                    rejection.body_text(),
                    "INVALID_REQUEST",
                    None,
                )),
            );
        }
    };
    let messages = request.messages.clone();
    let campaign_id = request.campaign_id.clone();

    match state.vendor.batch_send(request).await {
        Ok(response) => {
            metrics::counter!("api.vendor.requests", "endpoint" => "batch_send", "outcome" => "processed").increment(1);
            (StatusCode::OK, Json(response))
        }
        Err(err) => {
            metrics::counter!("api.vendor.requests", "endpoint" => "batch_send", "outcome" => "rejected").increment(1);
            (status_of(&err), Json(err.reject_batch(&messages, campaign_id)))
        }
    }
}

/// GET /api/vendor/send-message — Vendor health and rate-window usage.
#[utoipa::path(
    get,
    path = "/api/vendor/send-message",
    tag = "Vendor",
    responses((status = 200, description = "Vendor status", body = VendorHealth))
)]
pub async fn handle_vendor_health(State(state): State<VendorState>) -> Json<VendorHealth> {
    Json(state.vendor.health())
}
