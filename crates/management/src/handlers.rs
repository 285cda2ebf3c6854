//! Axum REST handlers for the CRM API.

use crate::dispatcher::CampaignDispatcher;
use crate::error::{parse_id, ApiError};
use crate::models::*;
use crate::service::CrmService;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use crm_core::types::{Campaign, Customer};
use std::sync::Arc;

/// Shared handler state.
#[derive(Clone)]
pub struct ManagementState {
    pub service: Arc<CrmService>,
    pub dispatcher: Arc<CampaignDispatcher>,
}

type ApiResult<T> = Result<T, ApiError>;

// ─── Customers ─────────────────────────────────────────────────────────────

pub async fn list_customers(
    State(state): State<ManagementState>,
    Query(query): Query<CustomerQuery>,
) -> ApiResult<Json<CustomerPage>> {
    Ok(Json(state.service.list_customers(query).await?))
}

pub async fn get_customer(
    State(state): State<ManagementState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Customer>> {
    let id = parse_id(&id, "Customer")?;
    Ok(Json(state.service.get_customer(id).await?))
}

pub async fn create_customer(
    State(state): State<ManagementState>,
    body: Result<Json<CreateCustomerRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Customer>)> {
    let Json(req) = body?;
    let customer = state.service.create_customer(req).await?;
    Ok((StatusCode::CREATED, Json(customer)))
}

pub async fn update_customer(
    State(state): State<ManagementState>,
    Path(id): Path<String>,
    body: Result<Json<UpdateCustomerRequest>, JsonRejection>,
) -> ApiResult<Json<Customer>> {
    let id = parse_id(&id, "Customer")?;
    let Json(req) = body?;
    Ok(Json(state.service.update_customer(id, req).await?))
}

pub async fn delete_customer(
    State(state): State<ManagementState>,
    Path(id): Path<String>,
) -> ApiResult<Json<DeletedCustomerResponse>> {
    let id = parse_id(&id, "Customer")?;
    let customer = state.service.delete_customer(id).await?;
    Ok(Json(DeletedCustomerResponse {
        message: "Customer deleted successfully".to_string(),
        customer,
    }))
}

// ─── Segments ──────────────────────────────────────────────────────────────

pub async fn list_segments(State(state): State<ManagementState>) -> ApiResult<Json<SegmentsResponse>> {
    let segments = state.service.list_segments().await?;
    Ok(Json(SegmentsResponse { segments }))
}

pub async fn get_segment(
    State(state): State<ManagementState>,
    Path(id): Path<String>,
) -> ApiResult<Json<SegmentResponse>> {
    let id = parse_id(&id, "Segment")?;
    let segment = state.service.get_segment(id).await?;
    Ok(Json(SegmentResponse { segment }))
}

pub async fn create_segment(
    State(state): State<ManagementState>,
    body: Result<Json<CreateSegmentRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<SegmentResponse>)> {
    let Json(req) = body?;
    let segment = state.service.create_segment(req).await?;
    Ok((StatusCode::CREATED, Json(SegmentResponse { segment })))
}

pub async fn update_segment(
    State(state): State<ManagementState>,
    Path(id): Path<String>,
    body: Result<Json<UpdateSegmentRequest>, JsonRejection>,
) -> ApiResult<Json<SegmentResponse>> {
    let id = parse_id(&id, "Segment")?;
    let Json(req) = body?;
    let segment = state.service.update_segment(id, req).await?;
    Ok(Json(SegmentResponse { segment }))
}

pub async fn delete_segment(
    State(state): State<ManagementState>,
    Path(id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    let id = parse_id(&id, "Segment")?;
    state.service.delete_segment(id).await?;
    Ok(Json(MessageResponse {
        message: "Segment deleted successfully".to_string(),
    }))
}

// ─── Campaigns ─────────────────────────────────────────────────────────────

pub async fn list_campaigns(State(state): State<ManagementState>) -> ApiResult<Json<CampaignsResponse>> {
    let campaigns = state.service.list_campaigns().await?;
    Ok(Json(CampaignsResponse { campaigns }))
}

pub async fn get_campaign(
    State(state): State<ManagementState>,
    Path(id): Path<String>,
) -> ApiResult<Json<CampaignResponse>> {
    let id = parse_id(&id, "Campaign")?;
    let campaign = state.service.get_campaign(id).await?;
    Ok(Json(CampaignResponse { campaign }))
}

pub async fn create_campaign(
    State(state): State<ManagementState>,
    body: Result<Json<CreateCampaignRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<CampaignResponse>)> {
    let Json(req) = body?;
    let campaign: Campaign = state.service.create_campaign(req).await?;
    Ok((StatusCode::CREATED, Json(CampaignResponse { campaign })))
}

pub async fn send_campaign(
    State(state): State<ManagementState>,
    Path(id): Path<String>,
) -> ApiResult<Json<SendCampaignResponse>> {
    let id = parse_id(&id, "Campaign")?;
    let outcome = state.dispatcher.send(id).await?;
    Ok(Json(SendCampaignResponse {
        campaign: outcome.campaign,
        delivery_results: outcome.delivery_results,
        vendor_api_used: outcome.vendor_api_used,
    }))
}

// ─── Logs ──────────────────────────────────────────────────────────────────

pub async fn query_logs(
    State(state): State<ManagementState>,
    Query(query): Query<LogQuery>,
) -> ApiResult<Json<LogPage>> {
    Ok(Json(state.service.query_logs(query).await?))
}

pub async fn create_log(
    State(state): State<ManagementState>,
    body: Result<Json<CreateLogRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<LogResponse>)> {
    let Json(req) = body?;
    let log = state.service.create_log(req).await?;
    Ok((StatusCode::CREATED, Json(LogResponse { log })))
}
