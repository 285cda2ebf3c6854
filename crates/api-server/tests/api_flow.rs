//! End-to-end flows through the assembled router.

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use crm_api::ApiServer;
use crm_channels::{DeliveryStrategy, VendorService};
use crm_core::channels::{DeliveryResult, VendorMessage};
use crm_core::config::AppConfig;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

const API_KEY: &str = "dummy_vendor_api_key_12345";

/// Delivers everything except messages to numbers ending in "11".
struct RejectEndingIn11;

#[async_trait]
impl DeliveryStrategy for RejectEndingIn11 {
    async fn send(&self, message: &VendorMessage) -> DeliveryResult {
        if message.to.ends_with("11") {
            DeliveryResult::failed(&message.to, "Customer has opted out of marketing messages", "OPTED_OUT")
                .with_retry_count(0)
        } else {
            DeliveryResult::delivered(&message.to, "msg_test")
        }
    }
}

async fn server(seed: bool) -> ApiServer {
    let mut config = AppConfig::default();
    config.store.seed_demo_data = seed;
    config.vendor = config.vendor.without_latency();
    let vendor = Arc::new(VendorService::with_strategy(config.vendor.clone(), Arc::new(RejectEndingIn11)));
    let server = ApiServer::with_vendor(config, vendor);
    server.initialize().await.unwrap();
    server
}

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn operational_endpoints() {
    let app = server(false).await.router();

    let (status, body) = call(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    assert_eq!(call(&app, "GET", "/ready", None).await.0, StatusCode::OK);
    assert_eq!(call(&app, "GET", "/live", None).await.0, StatusCode::OK);

    let (status, doc) = call(&app, "GET", "/api-docs/openapi.json", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(doc["paths"]["/api/vendor/batch-send"].is_object());

    let (status, body) = call(&app, "GET", "/no/such/route", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn not_ready_before_initialize() {
    let mut config = AppConfig::default();
    config.vendor = config.vendor.without_latency();
    let app = ApiServer::new(config).router();
    assert_eq!(call(&app, "GET", "/ready", None).await.0, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn seeded_listing_shapes() {
    let app = server(true).await.router();

    let (_, customers) = call(&app, "GET", "/api/customers", None).await;
    assert_eq!(customers["total"], 3);
    assert_eq!(customers["limit"], 50);
    assert_eq!(customers["offset"], 0);

    let (_, segments) = call(&app, "GET", "/api/segments", None).await;
    assert_eq!(segments["segments"].as_array().unwrap().len(), 2);

    let (_, campaigns) = call(&app, "GET", "/api/campaigns", None).await;
    let campaigns = campaigns["campaigns"].as_array().unwrap();
    assert_eq!(campaigns.len(), 2);
    assert!(campaigns.iter().all(|c| c["status"] == "completed"));

    let (_, logs) = call(&app, "GET", "/api/campaigns/logs?status=sent", None).await;
    assert_eq!(logs["pagination"]["total"], 1);
    assert_eq!(logs["logs"][0]["customerName"], "John Doe");
}

#[tokio::test]
async fn full_campaign_flow() {
    let app = server(false).await.router();

    for (name, email, phone, spend) in [
        ("John Doe", "john@example.com", "+91-9876543210", 15000),
        ("Jane Smith", "jane@example.com", "+91-9876543211", 8000),
        ("Bob Johnson", "bob@example.com", "+91-9876543212", 25000),
        ("Priya Nair", "priya@example.com", "+91-9876543311", 30000),
    ] {
        let (status, _) = call(
            &app,
            "POST",
            "/api/customers",
            Some(json!({"name": name, "email": email, "phone": phone, "totalSpend": spend})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = call(
        &app,
        "POST",
        "/api/customers",
        Some(json!({"name": "Dup", "email": "john@example.com", "phone": "+1"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");

    let (status, body) = call(
        &app,
        "POST",
        "/api/segments",
        Some(json!({"name": "High Value Customers", "ruleText": "spend > ₹10,000"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let segment = &body["segment"];
    assert_eq!(segment["parsedRule"], json!({"field": "totalSpend", "operator": ">", "value": 10000}));
    assert_eq!(segment["customerCount"], 3);

    let (status, body) = call(
        &app,
        "POST",
        "/api/campaigns",
        Some(json!({"name": "Festive", "message": "Flat 20% off", "segmentId": segment["id"]})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let campaign_id = body["campaign"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["campaign"]["status"], "draft");
    assert_eq!(body["campaign"]["segmentName"], "High Value Customers");

    let (status, body) = call(&app, "POST", &format!("/api/campaigns/{}/send", campaign_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["vendorApiUsed"], true);
    assert_eq!(body["deliveryResults"], json!({"sent": 2, "failed": 1, "total": 3}));
    assert_eq!(body["campaign"]["status"], "completed");
    assert_eq!(body["campaign"]["sentCount"], 2);
    assert_eq!(body["campaign"]["failedCount"], 1);

    let (_, logs) = call(
        &app,
        "GET",
        &format!("/api/campaigns/logs?campaignId={}&status=failed", campaign_id),
        None,
    )
    .await;
    assert_eq!(logs["pagination"]["total"], 1);
    let failed = &logs["logs"][0];
    assert_eq!(failed["customerName"], "Priya Nair");
    assert_eq!(failed["errorMessage"], "Customer has opted out of marketing messages");
    assert_eq!(failed["deliveryAttempts"], 1);
    assert_eq!(failed["vendorErrorCode"], "OPTED_OUT");
}

#[tokio::test]
async fn send_unknown_campaign_is_not_found() {
    let app = server(false).await.router();
    let uri = format!("/api/campaigns/{}/send", uuid::Uuid::new_v4());
    let (status, body) = call(&app, "POST", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Campaign not found");
}

#[tokio::test]
async fn vendor_single_send() {
    let app = server(false).await.router();

    let (status, body) = call(
        &app,
        "POST",
        "/api/vendor/send-message",
        Some(json!({"apiKey": API_KEY, "to": "+91-9000000000", "message": "hi"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["deliveryStatus"], "sent");

    let (status, body) = call(
        &app,
        "POST",
        "/api/vendor/send-message",
        Some(json!({"apiKey": API_KEY, "to": "+91-9000000011", "message": "hi"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errorCode"], "OPTED_OUT");
    assert_eq!(body["retryCount"], 0);

    let (status, body) = call(
        &app,
        "POST",
        "/api/vendor/send-message",
        Some(json!({"apiKey": "wrong", "to": "+91-9000000000", "message": "hi"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["errorCode"], "AUTH_FAILED");

    let (status, body) = call(
        &app,
        "POST",
        "/api/vendor/send-message",
        Some(json!({"apiKey": API_KEY, "to": "+91-9000000000"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errorCode"], "INVALID_REQUEST");

    let (status, health) = call(&app, "GET", "/api/vendor/send-message", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["rateLimits"]["requestsPerMinute"], 100);
    assert_eq!(health["rateLimits"]["currentUsage"], 2);
}

#[tokio::test]
async fn vendor_batch_send() {
    let app = server(false).await.router();
    let messages = json!([
        {"to": "+91-1", "message": "a"},
        {"to": "+91-11", "message": "b"},
    ]);

    let (status, body) = call(
        &app,
        "POST",
        "/api/vendor/batch-send",
        Some(json!({"apiKey": API_KEY, "messages": messages, "campaignId": "c-1"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalMessages"], 2);
    assert_eq!(body["successCount"], 1);
    assert_eq!(body["failureCount"], 1);
    assert_eq!(body["campaignId"], "c-1");

    let (status, body) = call(
        &app,
        "POST",
        "/api/vendor/batch-send",
        Some(json!({"apiKey": "nope", "messages": messages})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["successCount"], 0);
    assert_eq!(body["failureCount"], 2);

    let (status, _) = call(
        &app,
        "POST",
        "/api/vendor/batch-send",
        Some(json!({"apiKey": API_KEY, "messages": []})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
