//! API server — assembles the CRM, vendor, and operational routers and
//! serves them over HTTP, with Prometheus metrics on a separate port.

use crate::rest::{self, AppState};
use crate::swagger;
use crate::vendor_rest::{self, VendorState};
use axum::routing::{get, post};
use axum::Router;
use crm_channels::VendorService;
use crm_core::config::AppConfig;
use crm_management::{crm_router, CampaignDispatcher, CrmService, CrmStore, ManagementState};
use crm_segmentation::{HeuristicRuleParser, SegmentMatcher};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

pub struct ApiServer {
    config: AppConfig,
    store: CrmStore,
    vendor: Arc<VendorService>,
    ready: Arc<AtomicBool>,
}

impl ApiServer {
    /// Server with an in-memory store and the random vendor simulator.
    pub fn new(config: AppConfig) -> Self {
        let vendor = Arc::new(VendorService::new(config.vendor.clone()));
        Self::with_vendor(config, vendor)
    }

    pub fn with_vendor(config: AppConfig, vendor: Arc<VendorService>) -> Self {
        Self {
            config,
            store: CrmStore::in_memory(),
            vendor,
            ready: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Seed demo data when enabled and mark the service ready.
    pub async fn initialize(&self) -> anyhow::Result<()> {
        if self.config.store.seed_demo_data {
            self.store.seed_demo_data(&SegmentMatcher::new()).await?;
        }
        self.ready.store(true, Ordering::Release);
        Ok(())
    }

    /// The complete application: CRM routes, vendor routes, operational
    /// probes, OpenAPI document, and middleware.
    pub fn router(&self) -> Router {
        let parser = Arc::new(HeuristicRuleParser::new(&self.config.segmentation));
        let management = ManagementState {
            service: Arc::new(CrmService::new(
                self.store.clone(),
                parser,
                self.config.segmentation.default_city.clone(),
            )),
            dispatcher: Arc::new(CampaignDispatcher::new(self.store.clone(), self.vendor.clone())),
        };

        let vendor = Router::new()
            .route(
                "/api/vendor/send-message",
                post(vendor_rest::handle_send_message).get(vendor_rest::handle_vendor_health),
            )
            .route("/api/vendor/batch-send", post(vendor_rest::handle_batch_send))
            .with_state(VendorState {
                vendor: self.vendor.clone(),
            });

        let ops = Router::new()
            .route("/health", get(rest::health_check))
            .route("/ready", get(rest::readiness))
            .route("/live", get(rest::liveness))
            .route("/api-docs/openapi.json", get(swagger::openapi_json))
            .with_state(AppState {
                node_id: self.config.node_id.clone(),
                start_time: Instant::now(),
                ready: self.ready.clone(),
            });

        Router::new()
            .merge(crm_router(management))
            .merge(vendor)
            .merge(ops)
            .fallback(rest::not_found)
            // Middleware
            .layer(CompressionLayer::new())
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
    }

    /// Start the HTTP REST server.
    pub async fn start_http(&self) -> anyhow::Result<()> {
        let app = self.router();
        let addr = SocketAddr::new(self.config.api.host.parse()?, self.config.api.http_port);

        info!(addr = %addr, "Starting HTTP server");

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }

    /// Start the metrics server on a separate port.
    pub async fn start_metrics(&self) -> anyhow::Result<()> {
        let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
        builder
            .with_http_listener(SocketAddr::new(
                self.config.api.host.parse()?,
                self.config.metrics.port,
            ))
            .install()?;

        info!(port = self.config.metrics.port, "Metrics exporter started");
        Ok(())
    }
}
