//! CRM Express — customer management, segmentation, and campaign messaging.
//!
//! Main entry point: loads configuration, initializes tracing, seeds the
//! store, and starts the HTTP and metrics servers.

use clap::Parser;
use crm_api::ApiServer;
use crm_core::config::AppConfig;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "crm-express")]
#[command(about = "Mini CRM with rule-based segments and simulated campaign delivery")]
#[command(version)]
struct Cli {
    /// Path to a TOML config file (extension optional)
    #[arg(long, short, env = "CRM_EXPRESS_CONFIG", default_value = "crm-express")]
    config: String,

    /// Node identifier (overrides config)
    #[arg(long, env = "CRM_EXPRESS__NODE_ID")]
    node_id: Option<String>,

    /// Bind address (overrides config)
    #[arg(long, env = "CRM_EXPRESS__API__HOST")]
    host: Option<String>,

    /// HTTP port (overrides config)
    #[arg(long, env = "CRM_EXPRESS__API__HTTP_PORT")]
    http_port: Option<u16>,

    /// Start with an empty store
    #[arg(long, default_value_t = false)]
    no_seed: bool,

    /// Human-readable logs instead of JSON
    #[arg(long, default_value_t = false)]
    pretty: bool,
}

fn init_tracing(filter: &str, json: bool) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into());
    let builder = tracing_subscriber::fmt().with_env_filter(env_filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Tracing depends on the logging section, so load first and report
    // any config error once the subscriber is up.
    let loaded = AppConfig::load_from(Some(&cli.config));
    let mut config = loaded.as_ref().cloned().unwrap_or_default();
    init_tracing(&config.logging.filter, config.logging.json && !cli.pretty);
    if let Err(e) = &loaded {
        warn!(error = %e, "Failed to load config, using defaults");
    }

    info!("CRM Express starting up");

    // Apply CLI overrides
    if let Some(node_id) = cli.node_id {
        config.node_id = node_id;
    }
    if let Some(host) = cli.host {
        config.api.host = host;
    }
    if let Some(port) = cli.http_port {
        config.api.http_port = port;
    }
    if cli.no_seed {
        config.store.seed_demo_data = false;
    }

    info!(
        node_id = %config.node_id,
        host = %config.api.host,
        http_port = config.api.http_port,
        seed_demo_data = config.store.seed_demo_data,
        vendor_success_rate = config.vendor.success_rate,
        "Configuration loaded"
    );

    let api_server = ApiServer::new(config.clone());
    api_server.initialize().await?;

    if config.metrics.enabled {
        if let Err(e) = api_server.start_metrics().await {
            error!(error = %e, "Failed to start metrics exporter");
        }
    }

    info!("CRM Express is ready to serve traffic");

    api_server.start_http().await
}
