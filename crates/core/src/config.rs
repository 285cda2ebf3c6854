use serde::Deserialize;

/// Root application configuration. Loaded from an optional TOML file and
/// environment variables with the prefix `CRM_EXPRESS__`.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_node_id")]
    pub node_id: String,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub vendor: VendorConfig,
    #[serde(default)]
    pub segmentation: SegmentationConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_enabled")]
    pub enabled: bool,
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_filter")]
    pub filter: String,
    #[serde(default = "default_log_json")]
    pub json: bool,
}

// Default functions
fn default_node_id() -> String {
    "crm-01".to_string()
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_http_port() -> u16 {
    8080
}
fn default_metrics_enabled() -> bool {
    true
}
fn default_metrics_port() -> u16 {
    9091
}
fn default_log_filter() -> String {
    "crm_express=info,crm_api=info,crm_management=info,tower_http=info".to_string()
}
fn default_log_json() -> bool {
    true
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            http_port: default_http_port(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_metrics_enabled(),
            port: default_metrics_port(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            json: default_log_json(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            node_id: default_node_id(),
            api: ApiConfig::default(),
            metrics: MetricsConfig::default(),
            logging: LoggingConfig::default(),
            vendor: VendorConfig::default(),
            segmentation: SegmentationConfig::default(),
            store: StoreConfig::default(),
        }
    }
}

// ─── Vendor Config ──────────────────────────────────────────────────────────

/// Simulated messaging vendor. Latencies are cosmetic and may be zeroed.
#[derive(Debug, Clone, Deserialize)]
pub struct VendorConfig {
    #[serde(default = "default_vendor_api_key")]
    pub api_key: String,
    #[serde(default = "default_success_rate")]
    pub success_rate: f64,
    #[serde(default = "default_rate_limit_per_minute")]
    pub rate_limit_per_minute: u32,
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,
    #[serde(default = "default_min_latency_ms")]
    pub min_latency_ms: u64,
    #[serde(default = "default_max_latency_ms")]
    pub max_latency_ms: u64,
    #[serde(default = "default_batch_min_latency_ms")]
    pub batch_min_latency_ms: u64,
    #[serde(default = "default_batch_max_latency_ms")]
    pub batch_max_latency_ms: u64,
    #[serde(default = "default_inter_message_delay_ms")]
    pub inter_message_delay_ms: u64,
}

fn default_vendor_api_key() -> String {
    "dummy_vendor_api_key_12345".to_string()
}
fn default_success_rate() -> f64 {
    0.9
}
fn default_rate_limit_per_minute() -> u32 {
    100
}
fn default_max_batch_size() -> usize {
    1000
}
fn default_min_latency_ms() -> u64 {
    500
}
fn default_max_latency_ms() -> u64 {
    1500
}
fn default_batch_min_latency_ms() -> u64 {
    1000
}
fn default_batch_max_latency_ms() -> u64 {
    3000
}
fn default_inter_message_delay_ms() -> u64 {
    50
}

impl Default for VendorConfig {
    fn default() -> Self {
        Self {
            api_key: default_vendor_api_key(),
            success_rate: default_success_rate(),
            rate_limit_per_minute: default_rate_limit_per_minute(),
            max_batch_size: default_max_batch_size(),
            min_latency_ms: default_min_latency_ms(),
            max_latency_ms: default_max_latency_ms(),
            batch_min_latency_ms: default_batch_min_latency_ms(),
            batch_max_latency_ms: default_batch_max_latency_ms(),
            inter_message_delay_ms: default_inter_message_delay_ms(),
        }
    }
}

impl VendorConfig {
    /// Same vendor with every artificial delay removed.
    pub fn without_latency(mut self) -> Self {
        self.min_latency_ms = 0;
        self.max_latency_ms = 0;
        self.batch_min_latency_ms = 0;
        self.batch_max_latency_ms = 0;
        self.inter_message_delay_ms = 0;
        self
    }
}

// ─── Segmentation Config ────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct SegmentationConfig {
    #[serde(default = "default_inactivity_days")]
    pub inactivity_days: i64,
    #[serde(default = "default_cities")]
    pub cities: Vec<String>,
    #[serde(default = "default_city")]
    pub default_city: String,
}

fn default_inactivity_days() -> i64 {
    90
}
fn default_cities() -> Vec<String> {
    ["Mumbai", "Delhi", "Bangalore", "Chennai", "Kolkata"]
        .iter()
        .map(|c| c.to_string())
        .collect()
}
fn default_city() -> String {
    "Mumbai".to_string()
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            inactivity_days: default_inactivity_days(),
            cities: default_cities(),
            default_city: default_city(),
        }
    }
}

// ─── Store Config ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_seed_demo_data")]
    pub seed_demo_data: bool,
}

fn default_seed_demo_data() -> bool {
    true
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            seed_demo_data: default_seed_demo_data(),
        }
    }
}

impl AppConfig {
    /// Load configuration from an optional TOML file, then environment
    /// variables. Environment values win.
    pub fn load_from(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            tracing::debug!(path = %path, "Adding config file source");
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        let builder = builder.add_source(
            config::Environment::with_prefix("CRM_EXPRESS")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("segmentation.cities"),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }
}
