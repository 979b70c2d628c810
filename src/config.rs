use config::{Config, ConfigError, Environment, File};
use secrecy::SecretString;
use serde::Deserialize;
use std::env;
use tracing::info;
use validator::Validate;

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";
const DEFAULT_CURRENCY: &str = "INR";
const DEV_DEFAULT_JWT_SECRET: &str =
    "this_is_a_development_secret_key_that_is_at_least_64_characters_long_for_testing";

/// Payment gateway configuration.
///
/// The key secret is only ever touched inside signature verification and the
/// gateway client's basic-auth header; it is never logged (`SecretString`
/// redacts it from `Debug` output).
#[derive(Clone, Debug, Deserialize)]
pub struct GatewayConfig {
    /// Public key id used for basic auth against the gateway API
    #[serde(default)]
    pub key_id: String,

    /// Private key secret used for basic auth and signature verification
    #[serde(default = "default_secret")]
    pub key_secret: SecretString,

    /// Base URL of the gateway REST API
    #[serde(default = "default_gateway_base_url")]
    pub api_base_url: String,

    /// ISO currency code sent with every intent
    #[serde(default = "default_currency")]
    pub currency: String,

    /// Outbound request timeout in seconds
    #[serde(default = "default_gateway_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            key_id: String::new(),
            key_secret: default_secret(),
            api_base_url: default_gateway_base_url(),
            currency: default_currency(),
            timeout_secs: default_gateway_timeout_secs(),
        }
    }
}

/// Durable asset storage configuration for frame order images.
#[derive(Clone, Debug, Deserialize)]
pub struct StorageConfig {
    /// Storage backend: "local" or "http"
    #[serde(default = "default_storage_backend")]
    pub backend: String,

    /// Root directory for the local backend
    #[serde(default = "default_storage_root")]
    pub local_root: String,

    /// Public base URL that stored keys are served under
    #[serde(default = "default_storage_public_base")]
    pub public_base_url: String,

    /// Base URL of the object-store API for the "http" backend
    #[serde(default)]
    pub http_base_url: Option<String>,

    /// API key for the "http" backend
    #[serde(default)]
    pub http_api_key: Option<SecretString>,

    /// Upload/download timeout in seconds
    #[serde(default = "default_storage_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_storage_backend(),
            local_root: default_storage_root(),
            public_base_url: default_storage_public_base(),
            http_base_url: None,
            http_api_key: None,
            timeout_secs: default_storage_timeout_secs(),
        }
    }
}

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
pub struct AppConfig {
    /// Database connection URL
    pub database_url: String,

    /// JWT secret key used to validate storefront tokens
    #[validate(length(min = 32))]
    pub jwt_secret: String,

    /// JWT issuer expected in storefront tokens
    #[serde(default = "default_auth_issuer")]
    pub auth_issuer: String,

    /// JWT audience expected in storefront tokens
    #[serde(default = "default_auth_audience")]
    pub auth_audience: String,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Whether to run database migrations on startup
    #[serde(default)]
    pub auto_migrate: bool,

    /// CORS: comma-separated list of allowed origins (production)
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,

    /// Allow permissive CORS fallback
    #[serde(default)]
    pub cors_allow_any_origin: bool,

    /// CORS: allow credentials
    #[serde(default)]
    pub cors_allow_credentials: bool,

    /// DB pool: max connections
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,

    /// DB pool: min connections
    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,

    /// DB timeouts (seconds)
    #[serde(default = "default_db_connect_timeout_secs")]
    pub db_connect_timeout_secs: u64,
    #[serde(default = "default_db_idle_timeout_secs")]
    pub db_idle_timeout_secs: u64,
    #[serde(default = "default_db_acquire_timeout_secs")]
    pub db_acquire_timeout_secs: u64,

    /// Payment gateway settings
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Asset storage settings
    #[serde(default)]
    pub storage: StorageConfig,

    /// Reconciliation outbox: worker poll interval in milliseconds
    #[serde(default = "default_outbox_poll_interval_ms")]
    pub outbox_poll_interval_ms: u64,

    /// Reconciliation outbox: rows claimed per poll
    #[serde(default = "default_outbox_batch_size")]
    pub outbox_batch_size: i64,

    /// Reconciliation outbox: attempts before a row is parked as failed
    #[serde(default = "default_outbox_max_attempts")]
    pub outbox_max_attempts: i32,
}

fn default_secret() -> SecretString {
    SecretString::new(String::new())
}

fn default_gateway_base_url() -> String {
    "https://api.razorpay.com/v1".to_string()
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

fn default_gateway_timeout_secs() -> u64 {
    10
}

fn default_storage_backend() -> String {
    "local".to_string()
}

fn default_storage_root() -> String {
    "./media".to_string()
}

fn default_storage_public_base() -> String {
    "http://localhost:8080/media".to_string()
}

fn default_storage_timeout_secs() -> u64 {
    30
}

fn default_auth_issuer() -> String {
    "framepress".to_string()
}

fn default_auth_audience() -> String {
    "framepress-storefront".to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_environment() -> String {
    DEFAULT_ENV.to_string()
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_db_max_connections() -> u32 {
    10
}

fn default_db_min_connections() -> u32 {
    1
}

fn default_db_connect_timeout_secs() -> u64 {
    30
}

fn default_db_idle_timeout_secs() -> u64 {
    600
}

fn default_db_acquire_timeout_secs() -> u64 {
    8
}

fn default_outbox_poll_interval_ms() -> u64 {
    500
}

fn default_outbox_batch_size() -> i64 {
    50
}

fn default_outbox_max_attempts() -> i32 {
    8
}

impl Default for AppConfig {
    /// Development defaults; `database_url` must still be provided.
    fn default() -> Self {
        Self {
            database_url: String::new(),
            jwt_secret: DEV_DEFAULT_JWT_SECRET.to_string(),
            auth_issuer: default_auth_issuer(),
            auth_audience: default_auth_audience(),
            host: default_host(),
            port: default_port(),
            environment: default_environment(),
            log_level: default_log_level(),
            log_json: false,
            auto_migrate: false,
            cors_allowed_origins: None,
            cors_allow_any_origin: false,
            cors_allow_credentials: false,
            db_max_connections: default_db_max_connections(),
            db_min_connections: default_db_min_connections(),
            db_connect_timeout_secs: default_db_connect_timeout_secs(),
            db_idle_timeout_secs: default_db_idle_timeout_secs(),
            db_acquire_timeout_secs: default_db_acquire_timeout_secs(),
            gateway: GatewayConfig::default(),
            storage: StorageConfig::default(),
            outbox_poll_interval_ms: default_outbox_poll_interval_ms(),
            outbox_batch_size: default_outbox_batch_size(),
            outbox_max_attempts: default_outbox_max_attempts(),
        }
    }
}

impl AppConfig {
    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }

    pub fn should_allow_permissive_cors(&self) -> bool {
        self.is_development() || self.cors_allow_any_origin
    }
}

/// Load configuration from layered files plus `APP__`-prefixed environment
/// variables (e.g. `APP__GATEWAY__KEY_ID`).
pub fn load_config() -> Result<AppConfig, ConfigError> {
    let run_env = env::var("APP_ENV").unwrap_or_else(|_| DEFAULT_ENV.to_string());

    let cfg: AppConfig = Config::builder()
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?
        .try_deserialize()?;

    cfg.validate()
        .map_err(|e| ConfigError::Message(format!("invalid configuration: {}", e)))?;

    info!(environment = %cfg.environment, "configuration loaded");
    Ok(cfg)
}

/// Initialize the global tracing subscriber.
///
/// Uses `try_init` so repeated calls (tests) are harmless.
pub fn init_tracing(log_level: &str, json: bool) {
    use tracing_subscriber::EnvFilter;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));

    if json {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .try_init();
    } else {
        let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
    }
}
