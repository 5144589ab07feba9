//! # Application Configuration
//!
//! This module defines the configuration structure for the `zygote-server` and
//! provides the logic for loading it from an optional `config.yml` file and
//! environment variables.
//!
//! Layers, lowest precedence first:
//! 1. Defaults declared on [`AppConfig`].
//! 2. `config.yml` next to the crate manifest, or an explicit path, with `${VAR}`
//!    placeholders expanded from the environment.
//! 3. Plain environment variables for top-level keys (`PORT`, `DB_URL`, ...).
//! 4. `ZYGOTE_`-prefixed variables, with `__` separating nested keys
//!    (e.g. `ZYGOTE_SMTP__HOST`).

use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use regex::Regex;
use serde::Deserialize;
use std::{env, fs};
use tracing::info;

/// A custom error type for configuration issues.
#[derive(Debug)]
pub enum ConfigError {
    /// Indicates an error from the underlying `config` crate.
    General(String),
    /// Indicates an explicitly requested configuration file was not found.
    NotFound(String),
    /// A value that parsed but cannot be used.
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::General(msg) => write!(f, "Configuration error: {msg}"),
            ConfigError::NotFound(msg) => write!(f, "{msg}"),
            ConfigError::Invalid(msg) => write!(f, "Invalid configuration: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::General(err.to_string())
    }
}

/// Where the server runs. Development exposes server-error details to clients.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RunEnvironment {
    #[default]
    Development,
    Production,
}

/// Outbound mail settings. Nothing in the server sends mail yet.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct SmtpConfig {
    pub host: Option<String>,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    pub user: Option<String>,
    pub password: Option<String>,
    pub from: Option<String>,
}

fn default_smtp_port() -> u16 {
    587
}

/// Object storage for uploaded media.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct StorageConfig {
    pub bucket: Option<String>,
    pub region: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
}

/// Payment processor credentials.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct PaymentsConfig {
    pub secret_key: Option<String>,
    pub publishable_key: Option<String>,
    pub webhook_secret: Option<String>,
}

/// The root configuration structure, mapping directly to `config.yml`.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub environment: RunEnvironment,
    /// The port for the server to listen on. Loaded from `PORT` env var.
    #[serde(default = "default_port")]
    pub port: u16,
    /// The path to the SQLite database file. Loaded from `DB_URL` env var.
    #[serde(default = "default_db_url")]
    pub db_url: String,

    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,
    #[serde(default = "default_jwt_expiry_secs")]
    pub jwt_expiry_secs: i64,
    #[serde(default = "default_refresh_token_secret")]
    pub refresh_token_secret: String,
    #[serde(default = "default_refresh_token_expiry_secs")]
    pub refresh_token_expiry_secs: i64,

    #[serde(default = "default_otp_length")]
    pub otp_length: u32,
    #[serde(default = "default_otp_expiry_minutes")]
    pub otp_expiry_minutes: i64,

    #[serde(default = "default_rate_limit_window_secs")]
    pub rate_limit_window_secs: u64,
    #[serde(default = "default_rate_limit_max_requests")]
    pub rate_limit_max_requests: usize,
    /// Key the rate limit on the hop appended to `x-forwarded-for` by a
    /// reverse proxy instead of the peer address.
    #[serde(default)]
    pub trust_proxy: bool,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Origins allowed by CORS: the learner app and the admin CMS.
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,

    /// When set, bodies and MCQs of paid topics require a subscription.
    #[serde(default = "default_true")]
    pub premium_content_requires_subscription: bool,
    /// Runs the demo seed at start-up.
    #[serde(default)]
    pub seed_demo_content: bool,
    #[serde(default = "default_admin_email")]
    pub admin_email: String,
    #[serde(default = "default_admin_password")]
    pub admin_password: String,

    #[serde(default)]
    pub smtp: Option<SmtpConfig>,
    #[serde(default)]
    pub storage: Option<StorageConfig>,
    #[serde(default)]
    pub payments: Option<PaymentsConfig>,
}

impl AppConfig {
    pub fn is_development(&self) -> bool {
        self.environment == RunEnvironment::Development
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.is_empty() || self.refresh_token_secret.is_empty() {
            return Err(ConfigError::Invalid(
                "jwt_secret and refresh_token_secret must not be empty".to_string(),
            ));
        }
        if self.environment == RunEnvironment::Production
            && (self.jwt_secret == default_jwt_secret()
                || self.refresh_token_secret == default_refresh_token_secret())
        {
            return Err(ConfigError::Invalid(
                "the default token secrets cannot be used in production".to_string(),
            ));
        }
        if self.rate_limit_max_requests == 0 || self.rate_limit_window_secs == 0 {
            return Err(ConfigError::Invalid(
                "rate limit window and maximum must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_port() -> u16 {
    5000
}
fn default_db_url() -> String {
    zygote::constants::DEFAULT_DB_FILE.to_string()
}
fn default_jwt_secret() -> String {
    "zygote-dev-access-secret".to_string()
}
fn default_jwt_expiry_secs() -> i64 {
    7 * 24 * 60 * 60
}
fn default_refresh_token_secret() -> String {
    "zygote-dev-refresh-secret".to_string()
}
fn default_refresh_token_expiry_secs() -> i64 {
    30 * 24 * 60 * 60
}
fn default_otp_length() -> u32 {
    6
}
fn default_otp_expiry_minutes() -> i64 {
    10
}
fn default_rate_limit_window_secs() -> u64 {
    15 * 60
}
fn default_rate_limit_max_requests() -> usize {
    100
}
fn default_request_timeout_secs() -> u64 {
    30
}
fn default_allowed_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".to_string(),
        "http://localhost:3001".to_string(),
    ]
}
fn default_true() -> bool {
    true
}
fn default_admin_email() -> String {
    "zygote72@gmail.com".to_string()
}
fn default_admin_password() -> String {
    "Zygote@123".to_string()
}

// Reads a file and substitutes `${VAR}` placeholders from the environment.
// Returns Ok(None) if the file does not exist.
fn read_and_substitute(path: &str) -> Result<Option<String>, ConfigError> {
    if !std::path::Path::new(path).exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path)
        .map_err(|e| ConfigError::General(format!("Failed to read config file '{path}': {e}")))?;

    let re = Regex::new(r"\$\{(?P<var>[A-Z0-9_]+)\}")
        .map_err(|e| ConfigError::General(e.to_string()))?;
    let expanded_content = re.replace_all(&content, |caps: &regex::Captures| {
        let var_name = &caps["var"];
        env::var(var_name).unwrap_or_default()
    });

    Ok(Some(expanded_content.to_string()))
}

/// Loads the application configuration.
///
/// With `config_path_override` the file must exist; otherwise `config.yml`
/// beside the crate manifest is used when present and the defaults apply when
/// it is not.
pub fn get_config(config_path_override: Option<&str>) -> Result<AppConfig, ConfigError> {
    let mut builder = ConfigBuilder::builder();

    match config_path_override {
        Some(path) => {
            let content = read_and_substitute(path)?.ok_or_else(|| {
                ConfigError::NotFound(format!("Config file not found at '{path}'."))
            })?;
            info!("Loading configuration from '{path}'.");
            builder = builder.add_source(File::from_str(&content, FileFormat::Yaml));
        }
        None => {
            let default_path = format!("{}/config.yml", env!("CARGO_MANIFEST_DIR"));
            if let Some(content) = read_and_substitute(&default_path)? {
                info!("Loading configuration from '{default_path}'.");
                builder = builder.add_source(File::from_str(&content, FileFormat::Yaml));
            }
        }
    }

    let settings = builder
        // Top-level keys like PORT and DB_URL.
        .add_source(
            Environment::default()
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("allowed_origins"),
        )
        // Prefixed variables for nested overrides.
        .add_source(
            Environment::with_prefix("ZYGOTE")
                .prefix_separator("_")
                .try_parsing(true)
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("allowed_origins"),
        )
        .build()?;

    let config: AppConfig = settings.try_deserialize()?;
    config.validate()?;
    Ok(config)
}
