//! Process configuration
//!
//! Loaded from a JSON file (`--config`) or, by default, from the environment:
//! - Catalog locations (`SWAGGERSTORE`, `HUGOSTORE`, `HUGODIR`)
//! - Cluster access (`MODE`, `EXTERNALIP`, `KUBE_API_URL`)
//! - Gateway credentials and template (`USERNAME`, `PASSWORD`, `APIKEY`,
//!   `APISECRETE`, `AREAID`, `AREADOMAIN`, `MASHERY_TEMPLATE`)
//! - Outbound HTTP timeout (`HTTP_TIMEOUT_SECS`)

use apiscout_gateway::DEFAULT_CALL_DELAY;
use apiscout_ports::GatewayCredentials;
use apiscout_reconciler::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {error}")]
    Io { path: String, error: String },

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid value '{value}' for {key}")]
    InvalidValue { key: String, value: String },
}

/// How the process reaches the cluster
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RunMode {
    /// In-cluster service account
    Kube,
    /// Plain HTTP base URL, e.g. a `kubectl proxy`
    #[default]
    Local,
}

impl RunMode {
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_ascii_uppercase().as_str() {
            "KUBE" => Ok(RunMode::Kube),
            "LOCAL" => Ok(RunMode::Local),
            _ => Err(ConfigError::InvalidValue {
                key: "MODE".to_string(),
                value: value.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for RunMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunMode::Kube => f.write_str("KUBE"),
            RunMode::Local => f.write_str("LOCAL"),
        }
    }
}

/// Gateway publishing settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewaySettings {
    #[serde(default)]
    pub credentials: GatewayCredentials,

    /// JSON file with `api`/`package` templates; defaults apply when absent
    #[serde(default = "default_template_path")]
    pub template_path: PathBuf,

    /// Delay after every gateway call
    #[serde(default = "default_call_delay_ms")]
    pub call_delay_ms: u64,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            credentials: GatewayCredentials::default(),
            template_path: default_template_path(),
            call_delay_ms: default_call_delay_ms(),
        }
    }
}

impl GatewaySettings {
    pub fn call_delay(&self) -> Duration {
        Duration::from_millis(self.call_delay_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrySettings {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_delay_secs")]
    pub delay_secs: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            delay_secs: default_retry_delay_secs(),
        }
    }
}

/// Root configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoutConfig {
    /// Where fetched API documents are written
    #[serde(default = "default_swagger_store")]
    pub swagger_store: PathBuf,

    /// Where rendered Hugo pages are written
    #[serde(default = "default_hugo_store")]
    pub hugo_store: PathBuf,

    #[serde(default)]
    pub mode: RunMode,

    /// When set, services are reached on this address and their node port
    #[serde(default)]
    pub external_ip: Option<String>,

    /// Hugo site root; no site regeneration when unset
    #[serde(default)]
    pub hugo_dir: Option<PathBuf>,

    /// API server base URL in `LOCAL` mode
    #[serde(default = "default_kube_api_url")]
    pub kube_api_url: String,

    #[serde(default)]
    pub gateway: GatewaySettings,

    #[serde(default)]
    pub retry: RetrySettings,

    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
}

fn default_swagger_store() -> PathBuf {
    PathBuf::from("/tmp/static/swaggerdocs")
}

fn default_hugo_store() -> PathBuf {
    PathBuf::from("/tmp/content/apis")
}

fn default_kube_api_url() -> String {
    "http://127.0.0.1:8001".to_string()
}

fn default_template_path() -> PathBuf {
    PathBuf::from("/tmp/masheryTemplate.json")
}

fn default_call_delay_ms() -> u64 {
    DEFAULT_CALL_DELAY.as_millis() as u64
}

fn default_max_retries() -> u32 {
    RetryPolicy::default().max_retries
}

fn default_retry_delay_secs() -> u64 {
    RetryPolicy::default().delay.as_secs()
}

fn default_http_timeout_secs() -> u64 {
    30
}

impl Default for ScoutConfig {
    fn default() -> Self {
        Self {
            swagger_store: default_swagger_store(),
            hugo_store: default_hugo_store(),
            mode: RunMode::default(),
            external_ip: None,
            hugo_dir: None,
            kube_api_url: default_kube_api_url(),
            gateway: GatewaySettings::default(),
            retry: RetrySettings::default(),
            http_timeout_secs: default_http_timeout_secs(),
        }
    }
}

impl ScoutConfig {
    /// Load configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io {
            path: path.as_ref().display().to_string(),
            error: e.to_string(),
        })?;

        Self::from_json(&content)
    }

    /// Parse configuration from JSON string
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()
    }

    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from `lookup`, falling back to defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let set = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = set("SWAGGERSTORE") {
            config.swagger_store = PathBuf::from(v);
        }
        if let Some(v) = set("HUGOSTORE") {
            config.hugo_store = PathBuf::from(v);
        }
        if let Some(v) = set("MODE") {
            config.mode = RunMode::parse(&v)?;
        }
        config.external_ip = set("EXTERNALIP");
        config.hugo_dir = set("HUGODIR").map(PathBuf::from);
        if let Some(v) = set("KUBE_API_URL") {
            config.kube_api_url = v;
        }
        if let Some(v) = set("MASHERY_TEMPLATE") {
            config.gateway.template_path = PathBuf::from(v);
        }
        if let Some(v) = set("HTTP_TIMEOUT_SECS") {
            config.http_timeout_secs = v.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: "HTTP_TIMEOUT_SECS".to_string(),
                value: v.clone(),
            })?;
        }

        let value = |key: &str| lookup(key).unwrap_or_default();
        config.gateway.credentials = GatewayCredentials {
            username: value("USERNAME"),
            password: value("PASSWORD"),
            api_key: value("APIKEY"),
            api_secret: value("APISECRETE"),
            area_id: value("AREAID"),
            area_domain: value("AREADOMAIN"),
        };

        config.validate()
    }

    fn validate(self) -> Result<Self, ConfigError> {
        if self.http_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "HTTP_TIMEOUT_SECS".to_string(),
                value: "0".to_string(),
            });
        }
        Ok(self)
    }

    /// Gateway publishing needs a username plus an API key or area id
    pub fn gateway_enabled(&self) -> bool {
        let credentials = &self.gateway.credentials;
        let filled = |v: &str| !v.trim().is_empty();
        filled(&credentials.username) && (filled(&credentials.api_key) || filled(&credentials.area_id))
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.retry.max_retries,
            delay: Duration::from_secs(self.retry.delay_secs),
        }
    }
}
