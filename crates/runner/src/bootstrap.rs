//! Bootstrap - builds the running system from a [`ScoutConfig`]
//!
//! Wires the catalog (filesystem store + HTTP fetcher), the optional Hugo
//! site generator, the optional gateway publisher and the cluster watch.

use crate::config::{ConfigError, RunMode, ScoutConfig};
use crate::kube::KubeWatchSource;
use crate::site::HugoSiteGenerator;
use apiscout_catalog::{CatalogStore, FsArtifactStore, HttpDocumentFetcher};
use apiscout_gateway::{GatewayPublisher, GatewayTemplates, MasheryClient, PublishError};
use apiscout_ports::DiscoveryError;
use apiscout_reconciler::{GatewayHook, Reconciler};
use log::info;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Startup errors; all of them are fatal
#[derive(Error, Debug)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to build HTTP client: {0}")]
    Http(String),

    #[error("Failed to read gateway template '{path}': {error}")]
    TemplateIo { path: String, error: String },

    #[error("Invalid gateway template '{path}': {source}")]
    Template {
        path: String,
        #[source]
        source: PublishError,
    },

    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
}

/// Read the gateway templates; a missing file means built-in defaults
pub fn load_templates(path: &Path) -> Result<GatewayTemplates, BootstrapError> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            info!("No gateway template at {}, using defaults", path.display());
            return Ok(GatewayTemplates::default());
        }
        Err(e) => {
            return Err(BootstrapError::TemplateIo {
                path: path.display().to_string(),
                error: e.to_string(),
            });
        }
    };

    GatewayTemplates::from_json(&bytes).map_err(|source| BootstrapError::Template {
        path: path.display().to_string(),
        source,
    })
}

/// Build the reconciler and everything it drives
pub fn build_reconciler(config: &ScoutConfig) -> Result<Reconciler, BootstrapError> {
    let fetcher = HttpDocumentFetcher::new(config.http_timeout())
        .map_err(|e| BootstrapError::Http(e.to_string()))?;
    let store = FsArtifactStore::new(&config.swagger_store, &config.hugo_store);
    let catalog = CatalogStore::new(Arc::new(fetcher), Arc::new(store));

    let mut reconciler =
        Reconciler::new(Arc::new(catalog)).with_retry_policy(config.retry_policy());

    if let Some(dir) = &config.hugo_dir {
        reconciler = reconciler.with_site_generator(Arc::new(HugoSiteGenerator::new(dir)));
    }

    if config.gateway_enabled() {
        let templates = load_templates(&config.gateway.template_path)?;
        let credentials = config.gateway.credentials.clone();
        let client = MasheryClient::new(credentials.area_domain.clone(), config.http_timeout())
            .map_err(|e| BootstrapError::Http(e.to_string()))?;
        let publisher = GatewayPublisher::new(Arc::new(client), credentials)
            .with_call_delay(config.gateway.call_delay());
        reconciler = reconciler.with_gateway(GatewayHook {
            publisher,
            templates,
        });
    }

    Ok(reconciler)
}

/// Build the cluster watch for the configured mode
pub fn build_source(config: &ScoutConfig) -> Result<KubeWatchSource, BootstrapError> {
    let external_ip = config.external_ip.clone();
    let source = match config.mode {
        RunMode::Kube => KubeWatchSource::in_cluster(external_ip, config.http_timeout())?,
        RunMode::Local => {
            KubeWatchSource::local(&config.kube_api_url, external_ip, config.http_timeout())?
        }
    };
    Ok(source)
}

/// Log the effective configuration (secrets excluded)
pub fn log_config(config: &ScoutConfig) {
    info!("------------------------------------------------------------");
    info!("CONFIG");
    info!("apiscout version : {}", VERSION);
    info!("Run mode         : {}", config.mode);
    info!("Swagger store    : {}", config.swagger_store.display());
    info!("Hugo store       : {}", config.hugo_store.display());
    if let Some(ip) = &config.external_ip {
        info!("External IP      : {}", ip);
    }
    if let Some(dir) = &config.hugo_dir {
        info!("Hugo dir         : {}", dir.display());
    }
    if config.mode == RunMode::Local {
        info!("API server       : {}", config.kube_api_url);
    }
    if config.gateway_enabled() {
        info!("Gateway user     : {}", config.gateway.credentials.username);
        info!("Gateway area     : {}", config.gateway.credentials.area_domain);
    }
    info!("------------------------------------------------------------");
}
