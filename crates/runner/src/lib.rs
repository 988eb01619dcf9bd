//! apiscout Runner
//!
//! Everything the `apiscout` binary needs around the reconciler:
//!
//! - **Config**: JSON file or environment variables
//! - **Kube**: the cluster service watch as a [`DiscoverySource`](apiscout_ports::DiscoverySource)
//! - **Site**: Hugo regeneration as a [`SiteGenerator`](apiscout_ports::SiteGenerator)
//! - **Bootstrap**: wiring of catalog, gateway and watch
//!
//! ## Architecture
//!
//! ```text
//!  API server ── watch ──► KubeWatchSource
//!                               │
//!                          Reconciler ──► FsArtifactStore ──► SWAGGERSTORE / HUGOSTORE
//!                               │    ──► MasheryClient (when USERNAME is set)
//!                               └──────► HugoSiteGenerator (when HUGODIR is set)
//! ```

pub mod bootstrap;
pub mod config;
pub mod kube;
pub mod site;

pub use bootstrap::{BootstrapError, build_reconciler, build_source, load_templates, log_config};
pub use config::{ConfigError, GatewaySettings, RetrySettings, RunMode, ScoutConfig};
pub use kube::KubeWatchSource;
pub use site::HugoSiteGenerator;
