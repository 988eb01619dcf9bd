//! apiscout Ports
//!
//! Port definitions (traits) for the collaborators apiscout talks to.
//! These define the boundaries between reconciliation logic and infrastructure:
//! the cluster watch, document fetching, the gateway REST API, the static site
//! generator and on-disk persistence.

mod discovery;
mod error;
mod fetch;
mod gateway;
mod site;
mod store;

pub use discovery::DiscoverySource;
pub use error::{
    DiscoveryError, FetchError, GatewayClientError, PersistenceError, SiteError,
    has_connection_signature,
};
pub use fetch::DocumentFetcher;
pub use gateway::{GatewayClient, GatewayCredentials};
pub use site::SiteGenerator;
pub use store::{ArtifactStore, StoreArea};
