use apiscout_core::ObjectGraph;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::GatewayClientError;

/// Credentials for the gateway's password-grant token exchange
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayCredentials {
    pub username: String,
    pub password: String,
    pub api_key: String,
    pub api_secret: String,
    /// Area UUID, sent as the token scope
    pub area_id: String,
    /// Public portal domain of the area, e.g. `acme.api.mashery.com`
    pub area_domain: String,
}

impl std::fmt::Debug for GatewayCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayCredentials")
            .field("username", &self.username)
            .field("password", &"***")
            .field("api_key", &self.api_key)
            .field("api_secret", &"***")
            .field("area_id", &self.area_id)
            .field("area_domain", &self.area_domain)
            .finish()
    }
}

/// Port for the remote API-gateway's REST object model
///
/// Objects are addressed by resource path (`services`, `services/{id}`,
/// `packages`, `members/{id}/applications`, ...). `fields` is the projection
/// passed as the `fields` query parameter; empty means "server default".
#[async_trait]
pub trait GatewayClient: Send + Sync {
    /// Exchange credentials for a bearer token
    async fn fetch_token(
        &self,
        credentials: &GatewayCredentials,
    ) -> Result<String, GatewayClientError>;

    /// `GET object?filter=..&fields=..`; list reads return a JSON array
    async fn read(
        &self,
        object: &str,
        filter: &str,
        fields: &str,
        token: &str,
    ) -> Result<ObjectGraph, GatewayClientError>;

    /// `POST object?fields=..`
    async fn create(
        &self,
        object: &str,
        fields: &str,
        body: &ObjectGraph,
        token: &str,
    ) -> Result<ObjectGraph, GatewayClientError>;

    /// `PUT path?fields=..`
    async fn update(
        &self,
        path: &str,
        fields: &str,
        body: &ObjectGraph,
        token: &str,
    ) -> Result<ObjectGraph, GatewayClientError>;

    /// `DELETE path`
    async fn delete(&self, path: &str, token: &str) -> Result<ObjectGraph, GatewayClientError>;

    /// Convert a document between formats (e.g. `swagger2` → `masheryapi`)
    async fn transform(
        &self,
        body: &ObjectGraph,
        source_format: &str,
        target_format: &str,
        token: &str,
    ) -> Result<ObjectGraph, GatewayClientError>;
}
