use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::document::DocumentKind;

/// Annotation keys read from discovered services
pub mod annotations {
    /// `"true"` opts the service into the catalog
    pub const INDEX: &str = "apiscout/index";
    /// Path of the OpenAPI document on the service
    pub const SWAGGER_URL: &str = "apiscout/swaggerUrl";
    /// Path of the AsyncAPI document on the service
    pub const ASYNC_API_URL: &str = "apiscout/asyncApiUrl";
    /// Kind of the document served at `SWAGGER_URL` (`openapi` or `asyncapi`)
    pub const API_TYPE: &str = "apiscout/apiType";
    /// `"true"` (any case) republishes the document to the gateway
    pub const PUBLISH_TO_GATEWAY: &str = "apiscout/publishToMashery";
    /// `"true"` (any case) creates a package/plan and a test key
    pub const CREATE_PLAN: &str = "masheryCreatePackagePlan";
    /// Documentation flavour sent to the gateway (`IODOC` or `SWAGGER`)
    pub const PUBLISH_DOC_TYPE: &str = "masheryPublishDocType";
}

/// Network address the service's documents are fetched from
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServiceAddress {
    pub host: String,
    pub port: u16,
}

impl ServiceAddress {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// URL of `path` on this address
    pub fn url(&self, path: &str) -> String {
        format!("http://{}:{}{}", self.host, self.port, path)
    }
}

impl std::fmt::Display for ServiceAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// A document a service declares through its annotations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSource {
    pub kind: DocumentKind,
    pub path: String,
}

/// Snapshot of a discovered service
///
/// Identity is the `name`; nothing else is carried from one event to the next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    pub name: String,
    /// Resolved per deployment mode; `None` when the service exposes no port
    pub address: Option<ServiceAddress>,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
}

impl ServiceDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: None,
            annotations: BTreeMap::new(),
        }
    }

    pub fn with_address(mut self, host: impl Into<String>, port: u16) -> Self {
        self.address = Some(ServiceAddress::new(host, port));
        self
    }

    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations.insert(key.into(), value.into());
        self
    }

    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.annotations.get(key).map(String::as_str)
    }

    /// Whether the service opted into the catalog (exact `"true"`)
    pub fn is_indexed(&self) -> bool {
        self.annotation(annotations::INDEX) == Some("true")
    }

    /// Whether the document should be republished to the gateway
    pub fn publishes_to_gateway(&self) -> bool {
        self.flag(annotations::PUBLISH_TO_GATEWAY)
    }

    /// Whether publishing should also create a package, plan and test key
    pub fn creates_plan(&self) -> bool {
        self.flag(annotations::CREATE_PLAN)
    }

    /// Raw documentation flavour requested for the gateway, if any
    pub fn publish_doc_type(&self) -> Option<&str> {
        self.annotation(annotations::PUBLISH_DOC_TYPE)
            .filter(|v| !v.trim().is_empty())
    }

    /// Documents declared through annotations, OpenAPI first
    pub fn document_sources(&self) -> Vec<DocumentSource> {
        let mut sources = Vec::new();

        if let Some(path) = self.non_empty(annotations::SWAGGER_URL) {
            let kind = self
                .annotation(annotations::API_TYPE)
                .and_then(DocumentKind::from_api_type)
                .unwrap_or(DocumentKind::OpenApi);
            sources.push(DocumentSource {
                kind,
                path: path.to_string(),
            });
        }

        if let Some(path) = self.non_empty(annotations::ASYNC_API_URL) {
            // A second AsyncAPI source would collide on file names
            if !sources.iter().any(|s| s.kind == DocumentKind::AsyncApi) {
                sources.push(DocumentSource {
                    kind: DocumentKind::AsyncApi,
                    path: path.to_string(),
                });
            }
        }

        sources
    }

    fn flag(&self, key: &str) -> bool {
        self.annotation(key)
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
    }

    fn non_empty(&self, key: &str) -> Option<&str> {
        self.annotation(key).filter(|v| !v.trim().is_empty())
    }
}
