//! Document kinds and the file names derived from a service name

use serde::{Deserialize, Serialize};

/// Kind of API description a service exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    /// OpenAPI / Swagger document
    OpenApi,
    /// AsyncAPI document
    AsyncApi,
}

impl DocumentKind {
    pub const ALL: [DocumentKind; 2] = [DocumentKind::OpenApi, DocumentKind::AsyncApi];

    /// Short label used in rendered artifacts and logs
    pub fn label(&self) -> &'static str {
        match self {
            DocumentKind::OpenApi => "openapi",
            DocumentKind::AsyncApi => "asyncapi",
        }
    }

    /// Parse the `apiscout/apiType` annotation value
    pub fn from_api_type(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "openapi" | "swagger" => Some(DocumentKind::OpenApi),
            "asyncapi" => Some(DocumentKind::AsyncApi),
            _ => None,
        }
    }

    /// Service names are DNS labels, so the dotted suffix never collides
    /// with another service's OpenAPI stem
    fn file_stem(&self, name: &str) -> String {
        match self {
            DocumentKind::OpenApi => slug(name),
            DocumentKind::AsyncApi => format!("{}.asyncapi", slug(name)),
        }
    }
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// File-system friendly form of a service name: lower-cased, spaces → hyphens
pub fn slug(name: &str) -> String {
    name.to_lowercase().replace(' ', "-")
}

/// File name of the persisted document: `invoice-svc.json`
pub fn document_file_name(name: &str, kind: DocumentKind) -> String {
    format!("{}.json", kind.file_stem(name))
}

/// File name of the rendered companion artifact: `invoice-svc.md`
pub fn artifact_file_name(name: &str, kind: DocumentKind) -> String {
    format!("{}.md", kind.file_stem(name))
}
