//! Catalog entries and operation outcomes

use apiscout_core::{DocumentKind, ObjectGraph};
use chrono::{DateTime, Utc};

/// Status of a service in the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogStatus {
    Indexed,
}

/// What the catalog knows about an indexed service
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    pub status: CatalogStatus,
    /// Document kinds persisted for this service, OpenAPI first
    pub kinds: Vec<DocumentKind>,
    /// `info.title` of the first document that declared one
    pub title: Option<String>,
    pub indexed_at: DateTime<Utc>,
}

impl CatalogEntry {
    pub fn indexed(documents: &[IndexedDocument]) -> Self {
        Self {
            status: CatalogStatus::Indexed,
            kinds: documents.iter().map(|d| d.kind).collect(),
            title: documents.iter().find_map(|d| d.title.clone()),
            indexed_at: Utc::now(),
        }
    }
}

/// A fetched and patched document, as persisted
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedDocument {
    pub kind: DocumentKind,
    /// Document with its `host` rewritten to the resolved address
    pub document: ObjectGraph,
    pub title: Option<String>,
}

/// Result of [`CatalogStore::add`](crate::CatalogStore::add)
#[derive(Debug, Clone, PartialEq)]
pub enum AddOutcome {
    /// Fetched, persisted and recorded
    Indexed(Vec<IndexedDocument>),
    /// The name was already in the catalog; nothing was fetched or written
    AlreadyIndexed,
    /// The caller withdrew interest before the commit (service went away)
    Cancelled,
}

impl AddOutcome {
    /// The OpenAPI document of a fresh index, if any
    pub fn openapi_document(&self) -> Option<&IndexedDocument> {
        match self {
            AddOutcome::Indexed(docs) => docs.iter().find(|d| d.kind == DocumentKind::OpenApi),
            AddOutcome::AlreadyIndexed | AddOutcome::Cancelled => None,
        }
    }
}

/// Result of [`CatalogStore::remove`](crate::CatalogStore::remove)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoveOutcome {
    /// Files deleted and entry dropped; `title` was read back from the stored document
    Removed { title: Option<String> },
    /// The name was not in the catalog
    NotIndexed,
}
