//! Catalog errors

use apiscout_core::DocumentKind;
use apiscout_ports::{FetchError, PersistenceError};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("Service {0} has no resolvable address")]
    NoAddress(String),

    #[error("Service {0} declares no document source")]
    NoDocumentSource(String),

    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Malformed {kind} document for {service}: {reason}")]
    MalformedDocument {
        service: String,
        kind: DocumentKind,
        reason: String,
    },

    #[error("Persistence failed: {0}")]
    Persistence(#[from] PersistenceError),
}

impl CatalogError {
    /// Connection-establishment failure worth retrying
    pub fn is_transient(&self) -> bool {
        matches!(self, CatalogError::Fetch(e) if e.is_connection_failure())
    }
}

pub type Result<T> = std::result::Result<T, CatalogError>;
