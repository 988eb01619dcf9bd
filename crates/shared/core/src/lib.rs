//! apiscout Core Domain
//!
//! Pure domain types shared by every apiscout component.
//! This crate contains no async and no I/O.

pub mod document;
pub mod event;
pub mod graph;
pub mod service;

// Re-export commonly used types at crate root
pub use document::{DocumentKind, artifact_file_name, document_file_name, slug};
pub use event::{DiscoveryEvent, EventKind};
pub use graph::{GraphError, GraphExt, ObjectGraph, ObjectMap, kind_name};
pub use service::{DocumentSource, ServiceAddress, ServiceDescriptor, annotations};
