//! apiscout Catalog
//!
//! Owns the set of indexed services and the files that back it:
//!
//! - **CatalogStore**: membership map plus add/remove side effects
//! - **Rendering**: Hugo front-matter Markdown companions for each document
//! - **Adapters**: filesystem and in-memory [`ArtifactStore`]s, reqwest-based
//!   [`DocumentFetcher`]
//!
//! ## Invariant
//!
//! A service name is in the catalog iff its documents and artifacts exist in
//! the store. Add and remove both commit under the name's map entry, so a
//! retried add racing a removal cannot leave a half-indexed service behind.
//!
//! [`ArtifactStore`]: apiscout_ports::ArtifactStore
//! [`DocumentFetcher`]: apiscout_ports::DocumentFetcher

pub mod entry;
pub mod error;
pub mod fs;
pub mod http;
pub mod memory;
pub mod render;
pub mod store;

pub use entry::{AddOutcome, CatalogEntry, CatalogStatus, IndexedDocument, RemoveOutcome};
pub use error::{CatalogError, Result};
pub use fs::FsArtifactStore;
pub use http::HttpDocumentFetcher;
pub use memory::MemoryArtifactStore;
pub use render::ArtifactRenderer;
pub use store::CatalogStore;
