//! Catalog store
//!
//! Membership lives in a [`DashMap`] keyed by service name. Fetching happens
//! without holding any map guard; the commit (persist + insert) and the removal
//! (delete + drop) each run under the name's entry guard, so they serialize per
//! name while unrelated services proceed in parallel.

use crate::entry::{AddOutcome, CatalogEntry, IndexedDocument, RemoveOutcome};
use crate::error::{CatalogError, Result};
use crate::render::ArtifactRenderer;
use apiscout_core::{
    DocumentKind, GraphExt, ObjectGraph, ServiceDescriptor, artifact_file_name,
    document_file_name, kind_name,
};
use apiscout_ports::{ArtifactStore, DocumentFetcher, PersistenceError, StoreArea};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use log::{debug, info, warn};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;

pub struct CatalogStore {
    entries: DashMap<String, CatalogEntry>,
    fetcher: Arc<dyn DocumentFetcher>,
    store: Arc<dyn ArtifactStore>,
    renderer: ArtifactRenderer,
}

impl CatalogStore {
    pub fn new(fetcher: Arc<dyn DocumentFetcher>, store: Arc<dyn ArtifactStore>) -> Self {
        Self {
            entries: DashMap::new(),
            fetcher,
            store,
            renderer: ArtifactRenderer::default(),
        }
    }

    pub fn with_renderer(mut self, renderer: ArtifactRenderer) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn entry(&self, name: &str) -> Option<CatalogEntry> {
        self.entries.get(name).map(|e| e.value().clone())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Indexed service names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Fetch, persist and record the service's documents
    pub async fn add(&self, service: &ServiceDescriptor) -> Result<AddOutcome> {
        self.add_while(service, || true).await
    }

    /// Like [`add`](Self::add), but abandons the commit when `still_wanted`
    /// returns false once the documents are in hand
    ///
    /// `still_wanted` is evaluated under the name's entry guard, so a removal
    /// that invalidated the caller before the commit always wins.
    pub async fn add_while<F>(&self, service: &ServiceDescriptor, still_wanted: F) -> Result<AddOutcome>
    where
        F: Fn() -> bool + Send,
    {
        let name = service.name.as_str();
        if self.entries.contains_key(name) {
            debug!("Service {} is already indexed", name);
            return Ok(AddOutcome::AlreadyIndexed);
        }

        let address = service
            .address
            .as_ref()
            .ok_or_else(|| CatalogError::NoAddress(name.to_string()))?;
        let sources = service.document_sources();
        if sources.is_empty() {
            return Err(CatalogError::NoDocumentSource(name.to_string()));
        }

        let mut documents = Vec::with_capacity(sources.len());
        for source in sources {
            let url = address.url(&source.path);
            info!("{} should be indexed from URL {}", name, url);

            let bytes = self.fetcher.fetch(&url).await?;
            let mut document: ObjectGraph =
                serde_json::from_slice(&bytes).map_err(|e| CatalogError::MalformedDocument {
                    service: name.to_string(),
                    kind: source.kind,
                    reason: e.to_string(),
                })?;

            if !document.is_object() {
                return Err(CatalogError::MalformedDocument {
                    service: name.to_string(),
                    kind: source.kind,
                    reason: format!("expected an object, found {}", kind_name(&document)),
                });
            }
            if let Some(host) = document.get_mut("host") {
                *host = Value::String(address.to_string());
            }

            let title = document_title(&document);
            documents.push(IndexedDocument {
                kind: source.kind,
                document,
                title,
            });
        }

        self.commit(name, documents, still_wanted)
    }

    fn commit<F>(&self, name: &str, documents: Vec<IndexedDocument>, still_wanted: F) -> Result<AddOutcome>
    where
        F: Fn() -> bool,
    {
        match self.entries.entry(name.to_string()) {
            Entry::Occupied(_) => Ok(AddOutcome::AlreadyIndexed),
            Entry::Vacant(slot) => {
                if !still_wanted() {
                    info!("Service {} went away before its documents were stored", name);
                    return Ok(AddOutcome::Cancelled);
                }

                let mut written: Vec<(StoreArea, String)> = Vec::new();
                for doc in &documents {
                    if let Err(e) = self.persist(name, doc, &mut written) {
                        for (area, file) in &written {
                            if let Err(cleanup) = self.store.delete(*area, file) {
                                warn!("Could not clean up {} after failed add: {}", file, cleanup);
                            }
                        }
                        return Err(e);
                    }
                }

                slot.insert(CatalogEntry::indexed(&documents));
                info!("Service {} has been added", name);
                Ok(AddOutcome::Indexed(documents))
            }
        }
    }

    fn persist(
        &self,
        name: &str,
        doc: &IndexedDocument,
        written: &mut Vec<(StoreArea, String)>,
    ) -> Result<()> {
        let doc_file = document_file_name(name, doc.kind);
        let bytes = serde_json::to_vec(&doc.document).map_err(|e| CatalogError::MalformedDocument {
            service: name.to_string(),
            kind: doc.kind,
            reason: e.to_string(),
        })?;
        self.store.write(StoreArea::Documents, &doc_file, &bytes)?;
        written.push((StoreArea::Documents, doc_file));

        let artifact_file = artifact_file_name(name, doc.kind);
        let page = self.renderer.render(name, doc.kind, doc.title.as_deref());
        self.store
            .write(StoreArea::Artifacts, &artifact_file, page.as_bytes())?;
        written.push((StoreArea::Artifacts, artifact_file));
        Ok(())
    }

    /// Delete the service's files and drop it from the catalog
    ///
    /// The entry is dropped even when a delete fails; the first failure is
    /// returned. For an unknown name, leftover files are swept quietly,
    /// sparing any file another indexed service owns.
    pub fn remove(&self, service: &ServiceDescriptor) -> Result<RemoveOutcome> {
        let name = service.name.as_str();
        // Collected before the entry guard is taken; iterating under it would deadlock
        let owned = self.owned_files(name);
        match self.entries.entry(name.to_string()) {
            Entry::Vacant(_) => {
                self.sweep(name, &owned);
                Ok(RemoveOutcome::NotIndexed)
            }
            Entry::Occupied(slot) => {
                let mut first_error: Option<CatalogError> = None;
                let mut title: Option<String> = None;

                for kind in slot.get().kinds.clone() {
                    let doc_file = document_file_name(name, kind);
                    if title.is_none() {
                        title = self.stored_title(&doc_file);
                    }
                    for (area, file) in [
                        (StoreArea::Documents, doc_file),
                        (StoreArea::Artifacts, artifact_file_name(name, kind)),
                    ] {
                        if let Err(e) = self.store.delete(area, &file) {
                            warn!("Could not delete {} for {}: {}", file, name, e);
                            first_error.get_or_insert(CatalogError::Persistence(e));
                        }
                    }
                }

                let entry = slot.remove();
                info!("Service {} has been removed", name);

                match first_error {
                    Some(e) => Err(e),
                    None => Ok(RemoveOutcome::Removed {
                        title: title.or(entry.title),
                    }),
                }
            }
        }
    }

    fn stored_title(&self, doc_file: &str) -> Option<String> {
        let bytes = self.store.read(StoreArea::Documents, doc_file).ok()?;
        let document: ObjectGraph = serde_json::from_slice(&bytes).ok()?;
        document_title(&document)
    }

    /// Files belonging to indexed services other than `except`
    fn owned_files(&self, except: &str) -> HashSet<(StoreArea, String)> {
        let mut owned = HashSet::new();
        for entry in self.entries.iter().filter(|e| e.key() != except) {
            for kind in &entry.value().kinds {
                owned.insert((StoreArea::Documents, document_file_name(entry.key(), *kind)));
                owned.insert((StoreArea::Artifacts, artifact_file_name(entry.key(), *kind)));
            }
        }
        owned
    }

    fn sweep(&self, name: &str, owned: &HashSet<(StoreArea, String)>) {
        for kind in DocumentKind::ALL {
            for (area, file) in [
                (StoreArea::Documents, document_file_name(name, kind)),
                (StoreArea::Artifacts, artifact_file_name(name, kind)),
            ] {
                if owned.contains(&(area, file.clone())) {
                    debug!("Not sweeping {}, it belongs to an indexed service", file);
                    continue;
                }
                match self.store.delete(area, &file) {
                    Ok(()) => debug!("Swept stale file {}", file),
                    Err(PersistenceError::NotFound(_)) => {}
                    Err(e) => warn!("Could not sweep {}: {}", file, e),
                }
            }
        }
    }
}

fn document_title(document: &ObjectGraph) -> Option<String> {
    document
        .get("info")
        .and_then(|info| info.opt_str_field("title").ok().flatten())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryArtifactStore;
    use apiscout_core::annotations;
    use apiscout_ports::FetchError;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct FakeFetcher {
        responses: Mutex<HashMap<String, std::result::Result<Vec<u8>, FetchError>>>,
        calls: AtomicUsize,
    }

    impl FakeFetcher {
        fn serve(self, url: &str, body: &str) -> Self {
            self.responses
                .lock()
                .unwrap()
                .insert(url.to_string(), Ok(body.as_bytes().to_vec()));
            self
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl DocumentFetcher for FakeFetcher {
        async fn fetch(&self, url: &str) -> std::result::Result<Vec<u8>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.responses
                .lock()
                .unwrap()
                .get(url)
                .cloned()
                .unwrap_or_else(|| {
                    Err(FetchError::Connect {
                        url: url.to_string(),
                        message: "connection refused".to_string(),
                    })
                })
        }
    }

    fn invoice_svc() -> ServiceDescriptor {
        ServiceDescriptor::new("invoice-svc")
            .with_address("10.0.0.7", 8080)
            .with_annotation(annotations::INDEX, "true")
            .with_annotation(annotations::SWAGGER_URL, "/swagger.json")
    }

    const INVOICE_URL: &str = "http://10.0.0.7:8080/swagger.json";

    fn catalog(fetcher: FakeFetcher) -> (CatalogStore, Arc<FakeFetcher>, Arc<MemoryArtifactStore>) {
        let fetcher = Arc::new(fetcher);
        let store = Arc::new(MemoryArtifactStore::new());
        let catalog = CatalogStore::new(fetcher.clone(), store.clone());
        (catalog, fetcher, store)
    }

    #[tokio::test]
    async fn test_add_is_idempotent() {
        let (catalog, fetcher, store) =
            catalog(FakeFetcher::default().serve(INVOICE_URL, r#"{"info":{"title":"Invoice"}}"#));

        let first = catalog.add(&invoice_svc()).await.unwrap();
        assert!(matches!(first, AddOutcome::Indexed(_)));

        let second = catalog.add(&invoice_svc()).await.unwrap();
        assert_eq!(second, AddOutcome::AlreadyIndexed);

        assert_eq!(fetcher.calls(), 1);
        assert_eq!(store.len(), 2);
        assert_eq!(catalog.names(), vec!["invoice-svc".to_string()]);
    }

    #[tokio::test]
    async fn test_add_rewrites_host_and_renders_title() {
        let (catalog, _, store) = catalog(
            FakeFetcher::default().serve(INVOICE_URL, r#"{"info":{"title":"Invoice"},"host":"old:0"}"#),
        );

        let outcome = catalog.add(&invoice_svc()).await.unwrap();
        let doc = outcome.openapi_document().unwrap();
        assert_eq!(doc.document["host"], "10.0.0.7:8080");
        assert_eq!(doc.title.as_deref(), Some("Invoice"));

        let stored = store.text(StoreArea::Documents, "invoice-svc.json").unwrap();
        assert!(stored.contains("10.0.0.7:8080"));
        let page = store.text(StoreArea::Artifacts, "invoice-svc.md").unwrap();
        assert!(page.contains("title: \"Invoice\""));

        let entry = catalog.entry("invoice-svc").unwrap();
        assert_eq!(entry.kinds, vec![DocumentKind::OpenApi]);
        assert_eq!(entry.title.as_deref(), Some("Invoice"));
    }

    #[tokio::test]
    async fn test_host_is_not_added_when_absent() {
        let (catalog, _, _) = catalog(FakeFetcher::default().serve(INVOICE_URL, r#"{"openapi":"3.0.0"}"#));

        let outcome = catalog.add(&invoice_svc()).await.unwrap();
        let doc = outcome.openapi_document().unwrap();
        assert!(doc.document.get("host").is_none());
        assert_eq!(doc.title, None);
    }

    #[tokio::test]
    async fn test_add_then_remove_round_trip() {
        let (catalog, _, store) =
            catalog(FakeFetcher::default().serve(INVOICE_URL, r#"{"info":{"title":"Invoice"}}"#));

        catalog.add(&invoice_svc()).await.unwrap();
        let removed = catalog.remove(&invoice_svc()).unwrap();

        assert_eq!(
            removed,
            RemoveOutcome::Removed {
                title: Some("Invoice".to_string())
            }
        );
        assert!(!catalog.contains("invoice-svc"));
        assert!(store.is_empty());

        assert_eq!(catalog.remove(&invoice_svc()).unwrap(), RemoveOutcome::NotIndexed);
    }

    #[tokio::test]
    async fn test_malformed_document_is_not_indexed() {
        let (catalog, _, store) = catalog(FakeFetcher::default().serve(INVOICE_URL, "not json"));

        let err = catalog.add(&invoice_svc()).await.unwrap_err();
        assert!(matches!(err, CatalogError::MalformedDocument { .. }));
        assert!(!err.is_transient());
        assert!(!catalog.contains("invoice-svc"));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_service_is_transient() {
        let (catalog, _, _) = catalog(FakeFetcher::default());

        let err = catalog.add(&invoice_svc()).await.unwrap_err();
        assert!(err.is_transient());
        assert!(catalog.is_empty());
    }

    #[tokio::test]
    async fn test_missing_address_and_sources() {
        let (catalog, fetcher, _) = catalog(FakeFetcher::default());

        let no_address = ServiceDescriptor::new("a").with_annotation(annotations::SWAGGER_URL, "/s");
        assert_eq!(
            catalog.add(&no_address).await.unwrap_err(),
            CatalogError::NoAddress("a".to_string())
        );

        let no_source = ServiceDescriptor::new("b").with_address("h", 1);
        assert_eq!(
            catalog.add(&no_source).await.unwrap_err(),
            CatalogError::NoDocumentSource("b".to_string())
        );
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_add_writes_nothing() {
        let (catalog, _, store) =
            catalog(FakeFetcher::default().serve(INVOICE_URL, r#"{"info":{"title":"Invoice"}}"#));

        let outcome = catalog.add_while(&invoice_svc(), || false).await.unwrap();
        assert_eq!(outcome, AddOutcome::Cancelled);
        assert!(!catalog.contains("invoice-svc"));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_failed_write_rolls_back() {
        let svc = invoice_svc().with_annotation(annotations::ASYNC_API_URL, "/asyncapi.json");
        let (catalog, _, store) = catalog(
            FakeFetcher::default()
                .serve(INVOICE_URL, r#"{"info":{"title":"Invoice"}}"#)
                .serve("http://10.0.0.7:8080/asyncapi.json", r#"{"asyncapi":"2.0.0"}"#),
        );
        store.fail_writes_of("invoice-svc.asyncapi.md");

        let err = catalog.add(&svc).await.unwrap_err();
        assert!(matches!(err, CatalogError::Persistence(_)));
        assert!(!catalog.contains("invoice-svc"));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_remove_with_missing_file_still_drops_entry() {
        let (catalog, _, store) =
            catalog(FakeFetcher::default().serve(INVOICE_URL, r#"{"info":{"title":"Invoice"}}"#));

        catalog.add(&invoice_svc()).await.unwrap();
        store.delete(StoreArea::Artifacts, "invoice-svc.md").unwrap();

        let err = catalog.remove(&invoice_svc()).unwrap_err();
        assert!(matches!(err, CatalogError::Persistence(PersistenceError::NotFound(_))));
        assert!(!catalog.contains("invoice-svc"));
        assert!(!store.contains(StoreArea::Documents, "invoice-svc.json"));
    }

    #[tokio::test]
    async fn test_remove_unknown_sweeps_stale_files() {
        let (catalog, _, store) = catalog(FakeFetcher::default());
        store
            .write(StoreArea::Documents, "invoice-svc.json", b"{}")
            .unwrap();

        assert_eq!(catalog.remove(&invoice_svc()).unwrap(), RemoveOutcome::NotIndexed);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_sweep_spares_files_of_indexed_services() {
        let billing_events = ServiceDescriptor::new("billing-asyncapi")
            .with_address("10.0.0.8", 80)
            .with_annotation(annotations::INDEX, "true")
            .with_annotation(annotations::SWAGGER_URL, "/swagger.json");
        let (catalog, _, store) = catalog(
            FakeFetcher::default().serve("http://10.0.0.8:80/swagger.json", r#"{"info":{"title":"Events"}}"#),
        );
        catalog.add(&billing_events).await.unwrap();

        // An unannotated neighbour going away must not touch the indexed one
        let outcome = catalog.remove(&ServiceDescriptor::new("billing")).unwrap();
        assert_eq!(outcome, RemoveOutcome::NotIndexed);
        assert!(catalog.contains("billing-asyncapi"));
        assert!(store.contains(StoreArea::Documents, "billing-asyncapi.json"));
        assert!(store.contains(StoreArea::Artifacts, "billing-asyncapi.md"));
    }

    #[tokio::test]
    async fn test_asyncapi_add_does_not_overwrite_neighbour() {
        let billing_events = ServiceDescriptor::new("billing-asyncapi")
            .with_address("10.0.0.8", 80)
            .with_annotation(annotations::INDEX, "true")
            .with_annotation(annotations::SWAGGER_URL, "/swagger.json");
        let billing = ServiceDescriptor::new("billing")
            .with_address("10.0.0.9", 80)
            .with_annotation(annotations::INDEX, "true")
            .with_annotation(annotations::SWAGGER_URL, "/swagger.json")
            .with_annotation(annotations::ASYNC_API_URL, "/asyncapi.json");
        let (catalog, _, store) = catalog(
            FakeFetcher::default()
                .serve("http://10.0.0.8:80/swagger.json", r#"{"info":{"title":"Events"}}"#)
                .serve("http://10.0.0.9:80/swagger.json", r#"{"info":{"title":"Billing"}}"#)
                .serve("http://10.0.0.9:80/asyncapi.json", r#"{"info":{"title":"Billing events"}}"#),
        );

        catalog.add(&billing_events).await.unwrap();
        catalog.add(&billing).await.unwrap();
        assert_eq!(store.len(), 6);

        let events = store.text(StoreArea::Documents, "billing-asyncapi.json").unwrap();
        assert!(events.contains("\"Events\""));

        catalog.remove(&billing).unwrap();
        assert!(store.contains(StoreArea::Documents, "billing-asyncapi.json"));
        assert!(store.contains(StoreArea::Artifacts, "billing-asyncapi.md"));
        assert_eq!(store.len(), 2);
    }
}
