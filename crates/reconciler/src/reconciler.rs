//! Event-driven membership reconciler
//!
//! Events are handled one at a time, in arrival order. Only retries run
//! concurrently, each on its own delayed tokio task.

use crate::retry::{RetryPolicy, RetryState};
use apiscout_catalog::{AddOutcome, CatalogStore, RemoveOutcome};
use apiscout_core::{DiscoveryEvent, EventKind, ServiceDescriptor};
use apiscout_gateway::{DocType, GatewayPublisher, GatewayTemplates};
use apiscout_ports::{DiscoveryError, DiscoverySource, SiteGenerator};
use dashmap::DashSet;
use log::{debug, error, info, warn};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

type RetryTask = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// What handling an event amounted to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// Nothing to do (not annotated, error or unknown notification)
    Ignored,
    Indexed,
    AlreadyIndexed,
    Removed,
    NotIndexed,
    /// A transient failure; `attempt` will run after the retry delay
    RetryScheduled { attempt: u32 },
    /// A transient failure with no retries left
    RetriesExhausted,
    /// A non-transient failure; the event was dropped
    Dropped,
    /// The service went away while its add was in flight
    Cancelled,
}

/// Gateway publishing settings
pub struct GatewayHook {
    pub publisher: GatewayPublisher,
    pub templates: GatewayTemplates,
}

/// Turns discovery events into catalog (and gateway) mutations
///
/// Cheap to clone; clones share the catalog and the retry bookkeeping.
#[derive(Clone)]
pub struct Reconciler {
    catalog: Arc<CatalogStore>,
    gateway: Option<Arc<GatewayHook>>,
    site: Option<Arc<dyn SiteGenerator>>,
    policy: RetryPolicy,
    retries: Arc<RetryState>,
    /// Services this process published to the gateway
    published: Arc<DashSet<String>>,
}

impl Reconciler {
    pub fn new(catalog: Arc<CatalogStore>) -> Self {
        Self {
            catalog,
            gateway: None,
            site: None,
            policy: RetryPolicy::default(),
            retries: Arc::new(RetryState::default()),
            published: Arc::new(DashSet::new()),
        }
    }

    pub fn with_gateway(mut self, hook: GatewayHook) -> Self {
        self.gateway = Some(Arc::new(hook));
        self
    }

    pub fn with_site_generator(mut self, site: Arc<dyn SiteGenerator>) -> Self {
        self.site = Some(site);
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn catalog(&self) -> &Arc<CatalogStore> {
        &self.catalog
    }

    /// Retry tasks currently scheduled or running
    pub fn pending_retries(&self) -> usize {
        self.retries.pending()
    }

    pub fn has_pending_retry(&self, name: &str) -> bool {
        self.retries.is_pending(name)
    }

    /// Consume `source` until it ends
    pub async fn run<S>(&self, source: &mut S) -> Result<(), DiscoveryError>
    where
        S: DiscoverySource + ?Sized,
    {
        info!("Reconciler consuming events from {}", source.name());
        while let Some(event) = source.next().await? {
            self.handle(event, 0).await;
        }
        info!("Event stream from {} ended", source.name());
        Ok(())
    }

    /// Handle one event; `attempt` is 0 for events from the source
    pub async fn handle(&self, event: DiscoveryEvent, attempt: u32) -> Disposition {
        match &event {
            DiscoveryEvent::Added(svc) | DiscoveryEvent::Modified(svc) | DiscoveryEvent::Deleted(svc) => {
                info!("Received {} for {}", event.kind(), svc.name);
            }
            DiscoveryEvent::Error(message) => {
                warn!("Received watch error, ignoring: {}", message);
                return Disposition::Ignored;
            }
            DiscoveryEvent::Unknown(kind) => {
                warn!("Received unknown event type {}, ignoring", kind);
                return Disposition::Ignored;
            }
        }

        let disposition = match event {
            DiscoveryEvent::Added(svc) => {
                if !svc.is_indexed() {
                    debug!("{} is not annotated for indexing", svc.name);
                    return Disposition::Ignored;
                }
                self.add(svc, EventKind::Added, attempt, None).await
            }
            DiscoveryEvent::Deleted(svc) => {
                self.cancel_retry(&svc.name);
                self.remove(&svc).await
            }
            DiscoveryEvent::Modified(svc) => {
                self.cancel_retry(&svc.name);
                let removed = self.remove(&svc).await;
                if svc.is_indexed() {
                    self.add(svc, EventKind::Modified, attempt, None).await
                } else {
                    removed
                }
            }
            DiscoveryEvent::Error(_) | DiscoveryEvent::Unknown(_) => Disposition::Ignored,
        };

        self.regenerate_site().await;
        disposition
    }

    fn cancel_retry(&self, name: &str) {
        if self.retries.invalidate(name) {
            info!("Cancelled pending retry for {}", name);
        }
    }

    /// Add with retry
    ///
    /// `task` is the retry task running this attempt; its commit is abandoned
    /// once the task loses the name's retry slot.
    async fn add(&self, svc: ServiceDescriptor, kind: EventKind, attempt: u32, task: Option<u64>) -> Disposition {
        let retries = self.retries.clone();
        let name = svc.name.clone();

        let result = self
            .catalog
            .add_while(&svc, move || task.is_none_or(|task| retries.owns(&name, task)))
            .await;

        match result {
            Ok(outcome @ AddOutcome::Indexed(_)) => {
                self.publish(&svc, &outcome).await;
                Disposition::Indexed
            }
            Ok(AddOutcome::AlreadyIndexed) => Disposition::AlreadyIndexed,
            Ok(AddOutcome::Cancelled) => Disposition::Cancelled,
            Err(e) if e.is_transient() => {
                if self.policy.allows_retry_after(attempt) {
                    let next = attempt + 1;
                    info!(
                        "Retrying {} in {:?} (attempt {} of {}): {}",
                        svc.name, self.policy.delay, next, self.policy.max_retries, e
                    );
                    self.schedule_retry(svc, kind, next, task);
                    Disposition::RetryScheduled { attempt: next }
                } else {
                    warn!("Retries exhausted for {}: {}", svc.name, e);
                    Disposition::RetriesExhausted
                }
            }
            Err(e) => {
                error!("Could not index {}: {}", svc.name, e);
                Disposition::Dropped
            }
        }
    }

    fn schedule_retry(&self, svc: ServiceDescriptor, kind: EventKind, attempt: u32, current: Option<u64>) {
        let name = svc.name.clone();
        let this = self.clone();
        self.retries
            .spawn(&name, current, move |task| this.retry_task(svc, kind, attempt, task));
    }

    fn retry_task(self, svc: ServiceDescriptor, kind: EventKind, attempt: u32, task: u64) -> RetryTask {
        Box::pin(async move {
            tokio::time::sleep(self.policy.delay).await;

            if !self.retries.owns(&svc.name, task) {
                debug!("Dropping stale retry of {} for {}", kind, svc.name);
                return;
            }

            info!("Retrying {} for {} (attempt {})", kind, svc.name, attempt);
            let name = svc.name.clone();
            let disposition = self.add(svc, kind, attempt, Some(task)).await;
            debug!("Retry attempt {} finished: {:?}", attempt, disposition);
            self.retries.finish(&name, task);
            self.regenerate_site().await;
        })
    }

    /// Drop the service from the catalog and withdraw it from the gateway
    async fn remove(&self, svc: &ServiceDescriptor) -> Disposition {
        info!("Attempting to delete {}", svc.name);
        match self.catalog.remove(svc) {
            Ok(RemoveOutcome::Removed { title }) => {
                self.retract(svc, title.as_deref()).await;
                Disposition::Removed
            }
            Ok(RemoveOutcome::NotIndexed) => {
                debug!("{} was not indexed", svc.name);
                Disposition::NotIndexed
            }
            Err(e) => {
                error!("Could not remove {}: {}", svc.name, e);
                Disposition::Dropped
            }
        }
    }

    async fn publish(&self, svc: &ServiceDescriptor, outcome: &AddOutcome) {
        let Some(hook) = self.gateway_for(svc) else {
            return;
        };
        let Some(doc) = outcome.openapi_document() else {
            warn!("{} has no OpenAPI document to publish", svc.name);
            return;
        };

        let doc_type = DocType::from_annotation(svc.publish_doc_type());
        match hook
            .publisher
            .publish(&doc.document, doc_type, svc.creates_plan(), &hook.templates)
            .await
        {
            Ok(published) => {
                self.published.insert(svc.name.clone());
                info!("Published {} to the gateway as {}", svc.name, published.definition_id)
            }
            Err(e) => error!("Could not publish {} to the gateway: {}", svc.name, e),
        }
    }

    /// Withdraw a service that asks for publishing or that was published
    /// earlier, even if its annotation has since been dropped
    async fn retract(&self, svc: &ServiceDescriptor, title: Option<&str>) {
        let was_published = self.published.remove(&svc.name).is_some();
        if !was_published && !svc.publishes_to_gateway() {
            return;
        }
        let Some(hook) = self.gateway.as_deref() else {
            warn!("{} asks for gateway publishing but no gateway is configured", svc.name);
            return;
        };
        let Some(title) = title else {
            warn!("No title recovered for {}, nothing to retract", svc.name);
            return;
        };

        match hook.publisher.retract(title).await {
            Ok(retracted) => info!("Retracted {} from the gateway ({} objects)", title, retracted.deleted.len()),
            Err(e) => error!("Could not retract {} from the gateway: {}", title, e),
        }
    }

    fn gateway_for(&self, svc: &ServiceDescriptor) -> Option<&GatewayHook> {
        if !svc.publishes_to_gateway() {
            return None;
        }
        let hook = self.gateway.as_deref();
        if hook.is_none() {
            warn!("{} asks for gateway publishing but no gateway is configured", svc.name);
        }
        hook
    }

    async fn regenerate_site(&self) {
        let Some(site) = &self.site else {
            return;
        };
        match site.regenerate().await {
            Ok(output) => debug!("{} output: {}", site.name(), output.trim()),
            Err(e) => error!("Error while regenerating site content: {}", e),
        }
    }
}
