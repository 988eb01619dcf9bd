use apiscout_core::DiscoveryEvent;
use async_trait::async_trait;

use crate::error::DiscoveryError;

/// Port for the service-registry watch
///
/// Events are delivered one at a time, in order. Implementations block the
/// caller until the next event is available.
#[async_trait]
pub trait DiscoverySource: Send {
    /// Wait for the next event; `Ok(None)` once the stream has ended for good
    async fn next(&mut self) -> Result<Option<DiscoveryEvent>, DiscoveryError>;

    /// Get the source's name for logging
    fn name(&self) -> &str {
        "DiscoverySource"
    }
}
