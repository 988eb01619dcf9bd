//! In-process discovery source fed through a tokio channel

use apiscout_core::DiscoveryEvent;
use apiscout_ports::{DiscoveryError, DiscoverySource};
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Discovery source backed by an `mpsc` channel
///
/// The stream ends once every sender has been dropped.
pub struct ChannelDiscovery {
    rx: mpsc::Receiver<DiscoveryEvent>,
}

impl ChannelDiscovery {
    /// Create a source and the sender that feeds it
    pub fn pair(capacity: usize) -> (mpsc::Sender<DiscoveryEvent>, Self) {
        let (tx, rx) = mpsc::channel(capacity);
        (tx, Self { rx })
    }
}

#[async_trait]
impl DiscoverySource for ChannelDiscovery {
    async fn next(&mut self) -> Result<Option<DiscoveryEvent>, DiscoveryError> {
        Ok(self.rx.recv().await)
    }

    fn name(&self) -> &str {
        "ChannelDiscovery"
    }
}
