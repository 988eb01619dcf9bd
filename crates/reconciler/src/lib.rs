//! apiscout Reconciler
//!
//! Drives catalog membership from the discovery event stream:
//!
//! ```text
//!  DiscoverySource (cluster watch, channel)
//!         │ DiscoveryEvent, in order
//!  ┌──────▼──────────┐
//!  │   Reconciler    │──► CatalogStore (fetch, persist, render)
//!  └──────┬──────────┘──► GatewayPublisher (publish / retract)
//!         │           ──► SiteGenerator (after every add/remove)
//!         │ transient failure
//!  ┌──────▼──────────┐
//!  │   RetryState    │  one delayed task per service, bounded attempts,
//!  └─────────────────┘  cancelled by Deleted / Modified
//! ```
//!
//! Added is retried on connection failures; Modified is remove then add.

pub mod channel;
pub mod reconciler;
pub mod retry;

pub use channel::ChannelDiscovery;
pub use reconciler::{Disposition, GatewayHook, Reconciler};
pub use retry::RetryPolicy;
