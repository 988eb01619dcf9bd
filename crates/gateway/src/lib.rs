//! apiscout Gateway
//!
//! Republishes API descriptions into a remote API gateway's object model
//! (Mashery-style REST v3). Provides:
//! - [`GatewayPublisher`]: builds the gateway objects and reconciles them
//!   with whatever the gateway already stores
//! - [`GatewayTemplates`]: defaults layered under generated objects
//! - Adapters implementing the [`GatewayClient`](apiscout_ports::GatewayClient) port
//!
//! ## Architecture
//!
//! ```text
//!  API description (held by the catalog)
//!         │
//!  ┌──────▼──────────┐   merge(template, generated)
//!  │ GatewayPublisher│   merge(existing, new)
//!  └──────┬──────────┘
//!         │ GatewayClient port
//!  ┌──────▼──────────┐
//!  │  MasheryClient  │──► services, services/docs, packages,
//!  └─────────────────┘    members/{id}/applications, applications/{id}/packageKeys
//! ```
//!
//! Every remote call is followed by a fixed throttle delay.

pub mod adapters;
pub mod error;
pub mod objects;
pub mod publisher;
pub mod templates;

// Re-export commonly used types
pub use adapters::MasheryClient;
pub use error::{PublishError, Result};
pub use publisher::{DEFAULT_CALL_DELAY, DocType, GatewayPublisher, Published, Retracted};
pub use templates::GatewayTemplates;
