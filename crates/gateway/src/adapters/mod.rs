//! Gateway adapters
//!
//! Implementations of [`GatewayClient`](apiscout_ports::GatewayClient) for
//! concrete gateways.

pub mod mashery;

pub use mashery::MasheryClient;
