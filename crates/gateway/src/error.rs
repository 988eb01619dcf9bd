//! Error types for the gateway crate

use apiscout_core::GraphError;
use apiscout_merge::MergeError;
use apiscout_ports::GatewayClientError;
use thiserror::Error;

/// Publisher-level errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PublishError {
    #[error("Gateway call failed: {0}")]
    Client(#[from] GatewayClientError),

    #[error("Merge failed: {0}")]
    Merge(#[from] MergeError),

    #[error("Unexpected gateway response for {context}: {source}")]
    InvalidResponse {
        context: String,
        #[source]
        source: GraphError,
    },

    #[error("Gateway returned no {0}")]
    NotFound(String),

    #[error("Invalid gateway template: {0}")]
    InvalidTemplate(String),
}

impl PublishError {
    pub(crate) fn response(context: impl Into<String>) -> impl FnOnce(GraphError) -> Self {
        let context = context.into();
        move |source| PublishError::InvalidResponse { context, source }
    }
}

pub type Result<T> = std::result::Result<T, PublishError>;
