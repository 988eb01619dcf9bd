use thiserror::Error;

/// Errors from the discovery transport
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryError {
    #[error("Watch connection failed: {0}")]
    Connect(String),

    #[error("Watch rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Malformed watch event: {0}")]
    Decode(String),
}

/// Errors from fetching a document
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("Connection to {url} failed: {message}")]
    Connect { url: String, message: String },

    #[error("Timed out fetching {url}")]
    Timeout { url: String },

    #[error("Unexpected status {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("Fetching {url} failed: {message}")]
    Other { url: String, message: String },
}

impl FetchError {
    /// Connection-establishment failure against the service's address
    ///
    /// Typed `Connect` errors qualify directly; other errors qualify when their
    /// text carries a connection-refused or dial-failure signature.
    pub fn is_connection_failure(&self) -> bool {
        match self {
            FetchError::Connect { .. } => true,
            FetchError::Other { message, .. } => has_connection_signature(message),
            FetchError::Timeout { .. } | FetchError::Status { .. } => false,
        }
    }
}

/// Whether an error message looks like a failure to establish a connection
pub fn has_connection_signature(message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    ["dial tcp", "connection refused", "error trying to connect"]
        .iter()
        .any(|sig| message.contains(sig))
}

/// Errors from on-disk persistence
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PersistenceError {
    #[error("File not found: {0}")]
    NotFound(String),

    #[error("I/O error on {path}: {message}")]
    Io { path: String, message: String },
}

/// Errors from the gateway REST client
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayClientError {
    #[error("Gateway connection failed: {0}")]
    Connect(String),

    #[error("Gateway call timed out: {0}")]
    Timeout(String),

    #[error("Gateway rejected {resource} with status {status}: {body}")]
    Rejected {
        resource: String,
        status: u16,
        body: String,
    },

    #[error("Gateway response could not be decoded: {0}")]
    Decode(String),

    #[error("Gateway transport error: {0}")]
    Transport(String),
}

/// Errors from the static-site generator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SiteError {
    #[error("Failed to start site generator: {0}")]
    Spawn(String),

    #[error("Site generator exited with {status}: {output}")]
    Failed { status: String, output: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_is_connection_failure() {
        let err = FetchError::Connect {
            url: "http://10.0.0.1:80/spec".into(),
            message: "refused".into(),
        };
        assert!(err.is_connection_failure());
    }

    #[test]
    fn test_signature_in_other_error() {
        let err = FetchError::Other {
            url: "http://10.0.0.1:80/spec".into(),
            message: "Get http://10.0.0.1:80/spec: dial tcp 10.0.0.1:80: connect: connection refused"
                .into(),
        };
        assert!(err.is_connection_failure());

        let err = FetchError::Other {
            url: "http://10.0.0.1:80/spec".into(),
            message: "body truncated".into(),
        };
        assert!(!err.is_connection_failure());
    }

    #[test]
    fn test_status_is_not_transient() {
        let err = FetchError::Status {
            url: "http://10.0.0.1:80/spec".into(),
            status: 503,
        };
        assert!(!err.is_connection_failure());
    }
}
