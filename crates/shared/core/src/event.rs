use serde::{Deserialize, Serialize};

use crate::service::ServiceDescriptor;

/// Kind of a discovery notification
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    Added,
    Modified,
    Deleted,
    Error,
    Unknown(String),
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventKind::Added => f.write_str("ADDED"),
            EventKind::Modified => f.write_str("MODIFIED"),
            EventKind::Deleted => f.write_str("DELETED"),
            EventKind::Error => f.write_str("ERROR"),
            EventKind::Unknown(kind) => write!(f, "UNKNOWN({})", kind),
        }
    }
}

/// A notification from the discovery transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiscoveryEvent {
    Added(ServiceDescriptor),
    Modified(ServiceDescriptor),
    Deleted(ServiceDescriptor),
    /// Transport-level error notification (carries a description only)
    Error(String),
    /// A notification type this system does not understand
    Unknown(String),
}

impl DiscoveryEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            DiscoveryEvent::Added(_) => EventKind::Added,
            DiscoveryEvent::Modified(_) => EventKind::Modified,
            DiscoveryEvent::Deleted(_) => EventKind::Deleted,
            DiscoveryEvent::Error(_) => EventKind::Error,
            DiscoveryEvent::Unknown(kind) => EventKind::Unknown(kind.clone()),
        }
    }

    pub fn service(&self) -> Option<&ServiceDescriptor> {
        match self {
            DiscoveryEvent::Added(svc)
            | DiscoveryEvent::Modified(svc)
            | DiscoveryEvent::Deleted(svc) => Some(svc),
            DiscoveryEvent::Error(_) | DiscoveryEvent::Unknown(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_kind() {
        let svc = ServiceDescriptor::new("invoice-svc");
        assert_eq!(DiscoveryEvent::Added(svc.clone()).kind(), EventKind::Added);
        assert_eq!(
            DiscoveryEvent::Deleted(svc.clone()).service().map(|s| s.name.as_str()),
            Some("invoice-svc")
        );
        assert!(DiscoveryEvent::Error("gone".into()).service().is_none());
        assert_eq!(
            DiscoveryEvent::Unknown("BOOKMARK".into()).kind().to_string(),
            "UNKNOWN(BOOKMARK)"
        );
    }
}
