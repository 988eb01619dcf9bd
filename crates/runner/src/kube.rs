//! Kubernetes service watch
//!
//! Streams `GET /api/v1/services?watch=true` and turns each newline-delimited
//! watch event into a [`DiscoveryEvent`]. The watch is reopened whenever the
//! API server closes it, resuming from the last seen `resourceVersion`.

use apiscout_core::{DiscoveryEvent, ServiceAddress, ServiceDescriptor};
use apiscout_ports::{DiscoveryError, DiscoverySource};
use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::{Certificate, Client, Response, StatusCode};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

const SERVICES_PATH: &str = "/api/v1/services";
const SERVICE_ACCOUNT_DIR: &str = "/var/run/secrets/kubernetes.io/serviceaccount";
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

#[derive(Deserialize)]
struct WatchEvent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    object: serde_json::Value,
}

#[derive(Deserialize)]
struct KubeService {
    metadata: ObjectMeta,
    #[serde(default)]
    spec: ServiceSpec,
}

#[derive(Deserialize)]
struct ObjectMeta {
    #[serde(default)]
    name: String,
    #[serde(default)]
    annotations: BTreeMap<String, String>,
    #[serde(rename = "resourceVersion", default)]
    resource_version: Option<String>,
}

#[derive(Deserialize, Default)]
struct ServiceSpec {
    #[serde(rename = "clusterIP", default)]
    cluster_ip: Option<String>,
    #[serde(default)]
    ports: Vec<ServicePort>,
}

#[derive(Deserialize)]
struct ServicePort {
    port: u16,
    #[serde(rename = "nodePort", default)]
    node_port: Option<u16>,
}

/// `Status` object carried by `ERROR` watch events
#[derive(Deserialize, Default)]
struct WatchStatus {
    #[serde(default)]
    code: u16,
    #[serde(default)]
    message: String,
}

/// One decoded watch line
#[derive(Debug, PartialEq)]
pub(crate) struct WatchLine {
    pub event: DiscoveryEvent,
    pub resource_version: Option<String>,
    /// The server no longer has history for our `resourceVersion`
    pub expired: bool,
}

/// Decode one watch line; `external_ip` selects node-port addressing
pub(crate) fn parse_watch_line(
    line: &[u8],
    external_ip: Option<&str>,
) -> Result<WatchLine, DiscoveryError> {
    let event: WatchEvent =
        serde_json::from_slice(line).map_err(|e| DiscoveryError::Decode(e.to_string()))?;

    let service = |object: serde_json::Value| -> Result<(ServiceDescriptor, Option<String>), DiscoveryError> {
        let svc: KubeService =
            serde_json::from_value(object).map_err(|e| DiscoveryError::Decode(e.to_string()))?;
        let version = svc.metadata.resource_version.clone();
        Ok((descriptor(svc, external_ip), version))
    };

    let line = match event.kind.as_str() {
        "ADDED" | "MODIFIED" | "DELETED" => {
            let (svc, resource_version) = service(event.object)?;
            let event = match event.kind.as_str() {
                "ADDED" => DiscoveryEvent::Added(svc),
                "MODIFIED" => DiscoveryEvent::Modified(svc),
                _ => DiscoveryEvent::Deleted(svc),
            };
            WatchLine {
                event,
                resource_version,
                expired: false,
            }
        }
        "ERROR" => {
            let status: WatchStatus = serde_json::from_value(event.object).unwrap_or_default();
            WatchLine {
                event: DiscoveryEvent::Error(status.message),
                resource_version: None,
                expired: status.code == StatusCode::GONE.as_u16(),
            }
        }
        other => {
            let resource_version = event
                .object
                .pointer("/metadata/resourceVersion")
                .and_then(serde_json::Value::as_str)
                .map(str::to_string);
            WatchLine {
                event: DiscoveryEvent::Unknown(other.to_string()),
                resource_version,
                expired: false,
            }
        }
    };
    Ok(line)
}

/// Resolve the address documents are fetched from
///
/// With an external IP the first port's node port is used, otherwise the
/// cluster IP and the first port. Headless services have no address.
fn descriptor(svc: KubeService, external_ip: Option<&str>) -> ServiceDescriptor {
    let mut descriptor = ServiceDescriptor::new(svc.metadata.name);
    descriptor.annotations = svc.metadata.annotations;

    let first = svc.spec.ports.first();
    descriptor.address = match (external_ip, first) {
        (Some(ip), Some(port)) => port
            .node_port
            .map(|node_port| ServiceAddress::new(ip, node_port)),
        (None, Some(port)) => svc
            .spec
            .cluster_ip
            .filter(|ip| !ip.is_empty() && ip != "None")
            .map(|ip| ServiceAddress::new(ip, port.port)),
        (_, None) => None,
    };
    descriptor
}

/// Discovery source watching every service in the cluster
pub struct KubeWatchSource {
    client: Client,
    base_url: String,
    token: Option<String>,
    external_ip: Option<String>,
    resource_version: Option<String>,
    response: Option<Response>,
    buffer: Vec<u8>,
    connected_once: bool,
}

impl KubeWatchSource {
    /// Watch through a plain base URL, e.g. `kubectl proxy`
    pub fn local(
        base_url: impl Into<String>,
        external_ip: Option<String>,
        connect_timeout: Duration,
    ) -> Result<Self, DiscoveryError> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| DiscoveryError::Connect(e.to_string()))?;
        Ok(Self::with_client(client, base_url, None, external_ip))
    }

    /// Watch from inside a pod, using its service account token and CA
    pub fn in_cluster(
        external_ip: Option<String>,
        connect_timeout: Duration,
    ) -> Result<Self, DiscoveryError> {
        let host = std::env::var("KUBERNETES_SERVICE_HOST")
            .map_err(|_| DiscoveryError::Connect("KUBERNETES_SERVICE_HOST is not set".to_string()))?;
        let port = std::env::var("KUBERNETES_SERVICE_PORT").unwrap_or_else(|_| "443".to_string());

        let account = Path::new(SERVICE_ACCOUNT_DIR);
        let token = read_secret(&account.join("token"))?;
        let ca = std::fs::read(account.join("ca.crt"))
            .map_err(|e| DiscoveryError::Connect(format!("cannot read cluster CA: {}", e)))?;
        let ca = Certificate::from_pem(&ca).map_err(|e| DiscoveryError::Connect(e.to_string()))?;

        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .add_root_certificate(ca)
            .build()
            .map_err(|e| DiscoveryError::Connect(e.to_string()))?;

        let base_url = format!("https://{}:{}", host, port);
        Ok(Self::with_client(
            client,
            base_url,
            Some(token.trim().to_string()),
            external_ip,
        ))
    }

    pub fn with_client(
        client: Client,
        base_url: impl Into<String>,
        token: Option<String>,
        external_ip: Option<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
            external_ip,
            resource_version: None,
            response: None,
            buffer: Vec::new(),
            connected_once: false,
        }
    }

    fn watch_url(&self) -> String {
        let mut url = format!("{}{}?watch=true", self.base_url, SERVICES_PATH);
        if let Some(version) = &self.resource_version {
            url.push_str("&resourceVersion=");
            url.push_str(version);
        }
        url
    }

    async fn open(&mut self) -> Result<Response, DiscoveryError> {
        let url = self.watch_url();
        debug!("Opening service watch {}", url);

        let mut request = self.client.get(&url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let response = request
            .send()
            .await
            .map_err(|e| DiscoveryError::Connect(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DiscoveryError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Open the watch; failures after the first connection are retried
    async fn connect(&mut self) -> Result<(), DiscoveryError> {
        loop {
            match self.open().await {
                Ok(response) => {
                    info!("Watching services at {}", self.base_url);
                    self.response = Some(response);
                    self.connected_once = true;
                    return Ok(());
                }
                Err(DiscoveryError::Rejected { status, .. })
                    if status == StatusCode::GONE.as_u16() && self.resource_version.is_some() =>
                {
                    info!("Resource version expired, restarting the watch from now");
                    self.resource_version = None;
                }
                Err(e) if self.connected_once => {
                    warn!("Service watch unavailable, retrying in {:?}: {}", RECONNECT_DELAY, e);
                    tokio::time::sleep(RECONNECT_DELAY).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn take_line(&mut self) -> Option<Vec<u8>> {
        let end = self.buffer.iter().position(|b| *b == b'\n')?;
        let mut line: Vec<u8> = self.buffer.drain(..=end).collect();
        line.pop();
        Some(line)
    }
}

#[async_trait]
impl DiscoverySource for KubeWatchSource {
    async fn next(&mut self) -> Result<Option<DiscoveryEvent>, DiscoveryError> {
        loop {
            while let Some(line) = self.take_line() {
                if line.iter().all(u8::is_ascii_whitespace) {
                    continue;
                }
                match parse_watch_line(&line, self.external_ip.as_deref()) {
                    Ok(parsed) => {
                        if parsed.expired {
                            self.resource_version = None;
                        } else if parsed.resource_version.is_some() {
                            self.resource_version = parsed.resource_version;
                        }
                        return Ok(Some(parsed.event));
                    }
                    Err(e) => warn!("Skipping watch line: {}", e),
                }
            }

            let Some(response) = self.response.as_mut() else {
                self.connect().await?;
                continue;
            };

            match response.chunk().await {
                Ok(Some(bytes)) => self.buffer.extend_from_slice(&bytes),
                Ok(None) => {
                    debug!("Service watch closed by the server, reopening");
                    self.response = None;
                    self.buffer.clear();
                }
                Err(e) => {
                    warn!("Service watch interrupted: {}", e);
                    self.response = None;
                    self.buffer.clear();
                }
            }
        }
    }

    fn name(&self) -> &str {
        "KubeWatchSource"
    }
}

fn read_secret(path: &Path) -> Result<String, DiscoveryError> {
    std::fs::read_to_string(path)
        .map_err(|e| DiscoveryError::Connect(format!("cannot read {}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use apiscout_core::annotations;

    const ADDED: &str = r#"{"type":"ADDED","object":{"kind":"Service","metadata":{"name":"invoice-svc","resourceVersion":"4711","annotations":{"apiscout/index":"true","apiscout/swaggerUrl":"/swagger.json"}},"spec":{"clusterIP":"10.0.0.7","ports":[{"port":8080,"nodePort":30080}]}}}"#;

    #[test]
    fn test_cluster_address() {
        let line = parse_watch_line(ADDED.as_bytes(), None).unwrap();
        let svc = match line.event {
            DiscoveryEvent::Added(svc) => svc,
            other => panic!("expected ADDED, got {:?}", other),
        };
        assert_eq!(svc.name, "invoice-svc");
        assert_eq!(svc.address, Some(ServiceAddress::new("10.0.0.7", 8080)));
        assert!(svc.is_indexed());
        assert_eq!(svc.annotation(annotations::SWAGGER_URL), Some("/swagger.json"));
        assert_eq!(line.resource_version.as_deref(), Some("4711"));
    }

    #[test]
    fn test_external_address_uses_node_port() {
        let line = parse_watch_line(ADDED.as_bytes(), Some("192.168.99.100")).unwrap();
        let svc = line.event.service().cloned().unwrap();
        assert_eq!(svc.address, Some(ServiceAddress::new("192.168.99.100", 30080)));
    }

    #[test]
    fn test_headless_service_has_no_address() {
        let raw = r#"{"type":"DELETED","object":{"metadata":{"name":"db"},"spec":{"clusterIP":"None","ports":[{"port":5432}]}}}"#;
        let line = parse_watch_line(raw.as_bytes(), None).unwrap();
        assert!(matches!(&line.event, DiscoveryEvent::Deleted(svc) if svc.address.is_none()));

        let raw = r#"{"type":"MODIFIED","object":{"metadata":{"name":"db"},"spec":{"clusterIP":"10.0.0.9"}}}"#;
        let line = parse_watch_line(raw.as_bytes(), None).unwrap();
        assert!(matches!(&line.event, DiscoveryEvent::Modified(svc) if svc.address.is_none()));
    }

    #[test]
    fn test_expired_error_event() {
        let raw = r#"{"type":"ERROR","object":{"kind":"Status","code":410,"message":"too old resource version: 1 (4711)"}}"#;
        let line = parse_watch_line(raw.as_bytes(), None).unwrap();
        assert!(line.expired);
        assert_eq!(
            line.event,
            DiscoveryEvent::Error("too old resource version: 1 (4711)".to_string())
        );
    }

    #[test]
    fn test_unknown_event_type() {
        let raw = r#"{"type":"BOOKMARK","object":{"metadata":{"resourceVersion":"5000"}}}"#;
        let line = parse_watch_line(raw.as_bytes(), None).unwrap();
        assert_eq!(line.event, DiscoveryEvent::Unknown("BOOKMARK".to_string()));
        assert_eq!(line.resource_version.as_deref(), Some("5000"));
    }

    #[test]
    fn test_malformed_line() {
        assert!(matches!(
            parse_watch_line(b"{not json", None),
            Err(DiscoveryError::Decode(_))
        ));
    }

    #[test]
    fn test_watch_url_resumes_from_version() {
        let mut source = KubeWatchSource::with_client(Client::new(), "http://127.0.0.1:8001/", None, None);
        assert_eq!(source.watch_url(), "http://127.0.0.1:8001/api/v1/services?watch=true");

        source.resource_version = Some("4711".to_string());
        assert_eq!(
            source.watch_url(),
            "http://127.0.0.1:8001/api/v1/services?watch=true&resourceVersion=4711"
        );
    }

    #[test]
    fn test_take_line_keeps_partial_tail() {
        let mut source = KubeWatchSource::with_client(Client::new(), "http://localhost", None, None);
        source.buffer.extend_from_slice(b"{\"a\":1}\n{\"b\"");
        assert_eq!(source.take_line(), Some(b"{\"a\":1}".to_vec()));
        assert_eq!(source.take_line(), None);
        assert_eq!(source.buffer, b"{\"b\"".to_vec());
    }

    #[tokio::test]
    async fn test_unreachable_api_server_fails_first_connect() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let mut source = KubeWatchSource::local(
            format!("http://127.0.0.1:{}", port),
            None,
            Duration::from_secs(5),
        )
        .unwrap();

        let err = source.next().await.unwrap_err();
        assert!(matches!(err, DiscoveryError::Connect(_)), "unexpected error: {err}");
    }
}
