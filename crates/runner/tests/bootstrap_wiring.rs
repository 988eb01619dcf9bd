//! Integration test: configuration -> wired system
//!
//! Builds the reconciler from configuration and drives it from a fake API
//! server's watch stream:
//! watch stream -> KubeWatchSource -> Reconciler -> files on disk

use apiscout_core::DiscoveryEvent;
use apiscout_ports::DiscoverySource;
use apiscout_runner::{BootstrapError, ScoutConfig, build_reconciler, build_source, load_templates};
use std::path::Path;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

/// Accepts one HTTP connection, answers with `body` and closes
async fn serve_once(body: String) -> (String, oneshot::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
        }
        let request_line = String::from_utf8_lossy(&request)
            .lines()
            .next()
            .unwrap_or_default()
            .to_string();
        let _ = tx.send(request_line);

        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.unwrap();
    });

    (format!("http://{}", addr), rx)
}

fn config_in(root: &Path) -> ScoutConfig {
    ScoutConfig {
        swagger_store: root.join("static/swaggerdocs"),
        hugo_store: root.join("content/apis"),
        ..Default::default()
    }
}

// === Templates ===

#[test]
fn test_missing_template_uses_defaults() {
    let _ = env_logger::try_init();

    let templates = load_templates(Path::new("/nonexistent/masheryTemplate.json")).unwrap();
    let api = templates.layer_api(serde_json::Map::new()).unwrap();
    assert_eq!(api["qpsLimitOverall"], 0);
}

#[test]
fn test_invalid_template_is_fatal() {
    let _ = env_logger::try_init();

    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("masheryTemplate.json");
    std::fs::write(&path, "[1, 2, 3]").unwrap();

    let mut config = config_in(tmp.path());
    config.gateway.credentials.username = "alice".to_string();
    config.gateway.credentials.api_key = "k3y".to_string();
    config.gateway.template_path = path;

    let err = build_reconciler(&config).err().unwrap();
    assert!(matches!(err, BootstrapError::Template { .. }), "unexpected error: {err}");
}

#[test]
fn test_gateway_disabled_ignores_template() {
    let _ = env_logger::try_init();

    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("masheryTemplate.json");
    std::fs::write(&path, "not json").unwrap();

    let mut config = config_in(tmp.path());
    config.gateway.template_path = path;
    assert!(build_reconciler(&config).is_ok());
}

// === Watch stream ===

#[tokio::test]
async fn test_watch_stream_drives_reconciler() {
    let _ = env_logger::try_init();

    let tmp = tempfile::tempdir().unwrap();

    // A service that is annotated but unreachable, and one that is not annotated
    let stream = [
        r#"{"type":"ADDED","object":{"metadata":{"name":"billing","resourceVersion":"1"},"spec":{"clusterIP":"10.0.0.8","ports":[{"port":80}]}}}"#,
        r#"{"type":"DELETED","object":{"metadata":{"name":"invoice-svc","resourceVersion":"2","annotations":{"apiscout/index":"true"}},"spec":{"clusterIP":"10.0.0.7","ports":[{"port":8080}]}}}"#,
    ]
    .join("\n")
        + "\n";
    let (base_url, request_line) = serve_once(stream).await;

    let mut config = config_in(tmp.path());
    config.kube_api_url = base_url;

    let reconciler = build_reconciler(&config).unwrap();
    let mut source = build_source(&config).unwrap();

    // === First event ===
    let first = source.next().await.unwrap().unwrap();
    assert!(matches!(&first, DiscoveryEvent::Added(svc) if svc.name == "billing"));
    let request_line = request_line.await.unwrap();
    assert!(
        request_line.starts_with("GET /api/v1/services?watch=true"),
        "unexpected request: {request_line}"
    );

    // === Second event ===
    let second = source.next().await.unwrap().unwrap();
    let DiscoveryEvent::Deleted(svc) = &second else {
        panic!("expected DELETED, got {second:?}");
    };
    assert_eq!(svc.name, "invoice-svc");
    assert!(svc.is_indexed());

    reconciler.handle(first, 0).await;
    reconciler.handle(second, 0).await;
    assert!(reconciler.catalog().is_empty());
    assert_eq!(reconciler.pending_retries(), 0);
}
