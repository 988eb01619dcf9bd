//! Integration test: GatewayPublisher <-> stateful in-memory gateway
//!
//! Publishes the same API twice and retracts it:
//! publish (create) -> publish (merge onto existing) -> retract

use apiscout_core::ObjectGraph;
use apiscout_gateway::{DocType, GatewayPublisher, GatewayTemplates};
use apiscout_ports::{GatewayClient, GatewayClientError, GatewayCredentials};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

/// Keeps objects per collection and assigns ids on create
#[derive(Default)]
struct InMemoryGateway {
    objects: Mutex<BTreeMap<String, Vec<Value>>>,
    next_id: Mutex<u32>,
}

impl InMemoryGateway {
    fn collection(&self, name: &str) -> Vec<Value> {
        self.objects.lock().unwrap().get(name).cloned().unwrap_or_default()
    }

    fn assign_id(&self, body: &Value) -> Value {
        let mut next = self.next_id.lock().unwrap();
        *next += 1;
        let mut stored = body.clone();
        stored["id"] = json!(format!("id-{}", *next));
        stored
    }
}

#[async_trait]
impl GatewayClient for InMemoryGateway {
    async fn fetch_token(&self, _credentials: &GatewayCredentials) -> Result<String, GatewayClientError> {
        Ok("token".to_string())
    }

    async fn read(&self, object: &str, filter: &str, _fields: &str, _token: &str) -> Result<ObjectGraph, GatewayClientError> {
        let (field, wanted) = filter.split_once(':').unwrap_or(("", ""));
        let matches: Vec<Value> = self
            .collection(object)
            .into_iter()
            .filter(|o| field.is_empty() || o[field] == wanted)
            .collect();
        Ok(Value::Array(matches))
    }

    async fn create(&self, object: &str, _fields: &str, body: &ObjectGraph, _token: &str) -> Result<ObjectGraph, GatewayClientError> {
        let mut stored = self.assign_id(body);
        if let Some(endpoints) = stored.get_mut("endpoints").and_then(Value::as_array_mut) {
            for (i, endpoint) in endpoints.iter_mut().enumerate() {
                endpoint["id"] = json!(format!("ep-{}", i));
            }
        }
        self.objects
            .lock()
            .unwrap()
            .entry(object.to_string())
            .or_default()
            .push(stored.clone());
        Ok(stored)
    }

    async fn update(&self, path: &str, _fields: &str, body: &ObjectGraph, _token: &str) -> Result<ObjectGraph, GatewayClientError> {
        let (collection, id) = path.rsplit_once('/').unwrap();
        let mut objects = self.objects.lock().unwrap();
        let items = objects.entry(collection.to_string()).or_default();
        // Docs are addressed by the id of the service they belong to
        match items.iter_mut().find(|o| o["id"] == id || o["serviceId"] == id) {
            Some(existing) => {
                let id = existing["id"].clone();
                *existing = body.clone();
                existing["id"] = id;
                Ok(existing.clone())
            }
            None => Err(GatewayClientError::Rejected {
                resource: path.to_string(),
                status: 404,
                body: String::new(),
            }),
        }
    }

    async fn delete(&self, path: &str, _token: &str) -> Result<ObjectGraph, GatewayClientError> {
        let (collection, id) = path.rsplit_once('/').unwrap();
        if let Some(items) = self.objects.lock().unwrap().get_mut(collection) {
            items.retain(|o| o["id"] != id);
        }
        Ok(Value::Null)
    }

    async fn transform(&self, body: &ObjectGraph, _source: &str, target: &str, _token: &str) -> Result<ObjectGraph, GatewayClientError> {
        let title = body["info"]["title"].as_str().unwrap_or("untitled").to_string();
        let paths: Vec<Value> = body["paths"]
            .as_object()
            .map(|p| p.keys().map(|k| json!({"requestPathAlias": k, "name": k})).collect())
            .unwrap_or_default();
        Ok(match target {
            "masheryapi" => json!({"document": {"name": title, "endpoints": paths}}),
            _ => json!({"document": {"title": title, "kind": target}}),
        })
    }
}

fn credentials() -> GatewayCredentials {
    GatewayCredentials {
        username: "alice".to_string(),
        area_domain: "acme.api.mashery.com".to_string(),
        ..Default::default()
    }
}

#[tokio::test(start_paused = true)]
async fn test_publish_twice_then_retract() {
    let _ = env_logger::try_init();

    let gateway = Arc::new(InMemoryGateway::default());
    let publisher = GatewayPublisher::new(gateway.clone(), credentials());
    let templates = GatewayTemplates::default();

    // === First publish creates the definition ===
    let v1 = json!({"info": {"title": "Invoice"}, "paths": {"/invoices": {}}});
    let first = publisher
        .publish(&v1, DocType::IoDocs, false, &templates)
        .await
        .unwrap();
    assert_eq!(first.name, "Invoice");
    assert_eq!(gateway.collection("services").len(), 1);
    assert_eq!(gateway.collection("services/docs").len(), 1);

    // === Second publish merges onto it ===
    let v2 = json!({"info": {"title": "Invoice"}, "paths": {"/invoices": {}, "/refunds": {}}});
    let second = publisher
        .publish(&v2, DocType::IoDocs, false, &templates)
        .await
        .unwrap();
    assert_eq!(second.definition_id, first.definition_id);

    let services = gateway.collection("services");
    assert_eq!(services.len(), 1);
    let endpoints = services[0]["endpoints"].as_array().unwrap();
    assert_eq!(endpoints.len(), 2);
    // Server-assigned id of the matched endpoint survives the merge
    assert_eq!(endpoints[0]["id"], "ep-0");
    assert_eq!(endpoints[1]["requestPathAlias"], "/refunds");
    assert_eq!(gateway.collection("services/docs").len(), 1);

    // === Retract removes it ===
    let retracted = publisher.retract("Invoice").await.unwrap();
    assert_eq!(retracted.deleted.len(), 1);
    assert!(gateway.collection("services").is_empty());
}
