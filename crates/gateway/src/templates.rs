//! Default templates layered under generated gateway objects
//!
//! A template file looks like:
//!
//! ```json
//! {
//!   "api":     { "qpsLimitOverall": 0, "endpoint": { "requestAuthenticationType": "apiKey" } },
//!   "package": { "sharedSecretLength": 10, "plan": { "selfServiceKeyProvisioningEnabled": false } }
//! }
//! ```
//!
//! Any part left out falls back to its built-in default.

use crate::error::{PublishError, Result};
use apiscout_core::{GraphError, ObjectGraph, ObjectMap, kind_name};
use apiscout_merge::merge;
use serde_json::{Value, json};

/// Templates for the four generated object kinds
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayTemplates {
    pub api: ObjectMap,
    pub endpoint: ObjectMap,
    pub package: ObjectMap,
    pub plan: ObjectMap,
}

impl Default for GatewayTemplates {
    fn default() -> Self {
        Self {
            api: default_api(),
            endpoint: default_endpoint(),
            package: default_package(),
            plan: default_plan(),
        }
    }
}

impl GatewayTemplates {
    /// Parse a template file's JSON content
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let graph: ObjectGraph = serde_json::from_slice(bytes)
            .map_err(|e| PublishError::InvalidTemplate(e.to_string()))?;
        Self::from_graph(&graph)
    }

    pub fn from_graph(graph: &ObjectGraph) -> Result<Self> {
        let root = graph.as_object().ok_or_else(|| {
            PublishError::InvalidTemplate(format!("expected an object, found {}", kind_name(graph)))
        })?;

        let (api, endpoint) = split_part(root, "api", "endpoint")?;
        let (package, plan) = split_part(root, "package", "plan")?;

        Ok(Self {
            api: api.unwrap_or_else(default_api),
            endpoint: endpoint.unwrap_or_else(default_endpoint),
            package: package.unwrap_or_else(default_package),
            plan: plan.unwrap_or_else(default_plan),
        })
    }

    /// Fill gaps in a generated API definition and in each of its endpoints
    pub fn layer_api(&self, api: ObjectMap) -> Result<ObjectMap> {
        layer(&self.api, &self.endpoint, "endpoints", api)
    }

    /// Fill gaps in a generated package and in each of its plans
    pub fn layer_package(&self, package: ObjectMap) -> Result<ObjectMap> {
        layer(&self.package, &self.plan, "plans", package)
    }
}

/// `root[outer]` minus its `inner` sub-object, and that sub-object
fn split_part(
    root: &ObjectMap,
    outer: &str,
    inner: &str,
) -> Result<(Option<ObjectMap>, Option<ObjectMap>)> {
    let Some(part) = root.get(outer) else {
        return Ok((None, None));
    };
    let mut part = as_template(outer, part)?;
    let nested = match part.remove(inner) {
        Some(value) => Some(as_template(&format!("{}.{}", outer, inner), &value)?),
        None => None,
    };
    Ok((Some(part), nested))
}

fn as_template(what: &str, value: &Value) -> Result<ObjectMap> {
    value.as_object().cloned().ok_or_else(|| {
        PublishError::InvalidTemplate(format!(
            "{} must be an object, found {}",
            what,
            kind_name(value)
        ))
    })
}

/// `merge(template, generated)` on the object and on every element of its
/// `list_key` list, so generated values always win
fn layer(
    template: &ObjectMap,
    item_template: &ObjectMap,
    list_key: &str,
    mut generated: ObjectMap,
) -> Result<ObjectMap> {
    let items = match generated.remove(list_key) {
        Some(Value::Array(items)) => Some(
            items
                .into_iter()
                .map(|item| -> Result<Value> {
                    match item {
                        Value::Object(item) => Ok(Value::Object(merge(item_template.clone(), item, 1)?)),
                        other => Err(PublishError::InvalidResponse {
                            context: list_key.to_string(),
                            source: GraphError::WrongType {
                                field: list_key.to_string(),
                                expected: "object",
                                found: kind_name(&other),
                            },
                        }),
                    }
                })
                .collect::<Result<Vec<_>>>()?,
        ),
        Some(other) => {
            // Not a list: leave it for the plain merge
            generated.insert(list_key.to_string(), other);
            None
        }
        None => None,
    };

    let mut layered = merge(template.clone(), generated, 0)?;
    if let Some(items) = items {
        layered.insert(list_key.to_string(), Value::Array(items));
    }
    Ok(layered)
}

fn object(value: Value) -> ObjectMap {
    match value {
        Value::Object(map) => map,
        _ => ObjectMap::new(),
    }
}

fn default_api() -> ObjectMap {
    object(json!({ "qpsLimitOverall": 0 }))
}

fn default_endpoint() -> ObjectMap {
    object(json!({ "requestAuthenticationType": "apiKeyAndSecret_SHA256" }))
}

fn default_package() -> ObjectMap {
    object(json!({ "sharedSecretLength": 10 }))
}

fn default_plan() -> ObjectMap {
    object(json!({ "selfServiceKeyProvisioningEnabled": false }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(value: Value) -> ObjectMap {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_defaults() {
        let t = GatewayTemplates::default();
        assert_eq!(t.api["qpsLimitOverall"], 0);
        assert_eq!(t.endpoint["requestAuthenticationType"], "apiKeyAndSecret_SHA256");
        assert_eq!(t.package["sharedSecretLength"], 10);
        assert_eq!(t.plan["selfServiceKeyProvisioningEnabled"], false);
    }

    #[test]
    fn test_from_json_splits_nested_parts() {
        let t = GatewayTemplates::from_json(
            br#"{"api":{"qpsLimitOverall":5,"endpoint":{"requestAuthenticationType":"apiKey"}}}"#,
        )
        .unwrap();

        assert_eq!(t.api, map(json!({"qpsLimitOverall": 5})));
        assert_eq!(t.endpoint, map(json!({"requestAuthenticationType": "apiKey"})));
        // Missing package part keeps its defaults
        assert_eq!(t.package, default_package());
        assert_eq!(t.plan, default_plan());
    }

    #[test]
    fn test_invalid_template() {
        assert!(matches!(
            GatewayTemplates::from_json(b"[1]"),
            Err(PublishError::InvalidTemplate(_))
        ));
        assert!(matches!(
            GatewayTemplates::from_json(br#"{"api":{"endpoint":"x"}}"#),
            Err(PublishError::InvalidTemplate(_))
        ));
        assert!(matches!(
            GatewayTemplates::from_json(b"not json"),
            Err(PublishError::InvalidTemplate(_))
        ));
    }

    #[test]
    fn test_generated_values_win() {
        let t = GatewayTemplates::default();
        let api = map(json!({
            "name": "Invoice",
            "qpsLimitOverall": 100,
            "endpoints": [
                {"requestPathAlias": "/a"},
                {"requestPathAlias": "/b", "requestAuthenticationType": "apiKey"}
            ]
        }));

        let layered = t.layer_api(api).unwrap();
        assert_eq!(layered["qpsLimitOverall"], 100);
        assert_eq!(layered["name"], "Invoice");

        let endpoints = layered["endpoints"].as_array().unwrap();
        assert_eq!(endpoints.len(), 2);
        assert_eq!(endpoints[0]["requestAuthenticationType"], "apiKeyAndSecret_SHA256");
        assert_eq!(endpoints[1]["requestAuthenticationType"], "apiKey");
    }

    #[test]
    fn test_layer_package_plans() {
        let t = GatewayTemplates::default();
        let package = map(json!({"name": "Invoice", "plans": [{"name": "Invoice"}]}));

        let layered = t.layer_package(package).unwrap();
        assert_eq!(layered["sharedSecretLength"], 10);
        assert_eq!(layered["plans"][0]["selfServiceKeyProvisioningEnabled"], false);
        assert_eq!(layered["plans"][0]["name"], "Invoice");
    }
}
