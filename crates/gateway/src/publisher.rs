//! Gateway publisher
//!
//! Turns an API description into the gateway's object set and reconciles it
//! with what the gateway already stores:
//!
//! ```text
//! token ─► transform ─► layer templates ─► upsert services ─► upsert docs
//!                                                   │
//!                                   (create_plan)   ▼
//!                               upsert packages ─► test application + key
//! ```
//!
//! Objects are looked up by name on every call; ids are never cached.

use crate::error::{PublishError, Result};
use crate::objects::{
    self, Resources, fields, first, formats, name_filter, test_application_name,
    unwrap_document,
};
use crate::templates::GatewayTemplates;
use apiscout_core::{GraphError, GraphExt, ObjectGraph, ObjectMap, kind_name};
use apiscout_merge::merge;
use apiscout_ports::{GatewayClient, GatewayCredentials};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Pause after every remote call, to stay under the gateway's QPS limit
pub const DEFAULT_CALL_DELAY: Duration = Duration::from_millis(500);

/// Documentation flavour attached to the API definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DocType {
    /// Interactive docs generated by the gateway's `iodocsv1` transform
    #[default]
    #[serde(rename = "IODOC")]
    IoDocs,
    /// The original document, attached as-is
    #[serde(rename = "SWAGGER")]
    Swagger,
}

impl DocType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocType::IoDocs => "IODOC",
            DocType::Swagger => "SWAGGER",
        }
    }

    /// Doc type from an annotation value; absent means `IODOC`
    pub fn from_annotation(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            None | Some("") => DocType::IoDocs,
            Some(v) if v.eq_ignore_ascii_case("IODOC") => DocType::IoDocs,
            Some(_) => DocType::Swagger,
        }
    }
}

impl std::fmt::Display for DocType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a successful publish
#[derive(Debug, Clone, PartialEq)]
pub struct Published {
    pub definition_id: String,
    pub name: String,
    pub endpoints: Vec<ObjectGraph>,
    pub control_center_link: String,
    /// One `curl` line per endpoint; empty unless a plan was created
    pub example_calls: Vec<String>,
}

/// Outcome of a retraction
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Retracted {
    /// Object paths that were deleted
    pub deleted: Vec<String>,
}

/// API definition as returned by the gateway
struct ApiDefinition {
    id: String,
    name: String,
    endpoints: Vec<ObjectGraph>,
}

pub struct GatewayPublisher {
    client: Arc<dyn GatewayClient>,
    credentials: GatewayCredentials,
    call_delay: Duration,
}

impl GatewayPublisher {
    pub fn new(client: Arc<dyn GatewayClient>, credentials: GatewayCredentials) -> Self {
        Self {
            client,
            credentials,
            call_delay: DEFAULT_CALL_DELAY,
        }
    }

    pub fn with_call_delay(mut self, call_delay: Duration) -> Self {
        self.call_delay = call_delay;
        self
    }

    /// Publish `document` and reconcile it with the gateway's copy
    pub async fn publish(
        &self,
        document: &ObjectGraph,
        doc_type: DocType,
        create_plan: bool,
        templates: &GatewayTemplates,
    ) -> Result<Published> {
        let token = self.client.fetch_token(&self.credentials).await?;
        self.throttle().await;

        let generated = self
            .transform(document, formats::MASHERY_API, &token)
            .await?;
        let iodoc = match doc_type {
            DocType::IoDocs => Some(self.transform(document, formats::IODOCS_V1, &token).await?),
            DocType::Swagger => None,
        };

        let generated = into_object(generated, "transformed API")?;
        let api = self
            .upsert_api(templates.layer_api(generated)?, &token)
            .await?;

        let definition = iodoc.unwrap_or_else(|| document.clone());
        self.upsert_docs(definition, &api.id, doc_type, &token)
            .await?;

        let mut example_calls = Vec::new();
        if create_plan {
            let package = objects::package_plan(&api.id, &api.name, &api.endpoints);
            let package = self
                .upsert_package(templates.layer_package(package)?, &api.name, &token)
                .await?;
            let key = self.ensure_test_key(&package, &api.name, &token).await?;

            for endpoint in &api.endpoints {
                match objects::example_call(endpoint, &key) {
                    Ok(call) => example_calls.push(call),
                    Err(e) => warn!("No example call for an endpoint of {}: {}", api.name, e),
                }
            }
        }

        let published = Published {
            control_center_link: objects::control_center_link(
                &self.credentials.area_domain,
                &api.id,
            ),
            definition_id: api.id,
            name: api.name,
            endpoints: api.endpoints,
            example_calls,
        };

        info!(
            "Successfully published to gateway: API {} (id={})",
            published.name, published.definition_id
        );
        info!("API Control Center Link: {}", published.control_center_link);
        for call in &published.example_calls {
            info!("Example call: {}", call);
        }
        Ok(published)
    }

    /// Delete the API definition and package named `name`, if present
    pub async fn retract(&self, name: &str) -> Result<Retracted> {
        let token = self.client.fetch_token(&self.credentials).await?;
        self.throttle().await;

        let mut retracted = Retracted::default();
        for collection in [Resources::SERVICES, Resources::PACKAGES] {
            let Some(existing) = self
                .find_first(collection, &name_filter(name), fields::ID, &token)
                .await?
            else {
                debug!("No {} named {} to retract", collection, name);
                continue;
            };

            let id = existing
                .str_field("id")
                .map_err(PublishError::response(collection))?;
            let path = Resources::object(collection, id);
            self.client.delete(&path, &token).await?;
            self.throttle().await;

            info!("Retracted {} for {}", path, name);
            retracted.deleted.push(path);
        }
        Ok(retracted)
    }

    async fn transform(&self, document: &ObjectGraph, target: &str, token: &str) -> Result<ObjectGraph> {
        debug!("Transforming document to {}", target);
        let transformed = self
            .client
            .transform(document, formats::SWAGGER2, target, token)
            .await?;
        self.throttle().await;
        Ok(unwrap_document(transformed))
    }

    /// Create the API definition, or merge it onto the existing one
    async fn upsert_api(&self, api: ObjectMap, token: &str) -> Result<ApiDefinition> {
        let name = api
            .str_field("name")
            .map_err(PublishError::response("transformed API"))?
            .to_string();

        let existing = self
            .find_first(Resources::SERVICES, &name_filter(&name), fields::SERVICE, token)
            .await?;

        let response = match existing {
            None => {
                debug!("Creating API definition {}", name);
                self.client
                    .create(Resources::SERVICES, fields::SERVICE, &Value::Object(api), token)
                    .await?
            }
            Some(existing) => {
                let merged = merge(existing, api, 0)?;
                let id = merged
                    .str_field("id")
                    .map_err(PublishError::response("existing API"))?
                    .to_string();
                debug!("Updating API definition {} ({})", name, id);
                self.client
                    .update(
                        &Resources::object(Resources::SERVICES, &id),
                        fields::SERVICE,
                        &Value::Object(merged),
                        token,
                    )
                    .await?
            }
        };
        self.throttle().await;

        api_definition(&response)
    }

    async fn upsert_docs(
        &self,
        definition: ObjectGraph,
        api_id: &str,
        doc_type: DocType,
        token: &str,
    ) -> Result<()> {
        let body = objects::docs_body(definition, api_id, doc_type.as_str());
        let existing = self
            .find_first(
                Resources::SERVICE_DOCS,
                &format!("serviceId:{}", api_id),
                fields::ID,
                token,
            )
            .await?;

        match existing {
            None => {
                self.client
                    .create(Resources::SERVICE_DOCS, fields::ID, &body, token)
                    .await?;
            }
            Some(_) => {
                self.client
                    .update(
                        &Resources::object(Resources::SERVICE_DOCS, api_id),
                        fields::ID,
                        &body,
                        token,
                    )
                    .await?;
            }
        }
        self.throttle().await;
        Ok(())
    }

    async fn upsert_package(&self, package: ObjectMap, name: &str, token: &str) -> Result<ObjectGraph> {
        let existing = self
            .find_first(Resources::PACKAGES, &name_filter(name), fields::PACKAGE, token)
            .await?;

        let response = match existing {
            None => {
                debug!("Creating package {}", name);
                self.client
                    .create(Resources::PACKAGES, fields::PACKAGE, &Value::Object(package), token)
                    .await?
            }
            Some(existing) => {
                let merged = merge(existing, package, 0)?;
                let id = merged
                    .str_field("id")
                    .map_err(PublishError::response("existing package"))?
                    .to_string();
                debug!("Updating package {} ({})", name, id);
                self.client
                    .update(
                        &Resources::object(Resources::PACKAGES, &id),
                        fields::PACKAGE,
                        &Value::Object(merged),
                        token,
                    )
                    .await?
            }
        };
        self.throttle().await;
        Ok(response)
    }

    /// Find or create the member's test application and a key for `package`
    async fn ensure_test_key(&self, package: &ObjectGraph, api_name: &str, token: &str) -> Result<ObjectGraph> {
        let member = self
            .find_first(
                Resources::MEMBERS,
                &format!("username:{}", self.credentials.username),
                fields::MEMBER,
                token,
            )
            .await?
            .ok_or_else(|| PublishError::NotFound(format!("member {}", self.credentials.username)))?;

        let app_name = test_application_name(api_name);
        let existing_app = match member.get("applications") {
            Some(Value::Array(apps)) => apps
                .iter()
                .find(|app| app.get("name").and_then(Value::as_str) == Some(app_name.as_str()))
                .cloned(),
            _ => None,
        };

        let (application, mut key) = match existing_app {
            Some(app) => {
                let app_id = app
                    .str_field("id")
                    .map_err(PublishError::response("test application"))?;
                let keys = self
                    .client
                    .read(&Resources::package_keys(app_id), "", fields::PACKAGE_KEY, token)
                    .await?;
                self.throttle().await;
                let key = into_list(keys, "package keys")?.into_iter().next();
                (app, key)
            }
            None => {
                let member_id = member
                    .str_field("id")
                    .map_err(PublishError::response("member"))?;
                info!("Creating {}", app_name);
                let app = self
                    .client
                    .create(
                        &Resources::member_applications(member_id),
                        fields::APPLICATION,
                        &objects::test_application(api_name, &self.credentials.username),
                        token,
                    )
                    .await?;
                self.throttle().await;
                (app, None)
            }
        };

        if key.is_none() {
            let package_id = package
                .str_field("id")
                .map_err(PublishError::response("package"))?;
            let plan_id = first(package, "plans")
                .and_then(|plan| plan.str_field("id"))
                .map_err(PublishError::response("package plan"))?;
            let app_id = application
                .str_field("id")
                .map_err(PublishError::response("test application"))?;

            let created = self
                .client
                .create(
                    &Resources::package_keys(app_id),
                    "",
                    &objects::key_request(package_id, plan_id),
                    token,
                )
                .await?;
            self.throttle().await;
            key = Some(created);
        }

        Ok(key.unwrap_or_default())
    }

    /// First element of a name-filtered list read
    async fn find_first(
        &self,
        collection: &str,
        filter: &str,
        fields: &str,
        token: &str,
    ) -> Result<Option<ObjectMap>> {
        let found = self.client.read(collection, filter, fields, token).await?;
        self.throttle().await;

        match into_list(found, collection)?.into_iter().next() {
            None => Ok(None),
            Some(Value::Object(map)) => Ok(Some(map)),
            Some(other) => Err(PublishError::InvalidResponse {
                context: collection.to_string(),
                source: GraphError::WrongType {
                    field: collection.to_string(),
                    expected: "object",
                    found: kind_name(&other),
                },
            }),
        }
    }

    async fn throttle(&self) {
        if !self.call_delay.is_zero() {
            tokio::time::sleep(self.call_delay).await;
        }
    }
}

fn api_definition(response: &ObjectGraph) -> Result<ApiDefinition> {
    let shape = "API definition";
    let id = response.str_field("id").map_err(PublishError::response(shape))?;
    let name = response.str_field("name").map_err(PublishError::response(shape))?;
    let endpoints = match response.get("endpoints") {
        None | Some(Value::Null) => Vec::new(),
        Some(_) => response
            .array_field("endpoints")
            .map_err(PublishError::response(shape))?
            .clone(),
    };
    Ok(ApiDefinition {
        id: id.to_string(),
        name: name.to_string(),
        endpoints,
    })
}

fn into_object(value: ObjectGraph, context: &str) -> Result<ObjectMap> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(PublishError::InvalidResponse {
            context: context.to_string(),
            source: GraphError::WrongType {
                field: context.to_string(),
                expected: "object",
                found: kind_name(&other),
            },
        }),
    }
}

fn into_list(value: ObjectGraph, context: &str) -> Result<Vec<Value>> {
    match value {
        Value::Array(items) => Ok(items),
        other => Err(PublishError::InvalidResponse {
            context: context.to_string(),
            source: GraphError::WrongType {
                field: context.to_string(),
                expected: "array",
                found: kind_name(&other),
            },
        }),
    }
}
