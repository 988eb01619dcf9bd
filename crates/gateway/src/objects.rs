//! Gateway object model: resource paths, field projections and request bodies

use crate::error::{PublishError, Result};
use apiscout_core::{GraphError, GraphExt, ObjectGraph, ObjectMap};
use serde_json::{Value, json};

/// Resource paths of the REST v3 object model
pub struct Resources;

impl Resources {
    /// API definitions
    pub const SERVICES: &'static str = "services";

    /// Interactive documentation attached to an API definition
    pub const SERVICE_DOCS: &'static str = "services/docs";

    /// Packages (with their plans)
    pub const PACKAGES: &'static str = "packages";

    /// Portal members
    pub const MEMBERS: &'static str = "members";

    /// A single object of a collection: `services/{id}`
    pub fn object(collection: &str, id: &str) -> String {
        format!("{}/{}", collection, id)
    }

    /// Applications of a member: `members/{id}/applications`
    pub fn member_applications(member_id: &str) -> String {
        format!("members/{}/applications", member_id)
    }

    /// Keys of an application: `applications/{id}/packageKeys`
    pub fn package_keys(application_id: &str) -> String {
        format!("applications/{}/packageKeys", application_id)
    }
}

/// Field projections requested on each call
pub mod fields {
    pub const ID: &str = "id";

    pub const SERVICE: &str = "id,name,endpoints.id,endpoints.name,endpoints.inboundSslRequired,\
endpoints.outboundRequestTargetPath,endpoints.outboundTransportProtocol,endpoints.publicDomains,\
endpoints.requestAuthenticationType,endpoints.requestPathAlias,endpoints.requestProtocol,\
endpoints.supportedHttpMethods,endpoints.systemDomains,endpoints.trafficManagerDomain";

    pub const PACKAGE: &str = "id,name,plans.id,plans.name";

    pub const MEMBER: &str = "id,username,applications,packageKeys";

    pub const APPLICATION: &str = "id,name";

    pub const PACKAGE_KEY: &str = "id,apikey,secret";
}

/// Transform formats
pub mod formats {
    pub const SWAGGER2: &str = "swagger2";
    pub const MASHERY_API: &str = "masheryapi";
    pub const IODOCS_V1: &str = "iodocsv1";
}

/// Endpoint authentication type that requires a signed call
pub const SIGNED_AUTH_TYPE: &str = "apiKeyAndSecret_SHA256";

pub fn name_filter(name: &str) -> String {
    format!("name:{}", name)
}

pub fn test_application_name(api_name: &str) -> String {
    format!("Test Application: {}", api_name)
}

/// The `document` member of a transform result, or the result itself
pub fn unwrap_document(transformed: ObjectGraph) -> ObjectGraph {
    match transformed {
        Value::Object(mut map) if map.get("document").is_some_and(Value::is_object) => {
            map.remove("document").unwrap_or_default()
        }
        other => other,
    }
}

/// Package with one plan granting access to every endpoint of the API
pub fn package_plan(api_id: &str, api_name: &str, endpoints: &[ObjectGraph]) -> ObjectMap {
    let package = json!({
        "name": api_name,
        "sharedSecretLength": 10,
        "plans": [{
            "name": api_name,
            "selfServiceKeyProvisioningEnabled": false,
            "numKeysBeforeReview": 1,
            "services": [{
                "id": api_id,
                "endpoints": endpoints,
            }],
        }],
    });
    match package {
        Value::Object(map) => map,
        _ => ObjectMap::new(),
    }
}

pub fn docs_body(definition: ObjectGraph, service_id: &str, doc_type: &str) -> ObjectGraph {
    json!({
        "definition": definition,
        "serviceId": service_id,
        "docType": doc_type,
    })
}

pub fn test_application(api_name: &str, username: &str) -> ObjectGraph {
    json!({
        "name": test_application_name(api_name),
        "username": username,
        "is_packaged": true,
    })
}

pub fn key_request(package_id: &str, plan_id: &str) -> ObjectGraph {
    json!({
        "package": { "id": package_id },
        "plan": { "id": plan_id },
    })
}

/// Admin console link for an API definition
///
/// The console lives on the area domain with `api` swapped for `admin`.
pub fn control_center_link(area_domain: &str, api_id: &str) -> String {
    format!(
        "https://{}/control-center/api-definitions/{}",
        area_domain.replace("api", "admin"),
        api_id
    )
}

/// A `curl` invocation exercising `endpoint` with the test `key`
pub fn example_call(endpoint: &ObjectGraph, key: &ObjectGraph) -> Result<String> {
    let address = first(endpoint, "publicDomains")
        .and_then(|domain| domain.str_field("address"))
        .map_err(PublishError::response("endpoint public domain"))?;
    let method = first(endpoint, "supportedHttpMethods")
        .and_then(|m| {
            m.as_str().ok_or_else(|| GraphError::WrongType {
                field: "supportedHttpMethods".to_string(),
                expected: "string",
                found: apiscout_core::kind_name(m),
            })
        })
        .map_err(PublishError::response("endpoint methods"))?;
    let alias = endpoint
        .str_field("requestPathAlias")
        .map_err(PublishError::response("endpoint path"))?;
    let secure = endpoint
        .bool_field("inboundSslRequired")
        .map_err(PublishError::response("endpoint protocol"))?;
    let auth = endpoint
        .opt_str_field("requestAuthenticationType")
        .map_err(PublishError::response("endpoint authentication"))?;
    let api_key = key.str_field("apikey").map_err(PublishError::response("package key"))?;

    let protocol = if secure { "https" } else { "http" };
    let mut call = format!(
        "curl -i -v -k -X {} '{}://{}{}?api_key={}",
        method.to_uppercase(),
        protocol,
        address,
        alias,
        api_key
    );

    if auth == Some(SIGNED_AUTH_TYPE) {
        let secret = key.str_field("secret").map_err(PublishError::response("package key"))?;
        call.push_str(&format!(
            "&sig='$(php -r \"echo hash('sha256', '{}'.'{}'.time());\")",
            api_key, secret
        ));
    } else {
        call.push('\'');
    }
    Ok(call)
}

pub(crate) fn first<'a>(value: &'a ObjectGraph, key: &str) -> std::result::Result<&'a Value, GraphError> {
    value
        .array_field(key)?
        .first()
        .ok_or_else(|| GraphError::Missing(format!("{}[0]", key)))
}
