//! Mashery REST v3 client
//!
//! Talks to `https://api.mashery.com` by default. Every request carries the
//! bearer token from the password-grant exchange and is bounded by the
//! client's timeout.

use apiscout_core::ObjectGraph;
use apiscout_ports::{GatewayClient, GatewayClientError, GatewayCredentials};
use async_trait::async_trait;
use log::debug;
use reqwest::header::ACCEPT;
use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.mashery.com";

const REST_PATH: &str = "/v3/rest/";
const TOKEN_PATH: &str = "/v3/token";
const TRANSFORM: &str = "transform";

pub struct MasheryClient {
    client: Client,
    base_url: String,
    /// Portal domain passed to the transform endpoint
    public_domain: String,
}

impl MasheryClient {
    pub fn new(public_domain: impl Into<String>, timeout: Duration) -> reqwest::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            public_domain: public_domain.into(),
        })
    }

    /// Point the client at another host (a proxy or a test server)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn rest_url(&self, resource: &str) -> String {
        format!("{}{}{}", self.base_url, REST_PATH, resource)
    }

    async fn send(
        &self,
        resource: &str,
        request: RequestBuilder,
        token: &str,
    ) -> Result<ObjectGraph, GatewayClientError> {
        let response = request
            .bearer_auth(token)
            .header(ACCEPT, "*/*")
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;
        debug!("Gateway {} answered {}", resource, status);

        if !status.is_success() {
            return Err(GatewayClientError::Rejected {
                resource: resource.to_string(),
                status: status.as_u16(),
                body,
            });
        }
        parse_body(&body)
    }
}

#[async_trait]
impl GatewayClient for MasheryClient {
    async fn fetch_token(
        &self,
        credentials: &GatewayCredentials,
    ) -> Result<String, GatewayClientError> {
        let form = [
            ("grant_type", "password"),
            ("username", credentials.username.as_str()),
            ("password", credentials.password.as_str()),
            ("scope", credentials.area_id.as_str()),
        ];
        let response = self
            .client
            .post(format!("{}{}", self.base_url, TOKEN_PATH))
            .basic_auth(&credentials.api_key, Some(&credentials.api_secret))
            .header(ACCEPT, "*/*")
            .form(&form)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;
        if !status.is_success() {
            return Err(GatewayClientError::Rejected {
                resource: "token".to_string(),
                status: status.as_u16(),
                body,
            });
        }

        match parse_body(&body)?.get("access_token") {
            Some(Value::String(token)) => Ok(token.clone()),
            _ => Err(GatewayClientError::Decode(
                "token response has no access_token".to_string(),
            )),
        }
    }

    async fn read(
        &self,
        object: &str,
        filter: &str,
        fields: &str,
        token: &str,
    ) -> Result<ObjectGraph, GatewayClientError> {
        let mut query = Vec::new();
        if !filter.is_empty() {
            query.push(("filter", filter));
        }
        if !fields.is_empty() {
            query.push(("fields", fields));
        }
        let request = self.client.get(self.rest_url(object)).query(&query);
        self.send(object, request, token).await
    }

    async fn create(
        &self,
        object: &str,
        fields: &str,
        body: &ObjectGraph,
        token: &str,
    ) -> Result<ObjectGraph, GatewayClientError> {
        let request = with_fields(self.client.post(self.rest_url(object)), fields).json(body);
        self.send(object, request, token).await
    }

    async fn update(
        &self,
        path: &str,
        fields: &str,
        body: &ObjectGraph,
        token: &str,
    ) -> Result<ObjectGraph, GatewayClientError> {
        let request = with_fields(self.client.put(self.rest_url(path)), fields).json(body);
        self.send(path, request, token).await
    }

    async fn delete(&self, path: &str, token: &str) -> Result<ObjectGraph, GatewayClientError> {
        let request = self.client.delete(self.rest_url(path));
        self.send(path, request, token).await
    }

    async fn transform(
        &self,
        body: &ObjectGraph,
        source_format: &str,
        target_format: &str,
        token: &str,
    ) -> Result<ObjectGraph, GatewayClientError> {
        let request = self
            .client
            .post(self.rest_url(TRANSFORM))
            .query(&[
                ("sourceFormat", source_format),
                ("targetFormat", target_format),
                ("publicDomain", self.public_domain.as_str()),
            ])
            .json(body);
        self.send(TRANSFORM, request, token).await
    }
}

fn with_fields(request: RequestBuilder, fields: &str) -> RequestBuilder {
    if fields.is_empty() {
        request
    } else {
        request.query(&[("fields", fields)])
    }
}

/// Empty bodies (e.g. from `DELETE`) decode to `null`
fn parse_body(body: &str) -> Result<ObjectGraph, GatewayClientError> {
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(body).map_err(|e| GatewayClientError::Decode(e.to_string()))
}

fn transport_error(err: reqwest::Error) -> GatewayClientError {
    if err.is_connect() {
        GatewayClientError::Connect(err.to_string())
    } else if err.is_timeout() {
        GatewayClientError::Timeout(err.to_string())
    } else {
        GatewayClientError::Transport(err.to_string())
    }
}
