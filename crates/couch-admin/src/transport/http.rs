//! HTTP transport
//!
//! Talks to CouchDB over its two HTTP interfaces with basic auth

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde_json::Value;
use tracing::debug;

use super::{DocumentTransport, Resource};
use crate::config::AdminConfig;
use crate::error::{TransportError, TransportResult};
use crate::metadata::Revision;

/// reqwest-backed [`DocumentTransport`]
pub struct HttpTransport {
    config: AdminConfig,
    http_client: reqwest::Client,
}

impl HttpTransport {
    /// Create the transport; the request timeout comes from the config
    pub fn new(config: &AdminConfig) -> TransportResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.server.request_timeout())
            .build()?;

        Ok(Self {
            config: config.clone(),
            http_client,
        })
    }

    fn url(&self, resource: &Resource) -> String {
        format!(
            "{}/{}",
            self.config.base_url(resource.interface()),
            resource.path()
        )
    }

    fn request(&self, method: Method, resource: &Resource) -> RequestBuilder {
        self.http_client
            .request(method, self.url(resource))
            .basic_auth(
                &self.config.credentials.username,
                Some(&self.config.credentials.password),
            )
    }

    async fn execute(
        &self,
        method: &'static str,
        resource: &Resource,
        request: RequestBuilder,
    ) -> TransportResult<Value> {
        let resp = request.send().await?;
        let status = resp.status();
        let body = resp.text().await?;
        debug!(method, resource = %resource, status = status.as_u16(), "request completed");

        if status == StatusCode::CONFLICT {
            return Err(TransportError::Conflict {
                resource: resource.to_string(),
            });
        }
        if !status.is_success() {
            return Err(TransportError::Status {
                method,
                resource: resource.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(|source| TransportError::Decode {
            resource: resource.to_string(),
            source,
        })
    }
}

#[async_trait]
impl DocumentTransport for HttpTransport {
    async fn get(&self, resource: &Resource) -> TransportResult<Value> {
        let request = self.request(Method::GET, resource);
        self.execute("GET", resource, request).await
    }

    async fn put(&self, resource: &Resource, body: Value) -> TransportResult<Value> {
        let mut request = self.request(Method::PUT, resource);
        if !body.is_null() {
            request = request.json(&body);
        }
        self.execute("PUT", resource, request).await
    }

    async fn delete(&self, resource: &Resource, rev: &Revision) -> TransportResult<Value> {
        let request = self
            .request(Method::DELETE, resource)
            .query(&[("rev", rev.as_str())]);
        self.execute("DELETE", resource, request).await
    }
}
