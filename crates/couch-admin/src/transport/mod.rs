//! Document store transport
//!
//! The core reads and writes whole JSON documents through [`DocumentTransport`]
//! and names them with [`Resource`]; only the transport knows how a resource
//! maps onto a URL.

mod http;

pub use http::HttpTransport;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::{TransportError, TransportResult};
use crate::metadata::{NodeId, Revision};

/// CouchDB exposes two HTTP interfaces on different ports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interface {
    /// Cluster-wide API (default port 5984)
    Clustered,
    /// Node-local API holding `_nodes` and `_dbs` (default port 5986)
    NodeLocal,
}

/// A document (or document-like endpoint) in the store
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Resource {
    /// `_membership`
    Membership,
    /// `_nodes/<node>`
    NodeRecord(NodeId),
    /// `_all_dbs`
    AllDatabases,
    /// `_dbs/<db>`
    DatabaseConfig(String),
    /// `<db>?n=<replicas>&q=<shards>`
    Database {
        name: String,
        replicas: u32,
        shards: u32,
    },
    /// `_node/<node>/_config/<section>/<key>`
    NodeConfig {
        node: NodeId,
        section: String,
        key: String,
    },
}

impl Resource {
    pub fn interface(&self) -> Interface {
        match self {
            Resource::NodeRecord(_) | Resource::DatabaseConfig(_) => Interface::NodeLocal,
            Resource::Membership
            | Resource::AllDatabases
            | Resource::Database { .. }
            | Resource::NodeConfig { .. } => Interface::Clustered,
        }
    }

    /// Path (and query) relative to the interface root
    pub fn path(&self) -> String {
        match self {
            Resource::Membership => "_membership".to_string(),
            Resource::NodeRecord(node) => format!("_nodes/{}", node),
            Resource::AllDatabases => "_all_dbs".to_string(),
            Resource::DatabaseConfig(name) => format!("_dbs/{}", encode_db_name(name)),
            Resource::Database {
                name,
                replicas,
                shards,
            } => format!("{}?n={}&q={}", encode_db_name(name), replicas, shards),
            Resource::NodeConfig { node, section, key } => {
                format!("_node/{}/_config/{}/{}", node, section, key)
            }
        }
    }
}

/// Database names may contain `/`, which has to be escaped inside a path
fn encode_db_name(name: &str) -> String {
    name.replace('/', "%2F")
}

impl std::fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.path())
    }
}

/// Authenticated GET/PUT/DELETE of JSON documents against one server
///
/// Implementations return `Value::Null` for an empty response body and map a
/// rejected stale revision to [`TransportError::Conflict`].
#[async_trait]
pub trait DocumentTransport: Send + Sync {
    /// Fetch a document
    async fn get(&self, resource: &Resource) -> TransportResult<Value>;

    /// Create or replace a document; `Value::Null` sends no body
    async fn put(&self, resource: &Resource, body: Value) -> TransportResult<Value>;

    /// Delete a document at the given revision
    async fn delete(&self, resource: &Resource, rev: &Revision) -> TransportResult<Value>;
}

/// Fetch and decode a document
pub async fn fetch<T: DeserializeOwned>(
    transport: &dyn DocumentTransport,
    resource: &Resource,
) -> TransportResult<T> {
    let value = transport.get(resource).await?;
    decode(resource, value)
}

/// Encode and store a document, returning the raw response
pub async fn store<T: Serialize + ?Sized>(
    transport: &dyn DocumentTransport,
    resource: &Resource,
    body: &T,
) -> TransportResult<Value> {
    let body = serde_json::to_value(body).map_err(|source| TransportError::Encode {
        resource: resource.to_string(),
        source,
    })?;
    transport.put(resource, body).await
}

/// Decode a response, treating an empty body as an empty object
pub fn decode<T: DeserializeOwned>(resource: &Resource, value: Value) -> TransportResult<T> {
    let value = if value.is_null() {
        Value::Object(Default::default())
    } else {
        value
    };
    serde_json::from_value(value).map_err(|source| TransportError::Decode {
        resource: resource.to_string(),
        source,
    })
}
