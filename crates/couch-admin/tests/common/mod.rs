//! In-memory CouchDB stand-in shared by the integration tests
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};

use couch_admin::error::{TransportError, TransportResult};
use couch_admin::metadata::Revision;
use couch_admin::{ClusterAdministrator, DocumentTransport, NodeId, Resource};

/// One request seen by the mock
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: &'static str,
    pub path: String,
    pub body: Option<Value>,
}

/// One config write seen by the mock
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWrite {
    pub node: NodeId,
    pub section: String,
    pub key: String,
    pub value: String,
}

#[derive(Default)]
struct MockState {
    all_nodes: Vec<NodeId>,
    cluster_nodes: Vec<NodeId>,
    /// Node-local documents keyed by path (`_nodes/..`, `_dbs/..`)
    docs: BTreeMap<String, Value>,
    config: Vec<ConfigWrite>,
    requests: Vec<RecordedRequest>,
    rev_counter: u64,
    /// PUTs to paths with this prefix answer 500
    failing_prefix: Option<String>,
    /// Nodes whose join does not show up in `cluster_nodes`
    lagging_joins: bool,
}

impl MockState {
    fn next_rev(&mut self, current: Option<&str>) -> String {
        self.rev_counter += 1;
        let generation = current
            .and_then(|r| r.split('-').next())
            .and_then(|g| g.parse::<u64>().ok())
            .unwrap_or(0);
        format!("{}-mock{:04}", generation + 1, self.rev_counter)
    }
}

/// Mock of a CouchDB cluster reached through one node
#[derive(Clone, Default)]
pub struct MockCouch {
    state: Arc<Mutex<MockState>>,
}

impl MockCouch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cluster with the given addresses known and joined
    pub fn with_nodes(addresses: &[&str]) -> Self {
        let mock = Self::new();
        for address in addresses {
            mock.add_member(address, true);
        }
        mock
    }

    pub fn admin(&self) -> ClusterAdministrator {
        ClusterAdministrator::with_transport(Arc::new(self.clone()))
    }

    /// Register a node; `joined` controls whether it is in `cluster_nodes`
    pub fn add_member(&self, address: &str, joined: bool) {
        let node = NodeId::canonicalize(address);
        let mut state = self.state.lock();
        let rev = state.next_rev(None);
        state.docs.insert(
            format!("_nodes/{}", node),
            json!({ "_id": node.as_str(), "_rev": rev }),
        );
        state.all_nodes.push(node.clone());
        if joined {
            state.cluster_nodes.push(node);
        }
    }

    /// Store a raw document as-is
    pub fn insert_doc(&self, path: &str, doc: Value) {
        self.state.lock().docs.insert(path.to_string(), doc);
    }

    pub fn remove_doc(&self, path: &str) {
        self.state.lock().docs.remove(path);
    }

    pub fn doc(&self, path: &str) -> Option<Value> {
        self.state.lock().docs.get(path).cloned()
    }

    /// Store a placement document for `db` built from (shard, owners) pairs
    pub fn insert_database(&self, db: &str, placement: &[(&str, &[&str])]) {
        let mut by_node: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut by_range: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (shard, owners) in placement {
            for owner in owners.iter() {
                let node = NodeId::canonicalize(owner).to_string();
                by_node.entry(node.clone()).or_default().push(shard.to_string());
                by_range.entry(shard.to_string()).or_default().push(node);
            }
        }
        let mut state = self.state.lock();
        let rev = state.next_rev(None);
        state.docs.insert(
            format!("_dbs/{}", db),
            json!({
                "_id": db,
                "_rev": rev,
                "shard_suffix": [46, 49, 50, 51],
                "changelog": [],
                "by_node": by_node,
                "by_range": by_range,
            }),
        );
    }

    /// Append a raw entry to a database's changelog
    pub fn append_changelog(&self, db: &str, entry: Value) {
        let mut state = self.state.lock();
        if let Some(Value::Array(log)) = state
            .docs
            .get_mut(&format!("_dbs/{}", db))
            .and_then(|doc| doc.get_mut("changelog"))
        {
            log.push(entry);
        }
    }

    /// Change a document behind the client's back
    pub fn touch(&self, path: &str) {
        let mut state = self.state.lock();
        let current = state
            .docs
            .get(path)
            .and_then(|d| d.get("_rev"))
            .and_then(Value::as_str)
            .map(str::to_string);
        let rev = state.next_rev(current.as_deref());
        if let Some(Value::Object(doc)) = state.docs.get_mut(path) {
            doc.insert("_rev".to_string(), Value::String(rev));
        }
    }

    pub fn fail_puts_to(&self, prefix: &str) {
        self.state.lock().failing_prefix = Some(prefix.to_string());
    }

    /// Accept joins without reporting the node as joined
    pub fn lag_joins(&self) {
        self.state.lock().lagging_joins = true;
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().requests.clone()
    }

    pub fn clear_requests(&self) {
        self.state.lock().requests.clear();
    }

    pub fn writes(&self) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method != "GET")
            .collect()
    }

    pub fn config_writes(&self) -> Vec<ConfigWrite> {
        self.state.lock().config.clone()
    }

    pub fn cluster_nodes(&self) -> Vec<NodeId> {
        self.state.lock().cluster_nodes.clone()
    }

    pub fn all_nodes(&self) -> Vec<NodeId> {
        self.state.lock().all_nodes.clone()
    }

    fn conflict(resource: &Resource) -> TransportError {
        TransportError::Conflict {
            resource: resource.to_string(),
        }
    }

    fn put_doc(state: &mut MockState, resource: &Resource, mut body: Value) -> TransportResult<Value> {
        let path = resource.path();
        let current_rev = state
            .docs
            .get(&path)
            .and_then(|d| d.get("_rev"))
            .and_then(Value::as_str)
            .map(str::to_string);
        let supplied_rev = body.get("_rev").and_then(Value::as_str).map(str::to_string);
        if current_rev != supplied_rev {
            return Err(Self::conflict(resource));
        }

        let id = path.splitn(2, '/').nth(1).unwrap_or_default().to_string();
        let rev = state.next_rev(current_rev.as_deref());
        if let Value::Object(doc) = &mut body {
            doc.insert("_id".to_string(), Value::String(id.clone()));
            doc.insert("_rev".to_string(), Value::String(rev.clone()));
        }
        state.docs.insert(path, body);

        Ok(json!({ "ok": true, "id": id, "rev": rev }))
    }

    fn create_database(state: &mut MockState, name: &str, replicas: u32, shards: u32) -> TransportResult<Value> {
        let path = format!("_dbs/{}", name);
        if state.docs.contains_key(&path) {
            return Err(TransportError::Status {
                method: "PUT",
                resource: name.to_string(),
                status: 412,
                body: r#"{"error":"file_exists"}"#.to_string(),
            });
        }

        let nodes = state.cluster_nodes.clone();
        let width = (u32::MAX as u64 + 1) / shards as u64;
        let mut by_node: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut by_range: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut changelog = Vec::new();
        for i in 0..shards as u64 {
            let start = i * width;
            let end = if i + 1 == shards as u64 {
                u32::MAX as u64
            } else {
                start + width - 1
            };
            let range = format!("{:08x}-{:08x}", start, end);
            for r in 0..(replicas as usize).min(nodes.len()) {
                let node = nodes[(i as usize + r) % nodes.len()].to_string();
                by_node.entry(node.clone()).or_default().push(range.clone());
                by_range.entry(range.clone()).or_default().push(node.clone());
                changelog.push(json!(["add", range, node]));
            }
        }

        let rev = state.next_rev(None);
        state.docs.insert(
            path,
            json!({
                "_id": name,
                "_rev": rev,
                "shard_suffix": [46, 49, 50, 51],
                "changelog": changelog,
                "by_node": by_node,
                "by_range": by_range,
            }),
        );
        Ok(json!({ "ok": true }))
    }
}

#[async_trait]
impl DocumentTransport for MockCouch {
    async fn get(&self, resource: &Resource) -> TransportResult<Value> {
        let mut state = self.state.lock();
        state.requests.push(RecordedRequest {
            method: "GET",
            path: resource.path(),
            body: None,
        });

        let value = match resource {
            Resource::Membership => json!({
                "all_nodes": state.all_nodes,
                "cluster_nodes": state.cluster_nodes,
            }),
            Resource::AllDatabases => {
                let names: Vec<&str> = state
                    .docs
                    .keys()
                    .filter_map(|k| k.strip_prefix("_dbs/"))
                    .collect();
                json!(names)
            }
            other => match state.docs.get(&other.path()) {
                Some(doc) => doc.clone(),
                None => {
                    return Err(TransportError::Status {
                        method: "GET",
                        resource: other.path(),
                        status: 404,
                        body: r#"{"error":"not_found","reason":"missing"}"#.to_string(),
                    })
                }
            },
        };
        Ok(value)
    }

    async fn put(&self, resource: &Resource, body: Value) -> TransportResult<Value> {
        let mut state = self.state.lock();
        let path = resource.path();
        state.requests.push(RecordedRequest {
            method: "PUT",
            path: path.clone(),
            body: if body.is_null() { None } else { Some(body.clone()) },
        });

        if let Some(prefix) = &state.failing_prefix {
            if path.starts_with(prefix.as_str()) {
                return Err(TransportError::Status {
                    method: "PUT",
                    resource: path,
                    status: 500,
                    body: r#"{"error":"internal_server_error"}"#.to_string(),
                });
            }
        }

        match resource {
            Resource::NodeRecord(node) => {
                let ack = Self::put_doc(&mut state, resource, body)?;
                if !state.all_nodes.contains(node) {
                    state.all_nodes.push(node.clone());
                }
                if !state.lagging_joins && !state.cluster_nodes.contains(node) {
                    state.cluster_nodes.push(node.clone());
                }
                Ok(ack)
            }
            Resource::DatabaseConfig(_) => Self::put_doc(&mut state, resource, body),
            Resource::Database {
                name,
                replicas,
                shards,
            } => Self::create_database(&mut state, name, *replicas, *shards),
            Resource::NodeConfig { node, section, key } => {
                let value = body.as_str().unwrap_or_default().to_string();
                state.config.push(ConfigWrite {
                    node: node.clone(),
                    section: section.clone(),
                    key: key.clone(),
                    value,
                });
                Ok(json!(""))
            }
            Resource::Membership | Resource::AllDatabases => Err(TransportError::Status {
                method: "PUT",
                resource: path,
                status: 405,
                body: String::new(),
            }),
        }
    }

    async fn delete(&self, resource: &Resource, rev: &Revision) -> TransportResult<Value> {
        let mut state = self.state.lock();
        let path = resource.path();
        state.requests.push(RecordedRequest {
            method: "DELETE",
            path: path.clone(),
            body: None,
        });

        let current = state
            .docs
            .get(&path)
            .and_then(|d| d.get("_rev"))
            .and_then(Value::as_str)
            .map(str::to_string);
        if current.as_deref() != Some(rev.as_str()) {
            return Err(Self::conflict(resource));
        }
        state.docs.remove(&path);

        if let Resource::NodeRecord(node) = resource {
            state.all_nodes.retain(|n| n != node);
            state.cluster_nodes.retain(|n| n != node);
        }
        Ok(json!({ "ok": true }))
    }
}
