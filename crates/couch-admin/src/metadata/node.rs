//! Node identity definitions

use serde::{Deserialize, Serialize};

/// Prefix CouchDB puts in front of every node name
pub const NODE_NAME_PREFIX: &str = "couchdb@";

/// Node ID
///
/// The cluster's internal name for a node, `couchdb@<address>`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Map a bare host or IP to the node name used in cluster documents
    pub fn canonicalize(address: &str) -> Self {
        Self(format!("{}{}", NODE_NAME_PREFIX, address))
    }

    /// The address part, without the prefix
    pub fn address(&self) -> &str {
        self.0.strip_prefix(NODE_NAME_PREFIX).unwrap_or(&self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NodeId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Revision token
///
/// Opaque, store-issued document version. Has to be sent back unchanged on
/// the next write of the same document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Revision(String);

impl Revision {
    pub fn new(rev: impl Into<String>) -> Self {
        Self(rev.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Revision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A node's document in the node-local `_nodes` database
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeMembershipRecord {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "_rev", default, skip_serializing_if = "Option::is_none")]
    pub rev: Option<Revision>,
}

impl NodeMembershipRecord {
    /// Body of a join request: empty for a fresh join, carrying the prior
    /// revision for a rejoin
    pub fn join_body(prior: Option<Revision>) -> Self {
        Self { id: None, rev: prior }
    }

    pub fn exists(&self) -> bool {
        self.id.is_some()
    }
}

/// Acknowledgement returned by the store for a document write
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WriteAck {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub rev: Option<Revision>,
}
