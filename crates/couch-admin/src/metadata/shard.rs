//! Shard placement definitions

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{NodeId, Revision};
use crate::error::{AdminError, AdminResult};

/// Shard ID
///
/// A range token such as `00000000-7fffffff`, fixed when the database is
/// created.
pub type ShardId = String;

/// Bidirectional shard placement index
///
/// Invariants kept by every mutation here:
/// - `node ∈ by_range[shard]` iff `shard ∈ by_node[node]`
/// - `by_range[shard]` is never emptied
/// - an empty `by_node[node]` bucket is removed, never kept
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardMap {
    #[serde(default)]
    pub by_node: BTreeMap<NodeId, Vec<ShardId>>,
    #[serde(default)]
    pub by_range: BTreeMap<ShardId, Vec<NodeId>>,
}

impl ShardMap {
    /// Shards held by a node, if it holds any
    pub fn shards_of(&self, node: &NodeId) -> Option<&[ShardId]> {
        self.by_node.get(node).map(|s| s.as_slice())
    }

    /// Nodes owning a shard, `None` for a shard this database doesn't have
    pub fn owners(&self, shard: &str) -> Option<&[NodeId]> {
        self.by_range.get(shard).map(|n| n.as_slice())
    }

    pub fn has_shard(&self, shard: &str) -> bool {
        self.by_range.contains_key(shard)
    }

    pub fn owns(&self, node: &NodeId, shard: &str) -> bool {
        self.by_node
            .get(node)
            .map(|shards| shards.iter().any(|s| s == shard))
            .unwrap_or(false)
    }

    /// Whether the node holds at least one shard
    pub fn holds_any(&self, node: &NodeId) -> bool {
        self.by_node.get(node).map(|s| !s.is_empty()).unwrap_or(false)
    }

    /// Record `node` as an owner of `shard` on both sides
    fn insert(&mut self, shard: &str, node: &NodeId) {
        self.by_node
            .entry(node.clone())
            .or_default()
            .push(shard.to_string());
        self.by_range
            .entry(shard.to_string())
            .or_default()
            .push(node.clone());
    }

    /// Drop `node` as an owner of `shard` on both sides
    fn remove(&mut self, shard: &str, node: &NodeId) {
        if let Some(nodes) = self.by_range.get_mut(shard) {
            nodes.retain(|n| n != node);
        }
        if let Some(shards) = self.by_node.get_mut(node) {
            shards.retain(|s| s != shard);
            if shards.is_empty() {
                self.by_node.remove(node);
            }
        }
    }

    /// Check the three placement invariants
    pub fn is_consistent(&self) -> bool {
        let forward = self.by_node.iter().all(|(node, shards)| {
            !shards.is_empty()
                && shards.iter().all(|s| {
                    self.by_range
                        .get(s)
                        .map(|nodes| nodes.contains(node))
                        .unwrap_or(false)
                })
        });
        let backward = self.by_range.iter().all(|(shard, nodes)| {
            !nodes.is_empty() && nodes.iter().all(|n| self.owns(n, shard))
        });
        forward && backward
    }

    /// Shards left without any owner
    pub fn orphan_shards(&self) -> Vec<&ShardId> {
        self.by_range
            .iter()
            .filter(|(_, nodes)| nodes.is_empty())
            .map(|(shard, _)| shard)
            .collect()
    }
}

/// Placement event kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeAction {
    Add,
    Delete,
}

impl std::fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChangeAction::Add => write!(f, "add"),
            ChangeAction::Delete => write!(f, "delete"),
        }
    }
}

/// One changelog entry, stored as `["add", "<range>", "<node>"]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangelogEntry(pub ChangeAction, pub ShardId, pub NodeId);

/// A changelog line as found in the document
///
/// Other tools append entries this crate does not model; those are kept as
/// raw JSON and written back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChangelogRecord {
    Placement(ChangelogEntry),
    Foreign(serde_json::Value),
}

impl ChangelogRecord {
    pub fn placement(&self) -> Option<&ChangelogEntry> {
        match self {
            ChangelogRecord::Placement(entry) => Some(entry),
            ChangelogRecord::Foreign(_) => None,
        }
    }
}

impl From<ChangelogEntry> for ChangelogRecord {
    fn from(entry: ChangelogEntry) -> Self {
        ChangelogRecord::Placement(entry)
    }
}

impl PartialEq<ChangelogEntry> for ChangelogRecord {
    fn eq(&self, other: &ChangelogEntry) -> bool {
        self.placement() == Some(other)
    }
}

/// A database's placement document in the node-local `_dbs` database
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Absent when the store returned an empty document
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "_rev", default, skip_serializing_if = "Option::is_none")]
    pub rev: Option<Revision>,
    #[serde(default)]
    pub shard_suffix: Vec<u8>,
    #[serde(default)]
    pub changelog: Vec<ChangelogRecord>,
    #[serde(flatten)]
    pub shards: ShardMap,
    /// Database properties (CouchDB 2.2+), carried through untouched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub props: Option<serde_json::Value>,
}

impl DatabaseConfig {
    pub fn name(&self) -> &str {
        self.id.as_deref().unwrap_or_default()
    }

    /// The file suffix shared by all shard files, decoded from its byte list
    pub fn suffix(&self) -> String {
        String::from_utf8_lossy(&self.shard_suffix).into_owned()
    }

    /// Reject a replica that already exists or targets a shard this
    /// database doesn't have
    pub fn ensure_can_add_replica(&self, shard: &str, node: &NodeId) -> AdminResult<()> {
        if self.shards.owns(node, shard) {
            return Err(AdminError::AlreadyReplicated {
                database: self.name().to_string(),
                shard: shard.to_string(),
                node: node.clone(),
            });
        }
        if !self.shards.has_shard(shard) {
            return Err(AdminError::UnknownShard {
                database: self.name().to_string(),
                shard: shard.to_string(),
            });
        }
        Ok(())
    }

    /// Declare `node` as a new owner of `shard`
    pub fn add_replica(&mut self, shard: &str, node: &NodeId) -> AdminResult<()> {
        self.ensure_can_add_replica(shard, node)?;
        self.shards.insert(shard, node);
        self.changelog
            .push(ChangelogEntry(ChangeAction::Add, shard.to_string(), node.clone()).into());
        Ok(())
    }

    /// Reject a removal that targets a missing replica or would orphan the shard
    pub fn ensure_can_remove_replica(&self, shard: &str, node: &NodeId) -> AdminResult<()> {
        let Some(held) = self.shards.shards_of(node) else {
            return Err(AdminError::NoSuchReplicaSet {
                database: self.name().to_string(),
                node: node.clone(),
            });
        };
        if !held.iter().any(|s| s == shard) {
            return Err(AdminError::ShardNotAtNode {
                database: self.name().to_string(),
                shard: shard.to_string(),
                node: node.clone(),
            });
        }
        let remaining = self
            .shards
            .owners(shard)
            .map(|nodes| nodes.iter().filter(|n| *n != node).count())
            .unwrap_or(0);
        if remaining == 0 {
            return Err(AdminError::LastReplicaProtection {
                database: self.name().to_string(),
                shard: shard.to_string(),
                node: node.clone(),
            });
        }
        Ok(())
    }

    /// Drop `node` as an owner of `shard`
    pub fn remove_replica(&mut self, shard: &str, node: &NodeId) -> AdminResult<()> {
        self.ensure_can_remove_replica(shard, node)?;
        self.shards.remove(shard, node);
        self.changelog.push(
            ChangelogEntry(ChangeAction::Delete, shard.to_string(), node.clone()).into(),
        );
        Ok(())
    }
}
