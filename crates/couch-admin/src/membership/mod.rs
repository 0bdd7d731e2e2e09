//! Membership module
//!
//! Answers "is this node part of the cluster" and performs node admission
//! and removal against the `_membership` / `_nodes` documents

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{AdminError, AdminResult, TransportError};
use crate::metadata::{ClusterTopology, NodeId, NodeMembershipRecord, Revision};
use crate::placement::ShardPlacementIndex;
use crate::transport::{self, DocumentTransport, Resource};

/// Outcome of a join request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    /// Node was never known to the cluster
    Fresh,
    /// Node was known but not joined; the prior revision was supplied
    Rejoin,
}

/// Cluster membership index
pub struct MembershipIndex {
    transport: Arc<dyn DocumentTransport>,
    topology: ClusterTopology,
}

impl MembershipIndex {
    /// Read the current membership
    pub async fn load(transport: Arc<dyn DocumentTransport>) -> AdminResult<Self> {
        let topology = fetch_topology(transport.as_ref()).await?;
        Ok(Self {
            transport,
            topology,
        })
    }

    /// Re-read membership; on failure the previous view is kept
    pub async fn refresh(&mut self) -> AdminResult<()> {
        let topology = fetch_topology(self.transport.as_ref()).await?;
        self.topology = topology;
        Ok(())
    }

    pub fn topology(&self) -> &ClusterTopology {
        &self.topology
    }

    pub fn is_known(&self, node: &NodeId) -> bool {
        self.topology.is_known(node)
    }

    pub fn is_up_and_joined(&self, node: &NodeId) -> bool {
        self.topology.is_up_and_joined(node)
    }

    /// Join a node by bare address
    ///
    /// A successful response only means the store accepted the membership
    /// record; the node may not show up as joined until the cluster
    /// converges.
    pub async fn add_node(&mut self, address: &str) -> AdminResult<(NodeId, JoinKind)> {
        let node = NodeId::canonicalize(address);

        if self.is_up_and_joined(&node) {
            return Err(AdminError::AlreadyJoined(node));
        }

        let prior = if self.is_known(&node) {
            let rev = self.fetch_record(&node).await?.and_then(|r| r.rev);
            if rev.is_none() {
                warn!(node = %node, "Known node has no membership record, joining afresh");
            }
            rev
        } else {
            None
        };
        let kind = match prior {
            Some(ref rev) => {
                debug!(node = %node, rev = %rev, "Rejoining known node");
                JoinKind::Rejoin
            }
            None => JoinKind::Fresh,
        };

        transport::store(
            self.transport.as_ref(),
            &Resource::NodeRecord(node.clone()),
            &NodeMembershipRecord::join_body(prior),
        )
        .await?;
        info!(node = %node, ?kind, "Join request accepted");

        self.refresh().await?;
        if !self.is_up_and_joined(&node) {
            warn!(
                node = %node,
                "Node not reported as joined yet; membership converges asynchronously"
            );
        }

        Ok((node, kind))
    }

    /// Remove a node that owns no shard in any database
    pub async fn remove_node(&mut self, node: &NodeId) -> AdminResult<()> {
        let databases: Vec<String> =
            transport::fetch(self.transport.as_ref(), &Resource::AllDatabases).await?;

        for name in &databases {
            let index = match ShardPlacementIndex::load(self.transport.clone(), name).await {
                Ok(index) => index,
                Err(AdminError::DatabaseNotFound(_)) => {
                    warn!(db = %name, "Database listed but has no placement document, skipping");
                    continue;
                }
                Err(e) => return Err(e),
            };
            if index.config().shards.holds_any(node) {
                return Err(AdminError::OwnershipConflict {
                    node: node.clone(),
                    database: name.clone(),
                });
            }
            debug!(db = %name, node = %node, "Node owns no shards");
        }

        let rev = match self.fetch_record(node).await? {
            Some(NodeMembershipRecord { rev: Some(rev), .. }) => rev,
            _ => return Err(AdminError::NodeNotFound(node.clone())),
        };
        self.delete_record(node, &rev).await?;
        info!(node = %node, checked = databases.len(), "Node removed from cluster");

        self.refresh().await
    }

    /// The node's `_nodes` document, or `None` when the store has none
    async fn fetch_record(&self, node: &NodeId) -> AdminResult<Option<NodeMembershipRecord>> {
        let resource = Resource::NodeRecord(node.clone());
        let record: NodeMembershipRecord =
            match transport::fetch(self.transport.as_ref(), &resource).await {
                Ok(record) => record,
                Err(TransportError::Status { status: 404, .. }) => return Ok(None),
                Err(e) => return Err(e.into()),
            };
        Ok(record.exists().then_some(record))
    }

    async fn delete_record(&self, node: &NodeId, rev: &Revision) -> AdminResult<()> {
        self.transport
            .delete(&Resource::NodeRecord(node.clone()), rev)
            .await?;
        Ok(())
    }
}

async fn fetch_topology(transport: &dyn DocumentTransport) -> AdminResult<ClusterTopology> {
    let topology: ClusterTopology = transport::fetch(transport, &Resource::Membership).await?;
    debug!(
        all_nodes = topology.all_nodes.len(),
        cluster_nodes = topology.cluster_nodes.len(),
        "Loaded cluster membership"
    );
    let unreachable = topology.unreachable_members();
    if !unreachable.is_empty() {
        warn!(nodes = ?unreachable, "Joined nodes missing from all_nodes");
    }
    Ok(topology)
}
