//! Shard placement module
//!
//! Loads one database's placement document, validates replica moves against
//! it and writes the whole document back in a single request.

use std::sync::Arc;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{AdminError, AdminResult, TransportError};
use crate::membership::MembershipIndex;
use crate::metadata::{DatabaseConfig, NodeId, WriteAck};
use crate::node::NodeHandle;
use crate::transport::{self, DocumentTransport, Resource};

/// Placement index of a single database
pub struct ShardPlacementIndex {
    transport: Arc<dyn DocumentTransport>,
    name: String,
    config: DatabaseConfig,
}

impl ShardPlacementIndex {
    /// Fetch a database's placement document
    ///
    /// The store answers an unknown database with a document that has no
    /// `_id`, which is reported as `DatabaseNotFound`.
    pub async fn load(transport: Arc<dyn DocumentTransport>, name: &str) -> AdminResult<Self> {
        let resource = Resource::DatabaseConfig(name.to_string());
        let config: DatabaseConfig = match transport::fetch(transport.as_ref(), &resource).await {
            Ok(config) => config,
            Err(TransportError::Status { status: 404, .. }) => {
                return Err(AdminError::DatabaseNotFound(name.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        if config.id.is_none() {
            return Err(AdminError::DatabaseNotFound(name.to_string()));
        }
        debug!(
            db = name,
            rev = ?config.rev,
            shards = config.shards.by_range.len(),
            nodes = config.shards.by_node.len(),
            "Loaded database placement"
        );
        if !config.shards.is_consistent() {
            warn!(
                db = name,
                orphans = ?config.shards.orphan_shards(),
                "Stored placement is inconsistent; by_node and by_range disagree"
            );
        }

        Ok(Self {
            transport,
            name: name.to_string(),
            config,
        })
    }

    /// Create a database with `shards` shards of `replicas` copies each,
    /// then load its placement
    pub async fn create(
        transport: Arc<dyn DocumentTransport>,
        name: &str,
        replicas: u32,
        shards: u32,
    ) -> AdminResult<Self> {
        if replicas == 0 {
            return Err(AdminError::InvalidParameter {
                name: "replicas",
                reason: "must be at least 1".to_string(),
            });
        }
        if shards == 0 {
            return Err(AdminError::InvalidParameter {
                name: "shards",
                reason: "must be at least 1".to_string(),
            });
        }

        let resource = Resource::Database {
            name: name.to_string(),
            replicas,
            shards,
        };
        transport.put(&resource, Value::Null).await?;
        info!(db = name, replicas, shards, "Database created");

        Self::load(transport, name).await
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    /// Add a replica of `shard` on the node at `address`
    ///
    /// The target node is put into maintenance mode before the placement is
    /// written. If the write then fails, the node stays in maintenance and
    /// the returned error says so.
    pub async fn add_replica(&mut self, shard: &str, address: &str) -> AdminResult<NodeId> {
        let node = NodeHandle::at(address, self.transport.clone());
        let node_id = node.id().clone();

        self.config.ensure_can_add_replica(shard, &node_id)?;

        let membership = MembershipIndex::load(self.transport.clone()).await?;
        if !membership.is_up_and_joined(&node_id) {
            return Err(AdminError::NotInCluster(node_id));
        }

        let mut staged = self.config.clone();
        staged.add_replica(shard, &node_id)?;

        node.into_maintenance().await?;
        debug!(node = %node_id, "Node sent into maintenance");

        if let Err(e) = self.persist(staged).await {
            warn!(
                db = %self.name,
                shard,
                node = %node_id,
                "Placement write failed after maintenance mode was enabled; clear it manually"
            );
            return Err(AdminError::MaintenanceLeftEnabled {
                database: self.name.clone(),
                node: node_id,
                source: e,
            });
        }
        info!(db = %self.name, shard, node = %node_id, "Replica added");

        Ok(node_id)
    }

    /// Remove the replica of `shard` held by the node at `address`
    pub async fn remove_replica(&mut self, shard: &str, address: &str) -> AdminResult<NodeId> {
        let node_id = NodeId::canonicalize(address);

        let mut staged = self.config.clone();
        staged.remove_replica(shard, &node_id)?;

        self.persist(staged).await?;
        info!(db = %self.name, shard, node = %node_id, "Replica removed");

        Ok(node_id)
    }

    /// Write the whole document, carrying the revision it was read with
    async fn persist(&mut self, mut staged: DatabaseConfig) -> Result<(), TransportError> {
        let resource = Resource::DatabaseConfig(self.name.clone());
        let resp = transport::store(self.transport.as_ref(), &resource, &staged).await?;

        // The write already succeeded; an unreadable ack only loses the new rev
        let ack: WriteAck = transport::decode(&resource, resp).unwrap_or_default();
        if let Some(rev) = ack.rev {
            staged.rev = Some(rev);
        }
        debug!(db = %self.name, rev = ?staged.rev, "Placement document written");

        self.config = staged;
        Ok(())
    }
}
