//! couch-admin - CouchDB cluster administration
//!
//! Manages node membership and shard placement of a CouchDB 2.x+ cluster by
//! reading and rewriting its metadata documents over HTTP.
//!
//! # Features
//! - Node admission and removal (`_nodes`, `_membership`)
//! - Shard replica placement and removal (`_dbs/<db>`)
//! - Per-node config writes, including maintenance mode
//! - Database creation with explicit shard and replica counts
//!
//! # Usage Example
//! ```ignore
//! use couch_admin::{AdminConfig, ClusterAdministrator};
//!
//! let admin = ClusterAdministrator::new(&AdminConfig::default())?;
//! admin.replicate("orders", "00000000-1fffffff", "10.0.0.4").await?;
//! ```

pub mod cli;
pub mod config;
pub mod describe;
pub mod error;
pub mod membership;
pub mod metadata;
pub mod node;
pub mod placement;
pub mod transport;

// Re-export commonly used types
pub use cli::Operation;
pub use config::AdminConfig;
pub use error::{AdminError, AdminResult, ErrorKind, TransportError};
pub use membership::{JoinKind, MembershipIndex};
pub use metadata::{ClusterTopology, DatabaseConfig, NodeId, ShardMap};
pub use placement::ShardPlacementIndex;
pub use transport::{DocumentTransport, HttpTransport, Resource};

use std::sync::Arc;
use tracing::{info, warn};

use node::NodeHandle;

/// Entry point for every user-visible operation
///
/// Each call re-reads the documents it needs; nothing is cached between
/// calls.
#[derive(Clone)]
pub struct ClusterAdministrator {
    transport: Arc<dyn DocumentTransport>,
}

impl ClusterAdministrator {
    /// Talk to the server described by `config` over HTTP
    pub fn new(config: &AdminConfig) -> AdminResult<Self> {
        let transport = HttpTransport::new(config)?;
        Ok(Self::with_transport(Arc::new(transport)))
    }

    pub fn with_transport(transport: Arc<dyn DocumentTransport>) -> Self {
        Self { transport }
    }

    /// Shard placement of one database
    pub async fn describe_db(&self, db: &str) -> AdminResult<DatabaseConfig> {
        let index = ShardPlacementIndex::load(self.transport.clone(), db).await?;
        Ok(index.config().clone())
    }

    /// Current cluster membership
    pub async fn describe_cluster(&self) -> AdminResult<ClusterTopology> {
        let membership = MembershipIndex::load(self.transport.clone()).await?;
        Ok(membership.topology().clone())
    }

    /// Join a node by bare address
    pub async fn add_node(&self, address: &str) -> AdminResult<(NodeId, JoinKind)> {
        info!(node = address, "Adding node");
        let mut membership = MembershipIndex::load(self.transport.clone()).await?;
        membership.add_node(address).await
    }

    /// Remove a node that no longer owns any shard
    pub async fn remove_node(&self, address: &str) -> AdminResult<NodeId> {
        let node = NodeId::canonicalize(address);
        info!(node = %node, "Removing node");
        let mut membership = MembershipIndex::load(self.transport.clone()).await?;
        membership.remove_node(&node).await?;
        Ok(node)
    }

    /// Place an extra replica of `shard` on `replica`
    ///
    /// The target is left in maintenance mode; disable it once the new
    /// replica has caught up.
    pub async fn replicate(&self, db: &str, shard: &str, replica: &str) -> AdminResult<NodeId> {
        info!(db, shard, node = replica, "Replicating shard");
        let mut index = ShardPlacementIndex::load(self.transport.clone(), db).await?;
        let node = index.add_replica(shard, replica).await?;
        warn!(
            node = %node,
            "Node is in maintenance mode; run disable_maintenance_mode once the replica has synced"
        );
        Ok(node)
    }

    /// Drop the replica of `shard` held by `from`
    pub async fn remove_replica(&self, db: &str, shard: &str, from: &str) -> AdminResult<NodeId> {
        info!(db, shard, node = from, "Removing replica");
        let mut index = ShardPlacementIndex::load(self.transport.clone(), db).await?;
        index.remove_replica(shard, from).await
    }

    /// Create a database and return its initial placement
    pub async fn create_db(&self, db: &str, shards: u32, replicas: u32) -> AdminResult<DatabaseConfig> {
        info!(db, shards, replicas, "Creating database");
        let index = ShardPlacementIndex::create(self.transport.clone(), db, replicas, shards).await?;
        Ok(index.config().clone())
    }

    pub async fn disable_maintenance_mode(&self, address: &str) -> AdminResult<NodeId> {
        let node = NodeHandle::at(address, self.transport.clone());
        node.disable_maintenance().await?;
        Ok(node.id().clone())
    }

    /// Write one config value on a node
    pub async fn set_config(
        &self,
        address: &str,
        section: &str,
        key: &str,
        value: &str,
    ) -> AdminResult<NodeId> {
        let node = NodeHandle::at(address, self.transport.clone());
        node.set_config(section, key, value).await?;
        Ok(node.id().clone())
    }

    /// Run a validated operation and return the text to print
    pub async fn run(&self, operation: Operation) -> AdminResult<String> {
        let output = match operation {
            Operation::DescribeDb { db } => describe::render_database(&self.describe_db(&db).await?),
            Operation::DescribeCluster => describe::render_cluster(&self.describe_cluster().await?),
            Operation::AddNode { node } => {
                let (node, kind) = self.add_node(&node).await?;
                match kind {
                    JoinKind::Fresh => format!("join requested for {}", node),
                    JoinKind::Rejoin => format!("rejoin requested for {}", node),
                }
            }
            Operation::RemoveNode { node } => {
                format!("removed {}", self.remove_node(&node).await?)
            }
            Operation::Replicate { db, shard, replica } => {
                let node = self.replicate(&db, &shard, &replica).await?;
                format!(
                    "{} now replicates {} of {}; it is in maintenance mode until disabled",
                    node, shard, db
                )
            }
            Operation::RemoveReplica { db, shard, from } => {
                let node = self.remove_replica(&db, &shard, &from).await?;
                format!("removed replica of {} of {} from {}", shard, db, node)
            }
            Operation::CreateDb {
                db,
                shards,
                replicas,
            } => describe::render_database(&self.create_db(&db, shards, replicas).await?),
            Operation::DisableMaintenanceMode { node } => {
                let node = self.disable_maintenance_mode(&node).await?;
                format!("maintenance mode disabled on {}", node)
            }
            Operation::SetConfig {
                node,
                section,
                key,
                value,
            } => {
                let node = self.set_config(&node, &section, &key, &value).await?;
                format!("{}/{} = {} on {}", section, key, value, node)
            }
        };
        Ok(output)
    }
}
