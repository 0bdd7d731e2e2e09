//! Per-node operations
//!
//! Canonical addressing plus the config writes used to toggle maintenance mode

use std::sync::Arc;

use serde_json::Value;
use tracing::info;

use crate::error::TransportResult;
use crate::metadata::NodeId;
use crate::transport::{DocumentTransport, Resource};

/// Config section holding the maintenance flag
pub const MAINTENANCE_SECTION: &str = "couchdb";
/// Key of the maintenance flag
pub const MAINTENANCE_KEY: &str = "maintenance_mode";

/// One node of the cluster, addressed by its canonical id
pub struct NodeHandle {
    id: NodeId,
    transport: Arc<dyn DocumentTransport>,
}

impl NodeHandle {
    /// Address a node by bare host or IP
    pub fn at(address: &str, transport: Arc<dyn DocumentTransport>) -> Self {
        Self {
            id: NodeId::canonicalize(address),
            transport,
        }
    }

    pub fn id(&self) -> &NodeId {
        &self.id
    }

    /// Write one config value on this node
    pub async fn set_config(&self, section: &str, key: &str, value: &str) -> TransportResult<()> {
        let resource = Resource::NodeConfig {
            node: self.id.clone(),
            section: section.to_string(),
            key: key.to_string(),
        };
        self.transport
            .put(&resource, Value::String(value.to_string()))
            .await?;
        info!(node = %self.id, section, key, value, "Config value applied");
        Ok(())
    }

    /// Stop the node from serving while new replicas converge
    pub async fn into_maintenance(&self) -> TransportResult<()> {
        self.set_maintenance_flag(true).await
    }

    pub async fn disable_maintenance(&self) -> TransportResult<()> {
        self.set_maintenance_flag(false).await
    }

    async fn set_maintenance_flag(&self, value: bool) -> TransportResult<()> {
        self.set_config(MAINTENANCE_SECTION, MAINTENANCE_KEY, &value.to_string())
            .await
    }
}
