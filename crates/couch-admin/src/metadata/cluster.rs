//! Cluster membership view

use serde::{Deserialize, Serialize};

use super::NodeId;

/// Cluster topology as reported by `_membership`
///
/// `all_nodes` holds every node the store knows about, `cluster_nodes` the
/// ones logically joined. A node can be known without being joined, which is
/// what separates a rejoin from a fresh join.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterTopology {
    #[serde(default)]
    pub all_nodes: Vec<NodeId>,
    #[serde(default)]
    pub cluster_nodes: Vec<NodeId>,
}

impl ClusterTopology {
    /// Has the node ever joined (even if since removed or down)
    pub fn is_known(&self, node: &NodeId) -> bool {
        self.all_nodes.contains(node)
    }

    /// Known and currently joined
    pub fn is_up_and_joined(&self, node: &NodeId) -> bool {
        self.is_known(node) && self.cluster_nodes.contains(node)
    }

    /// Every node in either list, each once, in first-seen order
    pub fn nodes(&self) -> Vec<&NodeId> {
        let mut out: Vec<&NodeId> = Vec::new();
        for node in self.all_nodes.iter().chain(self.cluster_nodes.iter()) {
            if !out.contains(&node) {
                out.push(node);
            }
        }
        out
    }

    /// Joined nodes the store does not report in `all_nodes`
    pub fn unreachable_members(&self) -> Vec<&NodeId> {
        self.cluster_nodes
            .iter()
            .filter(|n| !self.all_nodes.contains(n))
            .collect()
    }
}
