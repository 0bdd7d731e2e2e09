//! Cluster metadata definitions
//!
//! Typed views of the CouchDB documents this tool reads and writes

mod node;
mod shard;
mod cluster;

pub use node::{NodeId, NodeMembershipRecord, Revision, WriteAck, NODE_NAME_PREFIX};
pub use shard::{ChangeAction, ChangelogEntry, ChangelogRecord, DatabaseConfig, ShardId, ShardMap};
pub use cluster::ClusterTopology;
