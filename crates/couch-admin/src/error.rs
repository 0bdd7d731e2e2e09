//! Error types
//!
//! `TransportError` covers everything that goes wrong talking to the store,
//! `AdminError` adds the membership and placement rules on top of it.

use crate::metadata::{NodeId, ShardId};

/// Transport error
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{method} {resource} returned status {status}: {body}")]
    Status {
        method: &'static str,
        resource: String,
        status: u16,
        body: String,
    },
    /// The store rejected a write because the supplied revision is stale.
    #[error("revision conflict writing {resource}: document was modified concurrently")]
    Conflict { resource: String },
    #[error("failed to decode {resource}: {source}")]
    Decode {
        resource: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode request body for {resource}: {source}")]
    Encode {
        resource: String,
        #[source]
        source: serde_json::Error,
    },
}

pub type TransportResult<T> = Result<T, TransportError>;

/// Coarse classification used for reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or malformed input, caught before any request
    Validation,
    /// Database or node absent
    NotFound,
    /// Already joined, already replicated, stale revision, ownership
    Conflict,
    /// Would leave a shard without owners
    InvariantViolation,
    /// Network failure, non-2xx response, decode failure
    Transport,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::Validation => write!(f, "validation"),
            ErrorKind::NotFound => write!(f, "not_found"),
            ErrorKind::Conflict => write!(f, "conflict"),
            ErrorKind::InvariantViolation => write!(f, "invariant_violation"),
            ErrorKind::Transport => write!(f, "transport"),
        }
    }
}

/// Admin operation error
#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    #[error("missing {0} parameter")]
    MissingParameter(&'static str),
    #[error("invalid {name} parameter: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("database {0} does not exist")]
    DatabaseNotFound(String),
    #[error("node {0} has no membership record")]
    NodeNotFound(NodeId),

    #[error("node {0} is already part of the cluster")]
    AlreadyJoined(NodeId),
    #[error("node {node} is already replicating shard {shard} of {database}")]
    AlreadyReplicated {
        database: String,
        shard: ShardId,
        node: NodeId,
    },
    #[error("{shard} is not a shard of {database}; shards are fixed at creation time")]
    UnknownShard { database: String, shard: ShardId },
    #[error("node {0} is not up and joined to the cluster")]
    NotInCluster(NodeId),
    #[error("node {node} still owns shards of database {database}; move them before removing the node")]
    OwnershipConflict { node: NodeId, database: String },
    #[error("node {node} does not hold any replica of {database}")]
    NoSuchReplicaSet { database: String, node: NodeId },
    #[error("shard {shard} of {database} is not at {node}")]
    ShardNotAtNode {
        database: String,
        shard: ShardId,
        node: NodeId,
    },
    #[error("aborting: removing {node} would leave shard {shard} of {database} without any replica")]
    LastReplicaProtection {
        database: String,
        shard: ShardId,
        node: NodeId,
    },
    /// The placement write failed after the target node was sent into
    /// maintenance mode. Maintenance is not cleared automatically.
    #[error("failed to write placement of {database} ({source}); node {node} was left in maintenance mode, clear it with disable_maintenance_mode")]
    MaintenanceLeftEnabled {
        database: String,
        node: NodeId,
        #[source]
        source: TransportError,
    },

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl AdminError {
    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            AdminError::MissingParameter(_) | AdminError::InvalidParameter { .. } => {
                ErrorKind::Validation
            }
            AdminError::DatabaseNotFound(_)
            | AdminError::NodeNotFound(_)
            | AdminError::UnknownShard { .. }
            | AdminError::NoSuchReplicaSet { .. }
            | AdminError::ShardNotAtNode { .. } => ErrorKind::NotFound,
            AdminError::AlreadyJoined(_)
            | AdminError::AlreadyReplicated { .. }
            | AdminError::NotInCluster(_)
            | AdminError::OwnershipConflict { .. } => ErrorKind::Conflict,
            AdminError::LastReplicaProtection { .. } => ErrorKind::InvariantViolation,
            AdminError::MaintenanceLeftEnabled { source, .. } => transport_kind(source),
            AdminError::Transport(source) => transport_kind(source),
        }
    }

    /// Whether the store rejected a write carrying a stale revision
    pub fn is_revision_conflict(&self) -> bool {
        matches!(
            self,
            AdminError::Transport(TransportError::Conflict { .. })
                | AdminError::MaintenanceLeftEnabled {
                    source: TransportError::Conflict { .. },
                    ..
                }
        )
    }
}

fn transport_kind(err: &TransportError) -> ErrorKind {
    match err {
        TransportError::Conflict { .. } => ErrorKind::Conflict,
        _ => ErrorKind::Transport,
    }
}

pub type AdminResult<T> = Result<T, AdminError>;
