//! Command line definitions
//!
//! Required per-command flags are parsed as optional strings and validated
//! into an [`Operation`] so that every missing parameter gets its own error
//! before any request is made.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{AdminConfig, CredentialsConfig, LogConfig, ServerConfig};
use crate::error::{AdminError, AdminResult};

/// Shard count used by `create_db` when none is given
pub const DEFAULT_SHARDS: u32 = 8;
/// Replica count used by `create_db` when none is given
pub const DEFAULT_REPLICAS: u32 = 3;

/// couch-admin - CouchDB cluster administration
#[derive(Parser, Debug)]
#[command(name = "couch-admin")]
#[command(about = "Manage membership and shard placement of a CouchDB cluster", long_about = None)]
pub struct Cli {
    /// Host or IP of any cluster node
    #[arg(long, global = true)]
    pub server: Option<String>,

    /// Admin username
    #[arg(long, global = true)]
    pub admin: Option<String>,

    /// Admin password
    #[arg(long, global = true)]
    pub password: Option<String>,

    /// YAML configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
#[command(rename_all = "snake_case")]
pub enum Command {
    /// Print the shard placement of a database
    DescribeDb {
        #[arg(long)]
        db: Option<String>,
    },
    /// Add a replica of a shard on a node and put that node into maintenance
    Replicate {
        #[arg(long)]
        db: Option<String>,
        #[arg(long)]
        shard: Option<String>,
        #[arg(long)]
        replica: Option<String>,
    },
    /// Join a node to the cluster
    AddNode {
        #[arg(long)]
        node: Option<String>,
    },
    /// Print cluster membership
    DescribeCluster,
    /// Create a database with explicit shard and replica counts
    CreateDb {
        #[arg(long)]
        db: Option<String>,
        #[arg(long, default_value_t = DEFAULT_SHARDS, value_parser = clap::value_parser!(u32).range(1..))]
        shards: u32,
        #[arg(long, default_value_t = DEFAULT_REPLICAS, value_parser = clap::value_parser!(u32).range(1..))]
        replicas: u32,
    },
    /// Drop one replica of a shard
    RemoveReplica {
        #[arg(long)]
        db: Option<String>,
        #[arg(long)]
        shard: Option<String>,
        #[arg(long)]
        from: Option<String>,
    },
    /// Let a node serve again after its new replicas have synced
    DisableMaintenanceMode {
        #[arg(long)]
        node: Option<String>,
    },
    /// Write one config value on a node
    SetConfig {
        #[arg(long)]
        node: Option<String>,
        #[arg(long)]
        section: Option<String>,
        #[arg(long)]
        key: Option<String>,
        #[arg(long)]
        value: Option<String>,
    },
    /// Remove a node that owns no shards
    RemoveNode {
        #[arg(long)]
        node: Option<String>,
    },
}

/// A fully validated user request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    DescribeDb {
        db: String,
    },
    Replicate {
        db: String,
        shard: String,
        replica: String,
    },
    AddNode {
        node: String,
    },
    DescribeCluster,
    CreateDb {
        db: String,
        shards: u32,
        replicas: u32,
    },
    RemoveReplica {
        db: String,
        shard: String,
        from: String,
    },
    DisableMaintenanceMode {
        node: String,
    },
    SetConfig {
        node: String,
        section: String,
        key: String,
        value: String,
    },
    RemoveNode {
        node: String,
    },
}

impl Cli {
    /// Connection flags as a config layer for [`AdminConfig::merge`]
    ///
    /// Flags that were not given stay empty (or zero) so they don't override
    /// anything.
    pub fn overrides(&self) -> AdminConfig {
        let flag = |value: &Option<String>| value.clone().unwrap_or_default();
        AdminConfig {
            server: ServerConfig {
                host: flag(&self.server),
                scheme: String::new(),
                clustered_port: 0,
                node_local_port: 0,
                request_timeout_secs: 0,
            },
            credentials: CredentialsConfig {
                username: flag(&self.admin),
                password: flag(&self.password),
            },
            log: LogConfig {
                level: flag(&self.log_level),
            },
        }
    }
}

impl Command {
    /// Check required parameters
    pub fn validate(self) -> AdminResult<Operation> {
        let op = match self {
            Command::DescribeDb { db } => Operation::DescribeDb {
                db: required("db", db)?,
            },
            Command::Replicate { db, shard, replica } => Operation::Replicate {
                db: required("db", db)?,
                shard: required("shard", shard)?,
                replica: required("replica", replica)?,
            },
            Command::AddNode { node } => Operation::AddNode {
                node: required("node", node)?,
            },
            Command::DescribeCluster => Operation::DescribeCluster,
            Command::CreateDb {
                db,
                shards,
                replicas,
            } => Operation::CreateDb {
                db: required("db", db)?,
                shards,
                replicas,
            },
            Command::RemoveReplica { db, shard, from } => Operation::RemoveReplica {
                db: required("db", db)?,
                shard: required("shard", shard)?,
                from: required("from", from)?,
            },
            Command::DisableMaintenanceMode { node } => Operation::DisableMaintenanceMode {
                node: required("node", node)?,
            },
            Command::SetConfig {
                node,
                section,
                key,
                value,
            } => Operation::SetConfig {
                node: required("node", node)?,
                section: required("section", section)?,
                key: required("key", key)?,
                value: required("value", value)?,
            },
            Command::RemoveNode { node } => Operation::RemoveNode {
                node: required("node", node)?,
            },
        };
        Ok(op)
    }
}

fn required(name: &'static str, value: Option<String>) -> AdminResult<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(AdminError::MissingParameter(name)),
    }
}
