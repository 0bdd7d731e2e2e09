//! Configuration module for couch-admin
//!
//! Supports YAML configuration files; command line flags are merged on top.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::transport::Interface;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdminConfig {
    /// Target server
    #[serde(default)]
    pub server: ServerConfig,
    /// Admin credentials
    #[serde(default)]
    pub credentials: CredentialsConfig,
    /// Logging configuration
    #[serde(default)]
    pub log: LogConfig,
}

impl AdminConfig {
    /// Load configuration from YAML file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
        Self::from_yaml(&content)
    }

    /// Load configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(yaml).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Merge with another config (other takes precedence)
    pub fn merge(&mut self, other: AdminConfig) {
        self.server.merge(other.server);
        self.credentials.merge(other.credentials);
        self.log.merge(other.log);
    }

    /// Base URL of one of the server's HTTP interfaces
    pub fn base_url(&self, interface: Interface) -> String {
        let port = match interface {
            Interface::Clustered => self.server.clustered_port,
            Interface::NodeLocal => self.server.node_local_port,
        };
        format!("{}://{}:{}", self.server.scheme, self.server.host, port)
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host or IP of any cluster node
    #[serde(default = "default_host")]
    pub host: String,
    /// `http` or `https`
    #[serde(default = "default_scheme")]
    pub scheme: String,
    /// Cluster-wide API port
    #[serde(default = "default_clustered_port")]
    pub clustered_port: u16,
    /// Node-local API port
    #[serde(default = "default_node_local_port")]
    pub node_local_port: u16,
    /// Per-request timeout (seconds)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            scheme: default_scheme(),
            clustered_port: default_clustered_port(),
            node_local_port: default_node_local_port(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl ServerConfig {
    fn merge(&mut self, other: Self) {
        if !other.host.is_empty() {
            self.host = other.host;
        }
        if !other.scheme.is_empty() {
            self.scheme = other.scheme;
        }
        if other.clustered_port > 0 {
            self.clustered_port = other.clustered_port;
        }
        if other.node_local_port > 0 {
            self.node_local_port = other.node_local_port;
        }
        if other.request_timeout_secs > 0 {
            self.request_timeout_secs = other.request_timeout_secs;
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Admin credentials
#[derive(Clone, Serialize, Deserialize)]
pub struct CredentialsConfig {
    #[serde(default = "default_username")]
    pub username: String,
    #[serde(default = "default_password")]
    pub password: String,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            username: default_username(),
            password: default_password(),
        }
    }
}

impl CredentialsConfig {
    fn merge(&mut self, other: Self) {
        if !other.username.is_empty() {
            self.username = other.username;
        }
        if !other.password.is_empty() {
            self.password = other.password;
        }
    }
}

impl std::fmt::Debug for CredentialsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialsConfig")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl LogConfig {
    fn merge(&mut self, other: Self) {
        if !other.level.is_empty() {
            self.level = other.level;
        }
    }
}

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Parse error: {0}")]
    ParseError(String),
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_scheme() -> String {
    "http".to_string()
}

fn default_clustered_port() -> u16 {
    5984
}

fn default_node_local_port() -> u16 {
    5986
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_username() -> String {
    "admin".to_string()
}

fn default_password() -> String {
    "password".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AdminConfig::default();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.credentials.username, "admin");
        assert_eq!(config.server.request_timeout(), Duration::from_secs(10));
        assert_eq!(
            config.base_url(Interface::Clustered),
            "http://127.0.0.1:5984"
        );
        assert_eq!(
            config.base_url(Interface::NodeLocal),
            "http://127.0.0.1:5986"
        );
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = r#"
server:
  host: couch-1.internal
  request_timeout_secs: 3
credentials:
  username: ops
"#;
        let config = AdminConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.server.host, "couch-1.internal");
        assert_eq!(config.server.clustered_port, 5984);
        assert_eq!(config.server.request_timeout_secs, 3);
        assert_eq!(config.credentials.username, "ops");
        assert_eq!(config.credentials.password, "password");
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn test_merge_prefers_other() {
        let mut config = AdminConfig::default();
        let mut other = AdminConfig::default();
        other.server.host = "10.0.0.7".to_string();
        other.server.scheme = "https".to_string();
        other.log.level = String::new();
        config.merge(other);

        assert_eq!(config.server.host, "10.0.0.7");
        assert_eq!(config.base_url(Interface::NodeLocal), "https://10.0.0.7:5986");
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn test_password_not_in_debug_output() {
        let config = AdminConfig::default();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("\"password\""));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_invalid_yaml() {
        let err = AdminConfig::from_yaml("server: [").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }
}
