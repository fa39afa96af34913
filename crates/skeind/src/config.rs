//! TOML configuration for the skein daemon.
//!
//! Every field has a default, so a missing file or a partial file is fine.

use std::num::{NonZeroU8, NonZeroU16};
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;
use skein_types::{DEFAULT_NUM_REPLICAS, DEFAULT_NUM_SHARDS, NodeName};

/// Top-level configuration, parsed from TOML.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Node identity and storage.
    pub node: NodeSection,
    /// Cluster membership and partitioning.
    pub cluster: ClusterSection,
    /// Logging configuration.
    pub log: LogSection,
}

/// `[node]` section.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct NodeSection {
    /// Base storage directory. Lock files live in `{data_dir}/.shards`.
    pub data_dir: PathBuf,
    /// Local bind identity. Also used as the node's name in the ring.
    pub bind_addr: String,
}

impl Default for NodeSection {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            bind_addr: "0.0.0.0:50000".to_string(),
        }
    }
}

/// `[cluster]` section.
///
/// `num_shards` and `num_replicas` must be the same on every node for the
/// whole life of the cluster.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ClusterSection {
    /// Boot peers, by bind address. Treated as live members at startup.
    pub peers: Vec<NodeName>,
    /// Number of shards the keyspace is split into.
    pub num_shards: NonZeroU16,
    /// Virtual ring points per node.
    pub num_replicas: NonZeroU8,
}

impl Default for ClusterSection {
    fn default() -> Self {
        Self {
            peers: Vec::new(),
            num_shards: DEFAULT_NUM_SHARDS,
            num_replicas: DEFAULT_NUM_REPLICAS,
        }
    }
}

/// `[log]` section.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LogSection {
    /// Log level filter (e.g. `"info"`, `"debug"`, `"warn"`).
    pub level: String,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl CliConfig {
    /// Load config from a TOML file, or use defaults if no path is given.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(p) => {
                let content = std::fs::read_to_string(p)
                    .with_context(|| format!("cannot read {}", p.display()))?;
                let config: CliConfig = toml::from_str(&content)
                    .with_context(|| format!("invalid config in {}", p.display()))?;
                Ok(config)
            }
            None => Ok(Self::default()),
        }
    }

    /// Parse config from a TOML string (used in tests).
    #[cfg(test)]
    pub fn from_toml(s: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(s)?)
    }
}
