//! Topology snapshots: nodes, buckets, and the cluster-wide map.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Service tag under which a node advertises the binary key-value port.
///
/// A node that does not carry this tag cannot answer data-protocol requests
/// and is skipped by both the refresher and the observer.
pub const KV_SERVICE: &str = "direct";

/// A single node in a bucket's topology.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeInfo {
    /// Hostname (or address literal) the node is reachable at.
    pub hostname: String,

    /// Advertised services, keyed by service tag, valued by port.
    pub services: BTreeMap<String, u16>,
}

impl NodeInfo {
    /// Creates a node with no advertised services.
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            services: BTreeMap::new(),
        }
    }

    /// Adds a service entry, builder style.
    #[must_use]
    pub fn with_service(mut self, tag: impl Into<String>, port: u16) -> Self {
        self.services.insert(tag.into(), port);
        self
    }

    /// Whether this node advertises the binary key-value service.
    pub fn is_kv_enabled(&self) -> bool {
        self.services.contains_key(KV_SERVICE)
    }

    /// Port of the binary key-value service, if advertised.
    pub fn kv_port(&self) -> Option<u16> {
        self.services.get(KV_SERVICE).copied()
    }
}

/// Immutable topology snapshot for one named bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketConfig {
    /// Bucket name.
    pub name: String,

    /// Nodes in topology order. Order is meaningful: failover walks it
    /// front to back.
    pub nodes: Vec<NodeInfo>,

    /// Number of configured replicas for this bucket.
    pub num_replicas: u32,
}

impl BucketConfig {
    /// Creates a bucket config snapshot.
    pub fn new(name: impl Into<String>, nodes: Vec<NodeInfo>, num_replicas: u32) -> Self {
        Self {
            name: name.into(),
            nodes,
            num_replicas,
        }
    }
}

/// Read-only snapshot mapping bucket names to their current config.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterConfig {
    buckets: BTreeMap<String, BucketConfig>,
}

impl ClusterConfig {
    /// Creates an empty cluster snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts (or replaces) a bucket config, keyed by its name.
    pub fn insert(&mut self, config: BucketConfig) {
        self.buckets.insert(config.name.clone(), config);
    }

    /// Looks up a bucket by name.
    pub fn bucket(&self, name: &str) -> Option<&BucketConfig> {
        self.buckets.get(name)
    }

    /// Iterates bucket configs in name order.
    pub fn buckets(&self) -> impl Iterator<Item = &BucketConfig> {
        self.buckets.values()
    }

    /// Number of buckets in the snapshot.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// Whether the snapshot holds no buckets.
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

impl FromIterator<BucketConfig> for ClusterConfig {
    fn from_iter<I: IntoIterator<Item = BucketConfig>>(iter: I) -> Self {
        let mut config = Self::new();
        for bucket in iter {
            config.insert(bucket);
        }
        config
    }
}
