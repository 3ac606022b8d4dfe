//! Ordered iteration over a bucket's KV-enabled nodes.

use larimar_types::{BucketConfig, NodeInfo};

/// Iterator over the nodes of a [`BucketConfig`] that expose the binary
/// key-value service.
///
/// Order is stable (matches `BucketConfig::nodes`) and nodes without the
/// service are filtered out entirely. The sequence is lazy, finite, and
/// non-restartable; create a fresh selector to start over.
pub struct NodeSelector<'a> {
    nodes: std::slice::Iter<'a, NodeInfo>,
}

impl<'a> NodeSelector<'a> {
    /// Creates a selector over `config`'s nodes.
    pub fn new(config: &'a BucketConfig) -> Self {
        Self {
            nodes: config.nodes.iter(),
        }
    }
}

impl<'a> Iterator for NodeSelector<'a> {
    type Item = &'a NodeInfo;

    fn next(&mut self) -> Option<Self::Item> {
        self.nodes.by_ref().find(|node| node.is_kv_enabled())
    }
}
