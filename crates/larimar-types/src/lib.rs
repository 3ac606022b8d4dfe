//! # larimar-types: Core types for the Larimar cluster client
//!
//! This crate contains the shared data model used across the client:
//! - Topology snapshots ([`NodeInfo`], [`BucketConfig`], [`ClusterConfig`])
//! - Durability requirements ([`PersistTo`], [`ReplicateTo`])
//!
//! Topology values are immutable snapshots: a new [`BucketConfig`] replaces
//! the previous one atomically when the configuration provider accepts it.

mod durability;
mod topology;

pub use durability::{PersistTo, ReplicateTo};
pub use topology::{BucketConfig, ClusterConfig, KV_SERVICE, NodeInfo};
