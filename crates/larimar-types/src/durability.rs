//! Durability requirements a caller can attach to a mutation.

use serde::{Deserialize, Serialize};

/// How many copies of a mutation must be persisted to disk.
///
/// `Master` and `One` share the numeric threshold 1 but differ in *where*
/// the persist must land: `Master` is satisfied only by the active node,
/// `One` by any single node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PersistTo {
    /// No persistence requirement.
    #[default]
    None,
    /// Persisted on the master node specifically.
    Master,
    /// Persisted on any one node.
    One,
    /// Persisted on two nodes.
    Two,
    /// Persisted on three nodes.
    Three,
    /// Persisted on four nodes.
    Four,
}

impl PersistTo {
    /// Numeric persistence threshold.
    pub fn value(self) -> u32 {
        match self {
            Self::None => 0,
            Self::Master | Self::One => 1,
            Self::Two => 2,
            Self::Three => 3,
            Self::Four => 4,
        }
    }

    /// Whether satisfying this requirement involves replica nodes at all.
    ///
    /// `Master` and `One` are satisfiable by the master alone.
    pub fn touches_replica(self) -> bool {
        self.value() >= 2
    }
}

/// How many replicas must hold the mutation in memory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReplicateTo {
    /// No replication requirement.
    #[default]
    None,
    /// Present on one replica.
    One,
    /// Present on two replicas.
    Two,
    /// Present on three replicas.
    Three,
}

impl ReplicateTo {
    /// Numeric replication threshold.
    pub fn value(self) -> u32 {
        match self {
            Self::None => 0,
            Self::One => 1,
            Self::Two => 2,
            Self::Three => 3,
        }
    }

    /// Whether satisfying this requirement involves replica nodes.
    pub fn touches_replica(self) -> bool {
        self.value() >= 1
    }
}
