//! Client error types.

use larimar_protocol::FacadeError;
use thiserror::Error;

/// Errors an observe operation can surface.
///
/// The refresher has no error surface: every failure there is swallowed and
/// the next node or the next tick retries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ObserveError {
    /// The master reported a CAS other than the one the caller holds: the
    /// document was modified underneath the caller.
    #[error("document was concurrently modified")]
    DocumentConcurrentlyModified,

    /// The durability criterion asks for more replicas than the bucket has.
    #[error("criterion requires {requested} replicas but the bucket has {configured}")]
    ReplicaNotConfigured {
        /// Replicas the criterion needs.
        requested: u32,
        /// Replicas the bucket is configured with.
        configured: u32,
    },

    /// The bucket is not part of the current cluster config.
    #[error("bucket {0:?} not found in the cluster config")]
    BucketNotFound(String),

    /// A facade error that the retry strategy chose not to swallow.
    #[error("facade error: {0}")]
    Facade(#[from] FacadeError),
}
