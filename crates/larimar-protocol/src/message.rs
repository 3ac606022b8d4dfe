//! Request and response types for the three facade operations.

use larimar_types::ClusterConfig;

use crate::buffer::ContentBuffer;
use crate::status::{ObserveStatus, ResponseStatus};

/// Asks one node for the current config of one bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetBucketConfigRequest {
    /// Bucket whose config is requested.
    pub bucket: String,
    /// Node the request is addressed to.
    pub hostname: String,
}

/// A node's answer to [`GetBucketConfigRequest`].
///
/// On success the raw config bytes (UTF-8) travel in `content`. Responses
/// are not `Clone`: the content buffer is a counted resource.
#[derive(Debug)]
pub struct GetBucketConfigResponse {
    /// Overall outcome.
    pub status: ResponseStatus,
    /// Raw key-value status code from the wire.
    pub kv_status: u16,
    /// Bucket the response is for.
    pub bucket: String,
    /// Raw config payload, if the node sent one.
    pub content: Option<ContentBuffer>,
    /// Hostname the response came from.
    pub origin: String,
}

/// Asks the master or one replica for the state of one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObserveRequest {
    /// Bucket holding the document.
    pub bucket: String,
    /// Document id.
    pub id: String,
    /// CAS the caller expects the document to carry.
    pub cas: u64,
    /// Whether this request is addressed to the master copy.
    pub master: bool,
    /// Replica index, 0 for the master request.
    pub replica_index: u16,
}

/// A node's answer to [`ObserveRequest`].
#[derive(Debug)]
pub struct ObserveResponse {
    /// Observed document state.
    pub status: ObserveStatus,
    /// CAS the node holds for the document.
    pub cas: u64,
    /// Whether this view comes from the master copy.
    pub master: bool,
    /// Response payload. Not consumed further by the cores; released on
    /// receipt.
    pub content: Option<ContentBuffer>,
}

/// The facade's view of the whole cluster topology.
#[derive(Debug, Clone)]
pub struct GetClusterConfigResponse {
    /// Current cluster snapshot.
    pub config: ClusterConfig,
}
