//! # larimar-protocol: Data-protocol message surface for Larimar
//!
//! This crate defines the seam between the client cores and the cluster
//! transport:
//!
//! - [`ClusterFacade`]: the trait the transport implements; one typed
//!   async operation per request kind
//! - Request/response types for the three operations the cores use
//! - [`ContentBuffer`]: the reference-counted payload buffer every
//!   response body travels in, released exactly once on every path
//!
//! Wire encoding and session management live below this seam and are not
//! part of this crate.

mod buffer;
mod facade;
mod message;
mod status;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use buffer::{ContentBuffer, RefWatch};
pub use facade::{ClusterFacade, FacadeError, ResponseFuture};
pub use message::{
    GetBucketConfigRequest, GetBucketConfigResponse, GetClusterConfigResponse, ObserveRequest,
    ObserveResponse,
};
pub use status::{ObserveStatus, ResponseStatus, kv_status};
