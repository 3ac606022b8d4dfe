//! The cluster facade seam.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use thiserror::Error;

use crate::message::{
    GetBucketConfigRequest, GetBucketConfigResponse, GetClusterConfigResponse, ObserveRequest,
    ObserveResponse,
};

/// Boxed response future returned by every facade operation.
pub type ResponseFuture<'a, T> =
    Pin<Box<dyn Future<Output = Result<T, FacadeError>> + Send + 'a>>;

/// Errors the facade can emit instead of a response.
///
/// A facade error means no response was delivered; in particular no content
/// buffer exists on this path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FacadeError {
    /// The transport failed before a response arrived.
    #[error("transport error: {0}")]
    Transport(String),

    /// No response within the transport's deadline.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The request was dropped before dispatch (shutdown, backpressure).
    #[error("request cancelled before a response arrived")]
    Cancelled,
}

/// The transport the client cores talk to.
///
/// One typed operation per request kind; each request yields exactly one
/// response or a [`FacadeError`]. Implementations own session management,
/// wire encoding, and dispatch; none of that is visible above this seam.
pub trait ClusterFacade: Send + Sync {
    /// Fetches one bucket's config from one node.
    fn get_bucket_config(
        &self,
        request: GetBucketConfigRequest,
    ) -> ResponseFuture<'_, GetBucketConfigResponse>;

    /// Observes one document on the master or one replica.
    fn observe(&self, request: ObserveRequest) -> ResponseFuture<'_, ObserveResponse>;

    /// Fetches the facade's current view of the whole cluster.
    fn get_cluster_config(&self) -> ResponseFuture<'_, GetClusterConfigResponse>;
}
