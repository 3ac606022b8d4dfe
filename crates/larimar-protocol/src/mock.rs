//! Scriptable in-memory facade for tests.
//!
//! Outcomes are queued ahead of time: bucket-config outcomes form one FIFO
//! (failover walks nodes in a deterministic order), observe outcomes are
//! keyed by `(master, replica_index)` so a fan-out round stays deterministic
//! regardless of task scheduling. Every buffer the mock creates registers a
//! [`RefWatch`] so tests can verify the release discipline afterwards.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use bytes::Bytes;
use larimar_types::ClusterConfig;

use crate::buffer::{ContentBuffer, RefWatch};
use crate::facade::{ClusterFacade, FacadeError, ResponseFuture};
use crate::message::{
    GetBucketConfigRequest, GetBucketConfigResponse, GetClusterConfigResponse, ObserveRequest,
    ObserveResponse,
};
use crate::status::{ObserveStatus, ResponseStatus, kv_status};

/// One scripted bucket-config outcome.
#[derive(Debug, Clone)]
struct ScriptedConfig {
    status: ResponseStatus,
    kv_status: u16,
    body: Option<Vec<u8>>,
}

#[derive(Default)]
struct MockState {
    bucket_config: VecDeque<Result<ScriptedConfig, FacadeError>>,
    observe: HashMap<(bool, u16), VecDeque<Result<(ObserveStatus, u64), FacadeError>>>,
    cluster: Option<ClusterConfig>,
    bucket_config_requests: Vec<GetBucketConfigRequest>,
    observe_requests: Vec<ObserveRequest>,
    watches: Vec<RefWatch>,
}

/// In-memory [`ClusterFacade`] serving pre-scripted outcomes.
#[derive(Default)]
pub struct MockFacade {
    state: Mutex<MockState>,
}

impl MockFacade {
    /// Creates a facade with nothing scripted.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a successful bucket-config response carrying `body`.
    pub fn script_config_body(&self, body: &str) {
        self.script_config(ResponseStatus::Success, kv_status::SUCCESS, Some(body.into()));
    }

    /// Queues a bucket-config response with explicit status and payload.
    pub fn script_config(&self, status: ResponseStatus, kv_status: u16, body: Option<Vec<u8>>) {
        self.state().bucket_config.push_back(Ok(ScriptedConfig {
            status,
            kv_status,
            body,
        }));
    }

    /// Queues a bucket-config transport failure.
    pub fn script_config_error(&self, error: FacadeError) {
        self.state().bucket_config.push_back(Err(error));
    }

    /// Queues an observe response for the master or one replica.
    pub fn script_observe(&self, master: bool, replica_index: u16, status: ObserveStatus, cas: u64) {
        self.state()
            .observe
            .entry((master, replica_index))
            .or_default()
            .push_back(Ok((status, cas)));
    }

    /// Queues an observe transport failure for the master or one replica.
    pub fn script_observe_error(&self, master: bool, replica_index: u16, error: FacadeError) {
        self.state()
            .observe
            .entry((master, replica_index))
            .or_default()
            .push_back(Err(error));
    }

    /// Sets the cluster snapshot served to `get_cluster_config`.
    pub fn set_cluster_config(&self, config: ClusterConfig) {
        self.state().cluster = Some(config);
    }

    /// All bucket-config requests dispatched so far, in order.
    pub fn bucket_config_requests(&self) -> Vec<GetBucketConfigRequest> {
        self.state().bucket_config_requests.clone()
    }

    /// All observe requests dispatched so far, in order.
    pub fn observe_requests(&self) -> Vec<ObserveRequest> {
        self.state().observe_requests.clone()
    }

    /// Watches for every buffer this facade has created.
    pub fn buffer_watches(&self) -> Vec<RefWatch> {
        self.state().watches.clone()
    }

    /// Highest reference count across all buffers created so far.
    ///
    /// Zero means every buffer has been released.
    pub fn max_live_references(&self) -> usize {
        self.state()
            .watches
            .iter()
            .map(RefWatch::count)
            .max()
            .unwrap_or(0)
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().expect("mock facade state poisoned")
    }

    fn make_buffer(state: &mut MockState, body: Vec<u8>) -> ContentBuffer {
        let buffer = ContentBuffer::new(Bytes::from(body));
        state.watches.push(buffer.watch());
        buffer
    }
}

impl ClusterFacade for MockFacade {
    fn get_bucket_config(
        &self,
        request: GetBucketConfigRequest,
    ) -> ResponseFuture<'_, GetBucketConfigResponse> {
        let result = {
            let mut state = self.state();
            state.bucket_config_requests.push(request.clone());

            let outcome = state
                .bucket_config
                .pop_front()
                .unwrap_or_else(|| Err(FacadeError::Transport("no scripted response".into())));

            outcome.map(|scripted| {
                let content = scripted
                    .body
                    .map(|body| Self::make_buffer(&mut state, body));
                GetBucketConfigResponse {
                    status: scripted.status,
                    kv_status: scripted.kv_status,
                    bucket: request.bucket,
                    content,
                    origin: request.hostname,
                }
            })
        };
        Box::pin(async move { result })
    }

    fn observe(&self, request: ObserveRequest) -> ResponseFuture<'_, ObserveResponse> {
        let result = {
            let mut state = self.state();
            state.observe_requests.push(request.clone());

            let outcome = state
                .observe
                .get_mut(&(request.master, request.replica_index))
                .and_then(VecDeque::pop_front)
                .unwrap_or_else(|| Err(FacadeError::Transport("no scripted response".into())));

            outcome.map(|(status, cas)| {
                // Observe payloads carry a small body the cores never decode;
                // attaching one exercises the release discipline.
                let content = Some(Self::make_buffer(&mut state, vec![0u8; 4]));
                ObserveResponse {
                    status,
                    cas,
                    master: request.master,
                    content,
                }
            })
        };
        Box::pin(async move { result })
    }

    fn get_cluster_config(&self) -> ResponseFuture<'_, GetClusterConfigResponse> {
        let result = self
            .state()
            .cluster
            .clone()
            .map(|config| GetClusterConfigResponse { config })
            .ok_or_else(|| FacadeError::Transport("no cluster config scripted".into()));
        Box::pin(async move { result })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_config_outcomes_pop_in_order() {
        let facade = MockFacade::new();
        facade.script_config_body("{}");
        facade.script_config_error(FacadeError::Cancelled);

        let request = GetBucketConfigRequest {
            bucket: "bucket".into(),
            hostname: "localhost".into(),
        };

        let first = futures_poll(facade.get_bucket_config(request.clone())).unwrap();
        assert!(first.status.is_success());
        assert_eq!(first.origin, "localhost");
        first.content.unwrap().release();

        let second = futures_poll(facade.get_bucket_config(request));
        assert_eq!(second.unwrap_err(), FacadeError::Cancelled);

        // Exhausted script falls back to a transport error
        let third = futures_poll(facade.get_bucket_config(GetBucketConfigRequest {
            bucket: "bucket".into(),
            hostname: "localhost".into(),
        }));
        assert!(matches!(third, Err(FacadeError::Transport(_))));

        assert_eq!(facade.bucket_config_requests().len(), 3);
        assert_eq!(facade.max_live_references(), 0);
    }

    #[test]
    fn observe_outcomes_are_keyed_per_target() {
        let facade = MockFacade::new();
        facade.script_observe(true, 0, ObserveStatus::FoundPersisted, 7);
        facade.script_observe(false, 1, ObserveStatus::FoundNotPersisted, 7);

        let replica = futures_poll(facade.observe(ObserveRequest {
            bucket: "bucket".into(),
            id: "doc".into(),
            cas: 7,
            master: false,
            replica_index: 1,
        }))
        .unwrap();
        assert_eq!(replica.status, ObserveStatus::FoundNotPersisted);
        assert!(!replica.master);
        replica.content.unwrap().release();

        let master = futures_poll(facade.observe(ObserveRequest {
            bucket: "bucket".into(),
            id: "doc".into(),
            cas: 7,
            master: true,
            replica_index: 0,
        }))
        .unwrap();
        assert_eq!(master.status, ObserveStatus::FoundPersisted);
        assert!(master.master);
        drop(master);

        assert_eq!(facade.max_live_references(), 0);
    }

    /// Drives a mock future to completion; mock futures are always ready.
    fn futures_poll<T>(future: ResponseFuture<'_, T>) -> Result<T, FacadeError> {
        use std::future::Future;
        use std::task::{Context, Poll, Waker};

        let mut future = future;
        match future
            .as_mut()
            .poll(&mut Context::from_waker(Waker::noop()))
        {
            Poll::Ready(result) => result,
            Poll::Pending => panic!("mock future was not immediately ready"),
        }
    }
}
