//! Carrier configuration refresher.
//!
//! Keeps per-bucket topology maps fresh by polling cluster nodes over the
//! binary data protocol. A bucket marked tainted gets its own poll task on a
//! fixed cadence; a one-shot [`refresh`](CarrierRefresher::refresh) walks
//! every registered bucket of a cluster snapshot once. Either way each
//! attempt fails over across the bucket's KV-enabled nodes and hands the
//! first usable config body to the installed [`ConfigProvider`].
//!
//! Every failure here is swallowed: a node that errors or answers with an
//! unusable payload just means the next node (or the next tick) gets its
//! turn. The only way a config reaches the provider is a success status
//! with a non-empty body from one of the enumerated nodes.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use larimar_protocol::{ClusterFacade, GetBucketConfigRequest, GetBucketConfigResponse};
use larimar_types::{BucketConfig, ClusterConfig};
use tokio::sync::watch;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::provider::ConfigProvider;
use crate::selector::NodeSelector;

/// Tuning knobs for the refresher.
#[derive(Debug, Clone)]
pub struct RefresherOptions {
    /// Cadence of the per-bucket poll while a bucket is tainted. The first
    /// tick fires one full interval after `mark_tainted`.
    pub poll_interval: Duration,
}

impl Default for RefresherOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(1000),
        }
    }
}

/// A running poll task for one tainted bucket.
///
/// Dropping the handle (or sending `true`) stops the task after its current
/// tick; the task itself never exits otherwise.
struct PollHandle {
    stop: watch::Sender<bool>,
}

struct RefresherInner<F> {
    facade: Arc<F>,
    options: RefresherOptions,
    provider: Mutex<Option<Arc<dyn ConfigProvider>>>,
    /// Bucket name → password, held for the session layer underneath the
    /// facade.
    registrations: Mutex<HashMap<String, String>>,
    /// Taint registry: one entry per bucket with an active poll task.
    polls: Mutex<HashMap<String, PollHandle>>,
}

/// Keeps per-bucket topology fresh by polling the cluster.
///
/// All methods are callable from any thread; poll tasks run on the ambient
/// Tokio runtime, so `mark_tainted` and `refresh` must be called from
/// within one.
pub struct CarrierRefresher<F> {
    inner: Arc<RefresherInner<F>>,
}

impl<F> Clone for CarrierRefresher<F> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<F: ClusterFacade + 'static> CarrierRefresher<F> {
    /// Creates a refresher with the default options.
    pub fn new(facade: Arc<F>) -> Self {
        Self::with_options(facade, RefresherOptions::default())
    }

    /// Creates a refresher with explicit options.
    pub fn with_options(facade: Arc<F>, options: RefresherOptions) -> Self {
        Self {
            inner: Arc::new(RefresherInner {
                facade,
                options,
                provider: Mutex::new(None),
                registrations: Mutex::new(HashMap::new()),
                polls: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Installs the configuration acceptance sink.
    pub fn provider(&self, provider: Arc<dyn ConfigProvider>) {
        let Ok(mut guard) = self.inner.provider.lock() else {
            return;
        };
        *guard = Some(provider);
    }

    /// Records a bucket for future refresh operations. Idempotent;
    /// re-registering replaces the stored password.
    pub fn register_bucket(&self, name: impl Into<String>, password: impl Into<String>) {
        let Ok(mut registrations) = self.inner.registrations.lock() else {
            return;
        };
        registrations.insert(name.into(), password.into());
    }

    /// Removes a bucket registration and cancels any active poll for it.
    pub fn deregister_bucket(&self, name: &str) {
        if let Ok(mut registrations) = self.inner.registrations.lock() {
            registrations.remove(name);
        }
        self.mark_untainted(name);
    }

    /// Names of the currently registered buckets.
    pub fn registered_buckets(&self) -> Vec<String> {
        self.inner
            .registrations
            .lock()
            .map(|registrations| registrations.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// One-shot refresh: walks every registered bucket in the snapshot and
    /// proposes the first usable config each one's nodes produce.
    pub fn refresh(&self, cluster: &ClusterConfig) {
        for bucket in cluster.buckets() {
            if !self.is_registered(&bucket.name) {
                debug!(bucket = %bucket.name, "skipping refresh for unregistered bucket");
                continue;
            }
            let inner = Arc::clone(&self.inner);
            let config = bucket.clone();
            tokio::spawn(async move { inner.attempt(&config).await });
        }
    }

    /// Starts a periodic poll for this bucket until it is untainted.
    ///
    /// A bucket already being polled ignores further calls: at most one
    /// poll task per bucket exists at any instant.
    pub fn mark_tainted(&self, config: &BucketConfig) {
        let Ok(mut polls) = self.inner.polls.lock() else {
            return;
        };
        if polls.contains_key(&config.name) {
            debug!(bucket = %config.name, "bucket already tainted, poll in flight");
            return;
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        tokio::spawn(Arc::clone(&self.inner).poll_loop(config.clone(), stop_rx));
        polls.insert(config.name.clone(), PollHandle { stop: stop_tx });
        info!(bucket = %config.name, "bucket tainted, polling for config updates");
    }

    /// Stops the periodic poll for this bucket. A tick already underway
    /// completes; no further tick is scheduled.
    pub fn mark_untainted(&self, bucket: &str) {
        let Ok(mut polls) = self.inner.polls.lock() else {
            return;
        };
        if let Some(handle) = polls.remove(bucket) {
            let _ = handle.stop.send(true);
            info!(bucket, "bucket untainted, poll stops after the current tick");
        }
    }

    /// Whether this bucket currently has an active poll task.
    pub fn is_tainted(&self, bucket: &str) -> bool {
        self.inner
            .polls
            .lock()
            .is_ok_and(|polls| polls.contains_key(bucket))
    }

    fn is_registered(&self, bucket: &str) -> bool {
        self.inner
            .registrations
            .lock()
            .is_ok_and(|registrations| registrations.contains_key(bucket))
    }
}

impl<F: ClusterFacade + 'static> RefresherInner<F> {
    async fn poll_loop(
        self: Arc<Self>,
        config: BucketConfig,
        mut stop: watch::Receiver<bool>,
    ) {
        let first = Instant::now() + self.options.poll_interval;
        let mut tick = time::interval_at(first, self.options.poll_interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    self.attempt(&config).await;
                    // An untaint that landed mid-attempt stops the loop here,
                    // after the tick it interrupted completed.
                    if stop_requested(&stop) {
                        break;
                    }
                }
                _ = stop.changed() => break,
            }
        }
        debug!(bucket = %config.name, "poll task stopped");
    }

    /// One refresh attempt: fail over across the bucket's KV-enabled nodes
    /// until one produces a usable config body.
    async fn attempt(&self, config: &BucketConfig) {
        let provider = self
            .provider
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default();
        let Some(provider) = provider else {
            debug!(bucket = %config.name, "no configuration provider installed, skipping attempt");
            return;
        };

        for node in NodeSelector::new(config) {
            let request = GetBucketConfigRequest {
                bucket: config.name.clone(),
                hostname: node.hostname.clone(),
            };
            match self.facade.get_bucket_config(request).await {
                Ok(response) => {
                    if let Some(raw) = usable_body(response) {
                        provider.propose_bucket_config(&config.name, &raw);
                        return;
                    }
                    debug!(
                        bucket = %config.name,
                        hostname = %node.hostname,
                        "unusable bucket config response, trying next node"
                    );
                }
                Err(error) => {
                    debug!(
                        bucket = %config.name,
                        hostname = %node.hostname,
                        error = %error,
                        "bucket config fetch failed, trying next node"
                    );
                }
            }
        }
        debug!(bucket = %config.name, "no node produced a usable bucket config");
    }
}

/// Extracts the config body if the response is usable, releasing the
/// content buffer on every branch.
///
/// Usable means: success status, a payload present, non-empty, valid UTF-8.
fn usable_body(response: GetBucketConfigResponse) -> Option<String> {
    let GetBucketConfigResponse {
        status, content, ..
    } = response;
    let content = content?;
    if !status.is_success() || content.is_empty() {
        content.release();
        return None;
    }
    let raw = std::str::from_utf8(content.as_bytes())
        .ok()
        .map(str::to_owned);
    content.release();
    raw
}

fn stop_requested(stop: &watch::Receiver<bool>) -> bool {
    *stop.borrow() || stop.has_changed().is_err()
}
