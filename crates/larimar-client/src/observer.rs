//! Durability observer.
//!
//! Confirms that a mutation (or deletion) reached the requested number of
//! replicas and/or on-disk persistence. Each round fans one observe request
//! out to the master and, when the criterion touches replicas, one per
//! replica; responses fold into an [`ObserveItem`] as they arrive and the
//! operation resolves the moment the running aggregate satisfies the
//! criterion. An unsatisfied round backs off per the [`Delay`] schedule and
//! repeats; the loop only ends when the criterion is met, a fatal error
//! surfaces, or the caller drops the future.

use std::sync::Arc;

use larimar_protocol::{ClusterFacade, FacadeError, ObserveRequest, ObserveResponse, ObserveStatus};
use larimar_types::{PersistTo, ReplicateTo};
use tokio::task::JoinSet;
use tokio::time::sleep;
use tracing::debug;

use crate::error::ObserveError;
use crate::retry::{Delay, RetryStrategy};

/// Aggregate of per-node observe outcomes.
///
/// A commutative monoid: [`EMPTY`](Self::EMPTY) is the identity and
/// [`add`](Self::add) combines componentwise (sum, sum, OR), so the fold
/// over a round's responses is order-independent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ObserveItem {
    /// Replicas holding the mutation in memory.
    pub replicated: u32,
    /// Nodes that persisted the mutation to disk.
    pub persisted: u32,
    /// Whether the master is among the persisted nodes.
    pub persisted_master: bool,
}

impl ObserveItem {
    /// The monoid identity: nothing observed yet.
    pub const EMPTY: Self = Self {
        replicated: 0,
        persisted: 0,
        persisted_master: false,
    };

    /// Creates an aggregate from its components.
    pub fn new(replicated: u32, persisted: u32, persisted_master: bool) -> Self {
        Self {
            replicated,
            persisted,
            persisted_master,
        }
    }

    /// Combines two aggregates. Associative and commutative.
    #[must_use]
    pub fn add(self, other: Self) -> Self {
        Self {
            replicated: self.replicated + other.replicated,
            persisted: self.persisted + other.persisted,
            persisted_master: self.persisted_master || other.persisted_master,
        }
    }

    /// Whether this aggregate meets the durability criterion.
    ///
    /// `PersistTo::Master` is satisfied only by a master persist; every
    /// other persist level counts nodes. Note `check(EMPTY, None, None)` is
    /// true: an empty criterion is met by observing nothing.
    pub fn satisfies(self, persist_to: PersistTo, replicate_to: ReplicateTo) -> bool {
        let persist_done = if persist_to == PersistTo::Master {
            self.persisted_master
        } else {
            self.persisted >= persist_to.value()
        };
        let replicate_done = self.replicated >= replicate_to.value();
        persist_done && replicate_done
    }
}

/// Sentinel statuses for the given operation kind: `(persisted, replicated)`.
///
/// A deletion is confirmed by *not-found* states, a mutation by *found*
/// states.
fn sentinels(remove: bool) -> (ObserveStatus, ObserveStatus) {
    if remove {
        (
            ObserveStatus::NotFoundPersisted,
            ObserveStatus::NotFoundNotPersisted,
        )
    } else {
        (
            ObserveStatus::FoundPersisted,
            ObserveStatus::FoundNotPersisted,
        )
    }
}

/// Maps one observe response to its aggregate contribution.
///
/// Releases the response's content buffer on receipt; the payload is not
/// consumed further. A CAS mismatch on the master is fatal, except for the
/// deletion case where the master reports CAS 0 with the deletion already
/// persisted.
fn classify(
    response: ObserveResponse,
    expected_cas: u64,
    remove: bool,
) -> Result<ObserveItem, ObserveError> {
    let ObserveResponse {
        status,
        cas,
        master,
        content,
    } = response;
    if let Some(content) = content {
        content.release();
    }

    let (persist_sentinel, replica_sentinel) = sentinels(remove);
    let valid_cas = expected_cas == cas || (remove && cas == 0 && status == persist_sentinel);

    if master {
        if !valid_cas {
            return Err(ObserveError::DocumentConcurrentlyModified);
        }
        if status == persist_sentinel {
            Ok(ObserveItem::new(0, 1, true))
        } else {
            Ok(ObserveItem::EMPTY)
        }
    } else if !valid_cas {
        Ok(ObserveItem::EMPTY)
    } else if status == persist_sentinel {
        // A persisted replica necessarily holds the mutation in memory, so
        // it advances both counters.
        Ok(ObserveItem::new(1, 1, false))
    } else if status == replica_sentinel {
        Ok(ObserveItem::new(1, 0, false))
    } else {
        Ok(ObserveItem::EMPTY)
    }
}

/// Verifies durability of a mutation by polling the master and replicas.
pub struct DurabilityObserver<F> {
    facade: Arc<F>,
}

impl<F: ClusterFacade + 'static> DurabilityObserver<F> {
    /// Creates an observer on top of the given facade.
    pub fn new(facade: Arc<F>) -> Self {
        Self { facade }
    }

    /// Resolves to `true` once the mutation identified by `id`/`cas` meets
    /// the durability criterion.
    ///
    /// Loops until the criterion is met; bound it with a timeout or drop
    /// the future to cancel. Fails fast with
    /// [`ObserveError::ReplicaNotConfigured`] when the criterion exceeds the
    /// bucket's replica count and with
    /// [`ObserveError::DocumentConcurrentlyModified`] when the master
    /// reports a different CAS.
    pub async fn observe(
        &self,
        bucket: &str,
        id: &str,
        cas: u64,
        remove: bool,
        persist_to: PersistTo,
        replicate_to: ReplicateTo,
        delay: &dyn Delay,
        retry: &dyn RetryStrategy,
    ) -> Result<bool, ObserveError> {
        let config = self.facade.get_cluster_config().await?.config;
        let bucket_config = config
            .bucket(bucket)
            .ok_or_else(|| ObserveError::BucketNotFound(bucket.to_string()))?;
        let num_replicas = bucket_config.num_replicas;

        if replicate_to.touches_replica() && replicate_to.value() > num_replicas {
            return Err(ObserveError::ReplicaNotConfigured {
                requested: replicate_to.value(),
                configured: num_replicas,
            });
        }
        if persist_to.touches_replica() && persist_to.value() - 1 > num_replicas {
            return Err(ObserveError::ReplicaNotConfigured {
                requested: persist_to.value() - 1,
                configured: num_replicas,
            });
        }

        // An empty criterion is met by the empty aggregate; nothing to poll.
        if ObserveItem::EMPTY.satisfies(persist_to, replicate_to) {
            return Ok(true);
        }

        let touches_replica = persist_to.touches_replica() || replicate_to.touches_replica();
        let mut attempt: u32 = 1;

        loop {
            let mut round: JoinSet<Result<ObserveResponse, FacadeError>> = JoinSet::new();
            self.dispatch(&mut round, bucket, id, cas, true, 0);
            if touches_replica {
                for replica in 1..=num_replicas {
                    self.dispatch(&mut round, bucket, id, cas, false, replica as u16);
                }
            }

            let mut aggregate = ObserveItem::EMPTY;
            while let Some(joined) = round.join_next().await {
                let Ok(result) = joined else {
                    // Task was cancelled underneath us; it contributes
                    // nothing this round.
                    continue;
                };
                match result {
                    Ok(response) => {
                        aggregate = aggregate.add(classify(response, cas, remove)?);
                        if aggregate.satisfies(persist_to, replicate_to) {
                            return Ok(true);
                        }
                    }
                    Err(error) if retry.should_retry_observe() => {
                        debug!(
                            bucket,
                            id,
                            error = %error,
                            "observe request failed, retrying on the next round"
                        );
                    }
                    Err(error) => return Err(error.into()),
                }
            }

            debug!(
                bucket,
                id,
                attempt,
                replicated = aggregate.replicated,
                persisted = aggregate.persisted,
                "durability criterion not met, backing off"
            );
            sleep(delay.calculate(attempt)).await;
            attempt += 1;
        }
    }

    fn dispatch(
        &self,
        round: &mut JoinSet<Result<ObserveResponse, FacadeError>>,
        bucket: &str,
        id: &str,
        cas: u64,
        master: bool,
        replica_index: u16,
    ) {
        let facade = Arc::clone(&self.facade);
        let request = ObserveRequest {
            bucket: bucket.to_string(),
            id: id.to_string(),
            cas,
            master,
            replica_index,
        };
        round.spawn(async move { facade.observe(request).await });
    }
}
