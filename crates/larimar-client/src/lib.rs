//! # larimar-client: Cluster client cores for Larimar
//!
//! The two poll loops at the heart of the cluster client:
//!
//! - [`CarrierRefresher`] keeps per-bucket topology fresh by polling cluster
//!   nodes over the binary data protocol, with cross-node failover and a
//!   per-bucket single-flight guarantee.
//! - [`DurabilityObserver`] confirms that a mutation (or deletion) reached
//!   the requested number of replicas and/or on-disk persistence before a
//!   caller's write is acknowledged.
//!
//! Both talk to the cluster through the [`ClusterFacade`] seam from
//! `larimar-protocol` and never touch the transport directly.
//!
//! ```text
//! ┌─────────────────────┐      ┌──────────────────────┐
//! │  CarrierRefresher   │      │  DurabilityObserver  │
//! │  (per-bucket polls) │      │  (fan-out + repeat)  │
//! └──────────┬──────────┘      └──────────┬───────────┘
//!            │                            │
//!            └──────────┬─────────────────┘
//!                       │
//!             ┌─────────┴─────────┐
//!             │   ClusterFacade   │
//!             │ (transport below) │
//!             └───────────────────┘
//! ```
//!
//! [`ClusterFacade`]: larimar_protocol::ClusterFacade

mod error;
mod observer;
mod provider;
mod refresher;
mod retry;
mod selector;

pub use error::ObserveError;
pub use observer::{DurabilityObserver, ObserveItem};
pub use provider::ConfigProvider;
pub use refresher::{CarrierRefresher, RefresherOptions};
pub use retry::{
    BestEffortRetry, Delay, ExponentialDelay, FailFastRetry, FixedDelay, RetryStrategy,
};
pub use selector::NodeSelector;
