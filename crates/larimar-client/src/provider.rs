//! Configuration acceptance sink.

/// Sink for bucket configs the refresher fetched from the cluster.
///
/// The provider is the sole acceptor of proposed configs: it parses the raw
/// body, decides whether the proposal supersedes the current snapshot, and
/// swaps it in atomically. Implementations must be thread-safe; proposals
/// arrive from the refresher's poll tasks.
pub trait ConfigProvider: Send + Sync {
    /// Proposes a freshly fetched config for `bucket`.
    ///
    /// `raw` is the UTF-8 config body exactly as the node returned it. The
    /// refresher guarantees it is non-empty and came from a success
    /// response.
    fn propose_bucket_config(&self, bucket: &str, raw: &str);
}
