//! Reference-counted payload buffers.
//!
//! Every response body travels in a [`ContentBuffer`] holding one reference.
//! The consumer releases it exactly once after inspection; if the response is
//! rejected or the operation is cancelled mid-flight, the drop path releases
//! it instead. [`RefWatch`] is a non-counting observer handle so tests can
//! assert the count reached zero after an operation finished.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use bytes::Bytes;

/// A payload buffer carrying one reference to its underlying count.
///
/// Construction starts the count at 1; each response body has exactly one
/// handle. [`release`](Self::release) decrements; a handle that is dropped
/// without an explicit release decrements on drop, so the count ends at
/// zero on every path.
pub struct ContentBuffer {
    bytes: Bytes,
    refs: Arc<AtomicUsize>,
    released: bool,
}

impl ContentBuffer {
    /// Wraps payload bytes in a fresh buffer with reference count 1.
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: bytes.into(),
            refs: Arc::new(AtomicUsize::new(1)),
            released: false,
        }
    }

    /// Releases this handle's reference.
    pub fn release(mut self) {
        self.release_once();
    }

    /// A non-counting handle onto this buffer's reference count.
    pub fn watch(&self) -> RefWatch {
        RefWatch {
            refs: Arc::clone(&self.refs),
        }
    }

    /// Current reference count.
    pub fn ref_count(&self) -> usize {
        self.refs.load(Ordering::SeqCst)
    }

    /// Payload bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    fn release_once(&mut self) {
        if !self.released {
            self.released = true;
            self.refs.fetch_sub(1, Ordering::AcqRel);
        }
    }
}

impl Drop for ContentBuffer {
    fn drop(&mut self) {
        self.release_once();
    }
}

impl fmt::Debug for ContentBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentBuffer")
            .field("len", &self.bytes.len())
            .field("refs", &self.ref_count())
            .finish()
    }
}

/// Observer onto a buffer's reference count.
///
/// Holding a watch does not keep a reference alive; it only reads the count.
#[derive(Clone)]
pub struct RefWatch {
    refs: Arc<AtomicUsize>,
}

impl RefWatch {
    /// Current reference count of the watched buffer.
    pub fn count(&self) -> usize {
        self.refs.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for RefWatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefWatch").field("refs", &self.count()).finish()
    }
}
