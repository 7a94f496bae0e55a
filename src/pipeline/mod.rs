//! The asynchronous frame-annotation pipeline.
//!
//! Two timing domains meet here: the stream pump produces frames at the
//! source's real-time cadence, while detector calls complete whenever they
//! complete. The hand-off is a bounded lossy queue; the merge point is a
//! single-slot cache with a monotonic-sequence acceptance rule. These two
//! objects are the only state shared across a stream's threads.

mod cache;
mod queue;
mod worker;

pub use cache::ResultCache;
pub use queue::FrameQueue;
pub use worker::{InferenceWorkerPool, WorkerPoolConfig};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative cancellation token.
///
/// Passed explicitly into every worker loop and stream pump; checked at each
/// loop iteration. Cancelling never aborts an in-flight detector call, the
/// call's result is simply discarded.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}
