use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crate::detect::{letterbox, DetectionBatch, Detector};
use crate::pipeline::{CancelToken, FrameQueue, ResultCache};

/// Worker pool tuning. All of these are configuration, not constants.
#[derive(Clone, Debug)]
pub struct WorkerPoolConfig {
    pub workers: usize,
    /// Square input size frames are letterboxed to before inference.
    pub input_size: u32,
    pub model_id: String,
    /// Sleep when the queue is empty.
    pub idle_wait: Duration,
    /// Base backoff after a failed inference call; multiplied by the
    /// consecutive-failure count, capped at `max_backoff_steps`.
    pub failure_backoff: Duration,
    pub max_backoff_steps: u32,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            input_size: 416,
            model_id: String::new(),
            idle_wait: Duration::from_millis(1),
            failure_backoff: Duration::from_millis(50),
            max_backoff_steps: 8,
        }
    }
}

/// Fixed-size pool draining the frame queue into the result cache.
///
/// A failed inference call never stops the pool or the stream: the ticket's
/// result simply never arrives and a fresher frame is tried next. Backoff
/// after consecutive failures is per-worker and never blocks other workers.
pub struct InferenceWorkerPool {
    cancel: CancelToken,
    handles: Vec<JoinHandle<()>>,
}

impl InferenceWorkerPool {
    pub fn spawn(
        config: WorkerPoolConfig,
        queue: FrameQueue,
        cache: Arc<ResultCache>,
        detector: Arc<dyn Detector>,
        cancel: CancelToken,
    ) -> Self {
        let mut handles = Vec::with_capacity(config.workers);
        for index in 0..config.workers {
            let config = config.clone();
            let queue = queue.clone();
            let cache = cache.clone();
            let detector = detector.clone();
            let cancel = cancel.clone();
            handles.push(std::thread::spawn(move || {
                worker_loop(index, config, queue, cache, detector, cancel);
            }));
        }
        Self { cancel, handles }
    }

    /// Signal all workers to exit and wait for them.
    pub fn stop(mut self) {
        self.cancel.cancel();
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

impl Drop for InferenceWorkerPool {
    fn drop(&mut self) {
        self.cancel.cancel();
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

fn worker_loop(
    index: usize,
    config: WorkerPoolConfig,
    queue: FrameQueue,
    cache: Arc<ResultCache>,
    detector: Arc<dyn Detector>,
    cancel: CancelToken,
) {
    let mut consecutive_failures = 0u32;
    while !cancel.is_cancelled() {
        let Some(ticket) = queue.try_dequeue() else {
            std::thread::sleep(config.idle_wait);
            continue;
        };

        let (scaled, coord_map) = letterbox(&ticket.frame, config.input_size);
        match detector.infer(&scaled, &config.model_id) {
            Ok(detections) => {
                consecutive_failures = 0;
                cache.publish(DetectionBatch {
                    seq: ticket.seq,
                    detections,
                    coord_map,
                });
            }
            Err(err) => {
                consecutive_failures = consecutive_failures.saturating_add(1);
                log::warn!(
                    "worker {}: inference failed for frame {}: {:#}",
                    index,
                    ticket.seq,
                    err
                );
                let steps = consecutive_failures.min(config.max_backoff_steps);
                std::thread::sleep(config.failure_backoff * steps);
            }
        }
    }
}
