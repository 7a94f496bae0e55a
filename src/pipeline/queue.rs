use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::frame::FrameTicket;

/// Bounded, lossy producer-to-worker hand-off.
///
/// The producer never blocks: when the queue is full the newest ticket is
/// rejected and only inference coverage for that frame is lost, the frame is
/// still streamed. Workers drain with a non-blocking pop and sleep a short
/// idle interval when there is nothing to do.
#[derive(Clone)]
pub struct FrameQueue {
    tx: Sender<FrameTicket>,
    rx: Receiver<FrameTicket>,
    capacity: usize,
    dropped: Arc<AtomicU64>,
}

impl FrameQueue {
    pub fn bounded(capacity: usize) -> Self {
        let (tx, rx) = bounded(capacity);
        Self {
            tx,
            rx,
            capacity,
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Offer a ticket; returns false immediately when full.
    pub fn try_enqueue(&self, ticket: FrameTicket) -> bool {
        match self.tx.try_send(ticket) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Non-blocking pop.
    pub fn try_dequeue(&self) -> Option<FrameTicket> {
        self.rx.try_recv().ok()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// Tickets rejected because the queue was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}
