use std::sync::{Arc, Mutex};

use crate::detect::DetectionBatch;

/// Single-slot, most-recent-wins store for the latest detection result.
///
/// Workers complete out of order; a published batch replaces the resident one
/// only when its sequence number is strictly greater. The comparison and swap
/// happen under one lock so two workers cannot race a stale batch over a
/// newer one.
#[derive(Default)]
pub struct ResultCache {
    slot: Mutex<Option<Arc<DetectionBatch>>>,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a batch. Returns true when the batch became resident,
    /// false when it was discarded as stale.
    pub fn publish(&self, batch: DetectionBatch) -> bool {
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        match slot.as_ref() {
            Some(resident) if batch.seq <= resident.seq => false,
            _ => {
                *slot = Some(Arc::new(batch));
                true
            }
        }
    }

    /// Non-blocking snapshot of the resident batch.
    pub fn read(&self) -> Option<Arc<DetectionBatch>> {
        self.slot
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}
