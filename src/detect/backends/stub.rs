use anyhow::{anyhow, Result};
use std::sync::Mutex;

use crate::detect::backend::Detector;
use crate::detect::result::Detection;
use crate::frame::Frame;

/// Backend that returns the same detections for every frame.
///
/// With an empty list this is the default offline backend: the stream runs at
/// full rate with no overlays. Tests use it to script deterministic batches.
pub struct StaticDetector {
    detections: Vec<Detection>,
}

impl StaticDetector {
    pub fn new(detections: Vec<Detection>) -> Self {
        Self { detections }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }
}

impl Detector for StaticDetector {
    fn name(&self) -> &'static str {
        "static"
    }

    fn infer(&self, _frame: &Frame, _model_id: &str) -> Result<Vec<Detection>> {
        Ok(self.detections.clone())
    }
}

/// Backend that fails every call, for degradation tests.
pub struct FailingDetector {
    calls: Mutex<u64>,
}

impl FailingDetector {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(0),
        }
    }

    pub fn calls(&self) -> u64 {
        *self.calls.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for FailingDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl Detector for FailingDetector {
    fn name(&self) -> &'static str {
        "failing"
    }

    fn infer(&self, _frame: &Frame, _model_id: &str) -> Result<Vec<Detection>> {
        let mut calls = self.calls.lock().unwrap_or_else(|e| e.into_inner());
        *calls += 1;
        Err(anyhow!("detector unavailable"))
    }
}
