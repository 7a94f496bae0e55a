use anyhow::Result;

use crate::detect::result::Detection;
use crate::frame::Frame;

/// External detection capability.
///
/// Implementations must be safely callable from multiple workers at once.
/// Latency and failure rate are unbounded and must be treated as untrusted:
/// callers never assume a call is fast or reliable, and recover from every
/// per-call failure locally.
pub trait Detector: Send + Sync {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Run detection on a frame with the given model.
    fn infer(&self, frame: &Frame, model_id: &str) -> Result<Vec<Detection>>;
}
