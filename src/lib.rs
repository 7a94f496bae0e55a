//! vigil
//!
//! Streams looping video sources over HTTP as annotated multipart JPEG
//! feeds, overlaying results from a slow external detector onto frames
//! emitted at the source's real-time cadence.
//!
//! # Architecture
//!
//! The hard problem is the mismatch between two timing domains: frames must
//! leave at a constant rate, while detector calls take anywhere from tens of
//! milliseconds to seconds and sometimes fail. The decoupling is built from
//! three small pieces per stream:
//!
//! 1. A bounded lossy [`pipeline::FrameQueue`]: the producer never blocks;
//!    a full queue costs inference coverage, not latency.
//! 2. A fixed [`pipeline::InferenceWorkerPool`] doing the blocking calls.
//! 3. A single-slot [`pipeline::ResultCache`] with a monotonic-sequence
//!    acceptance rule resolving out-of-order completions.
//!
//! The [`stream::StreamPump`] ties a source to these pieces and to the
//! overlay stage: detection boxes from the cache, or the inline pose path
//! feeding the [`gesture::GestureEventDetector`] state machine (the "clench
//! twice" SOS trigger). The HTTP layer in [`api`] serves one feed per
//! configured stream plus the status and alert-log endpoints.

pub mod annotate;
pub mod api;
pub mod config;
pub mod detect;
pub mod frame;
pub mod gesture;
pub mod ingest;
pub mod pipeline;
pub mod pose;
pub mod stream;

pub use annotate::Annotator;
pub use api::{AlertLog, ApiServer, StatusBoard};
pub use config::{StreamKind, VigildConfig};
pub use detect::{CoordMap, Detection, DetectionBatch, Detector};
pub use frame::{Frame, FrameTicket};
pub use gesture::{GestureConfig, GestureEventDetector, GestureOverlay};
pub use ingest::{FileConfig, FileSource};
pub use pipeline::{CancelToken, FrameQueue, InferenceWorkerPool, ResultCache, WorkerPoolConfig};
pub use pose::{HandPose, PoseEstimator, StubPoseEstimator};
pub use stream::{FrameSink, PumpSettings, PumpStage, StreamPump};
