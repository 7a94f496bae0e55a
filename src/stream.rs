//! Per-stream control loop.
//!
//! The pump owns the stream's timing domain: it reads frames at the source's
//! native cadence, hands best-effort copies to the inference side, merges the
//! freshest completed result back in, annotates, encodes and emits. It never
//! blocks on inference; the only blocking points are source reads and the
//! self-correcting rate-limit sleep.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::annotate::Annotator;
use crate::api::StatusBoard;
use crate::frame::{encode_jpeg, FrameTicket};
use crate::gesture::GestureEventDetector;
use crate::ingest::{FileConfig, FileSource};
use crate::pipeline::{CancelToken, FrameQueue, ResultCache};
use crate::pose::PoseEstimator;

/// Substituted when the container reports a non-positive rate.
const FALLBACK_FPS: f64 = 25.0;

/// Where encoded frames go. The HTTP layer writes multipart parts; tests
/// collect bytes. An emit error (client gone) ends the pump.
pub trait FrameSink {
    fn emit(&mut self, jpeg: &[u8]) -> Result<()>;
}

#[derive(Clone, Debug)]
pub struct PumpSettings {
    pub stream_id: String,
    pub confidence_threshold: f32,
    pub jpeg_quality: u8,
}

/// The annotation stage of a stream: box overlays fed by the async pipeline,
/// or the inline pose/gesture path.
pub enum PumpStage {
    Detection {
        queue: FrameQueue,
        cache: Arc<ResultCache>,
    },
    Gesture {
        estimator: Box<dyn PoseEstimator>,
        detector: GestureEventDetector,
    },
}

pub struct StreamPump {
    settings: PumpSettings,
    source: FileSource,
    stage: PumpStage,
    status: Arc<StatusBoard>,
    cancel: CancelToken,
    annotator: Annotator,
    seq: u64,
}

impl StreamPump {
    /// Open the video source. Failure is fatal to this stream only: the
    /// caller logs it and the stream produces no output.
    pub fn open(
        settings: PumpSettings,
        source_config: FileConfig,
        stage: PumpStage,
        status: Arc<StatusBoard>,
        cancel: CancelToken,
    ) -> Result<Self> {
        let source = FileSource::open(source_config)
            .with_context(|| format!("open source for stream '{}'", settings.stream_id))?;
        Ok(Self {
            settings,
            source,
            stage,
            status,
            cancel,
            annotator: Annotator::default(),
            seq: 0,
        })
    }

    /// Run until cancelled or the sink goes away.
    pub fn run(&mut self, sink: &mut dyn FrameSink) -> Result<()> {
        let interval = frame_interval(self.source.frame_rate());
        log::info!(
            "stream '{}': streaming at {:.1} fps",
            self.settings.stream_id,
            1.0 / interval.as_secs_f64()
        );

        loop {
            if self.cancel.is_cancelled() {
                return Ok(());
            }
            let started = Instant::now();

            let Some(frame) = self.source.read()? else {
                // Clip exhausted: rewind and reset per-stream state so a
                // gesture cannot span the loop boundary.
                self.source.rewind()?;
                if let PumpStage::Gesture { detector, .. } = &mut self.stage {
                    detector.reset();
                    self.status.set(&self.settings.stream_id, false);
                }
                continue;
            };
            self.seq += 1;

            let mut image = frame.to_image();
            match &mut self.stage {
                PumpStage::Detection { queue, cache } => {
                    // Best-effort hand-off; a full queue only costs inference
                    // coverage for this frame.
                    if !queue.try_enqueue(FrameTicket {
                        seq: self.seq,
                        frame: frame.clone(),
                    }) {
                        log::trace!(
                            "stream '{}': queue full, frame {} not inferred",
                            self.settings.stream_id,
                            self.seq
                        );
                    }

                    let mut active = false;
                    if let Some(batch) = cache.read() {
                        let mapped: Vec<_> = batch
                            .detections
                            .iter()
                            .map(|d| batch.coord_map.map_to_frame(d))
                            .filter(|d| d.confidence >= self.settings.confidence_threshold)
                            .collect();
                        active = !mapped.is_empty();
                        self.annotator.draw_detections(&mut image, &mapped);
                    }
                    self.status.set(&self.settings.stream_id, active);
                }
                PumpStage::Gesture { estimator, detector } => {
                    let poses = estimator.detect_pose(&frame).unwrap_or_else(|err| {
                        log::warn!(
                            "stream '{}': pose estimation failed: {:#}",
                            self.settings.stream_id,
                            err
                        );
                        Vec::new()
                    });
                    let pose = poses.iter().find(|p| p.is_closed()).or_else(|| poses.first());
                    let overlay = detector.observe(pose, Instant::now());
                    if let Some(bounds) = overlay.sos_bounds {
                        self.annotator.draw_sos(&mut image, bounds);
                    } else {
                        for pose in &poses {
                            self.annotator.draw_skeleton(&mut image, pose);
                        }
                    }
                    self.status.set(&self.settings.stream_id, overlay.alert_active);
                }
            }

            match encode_jpeg(
                image.as_raw(),
                image.width(),
                image.height(),
                self.settings.jpeg_quality,
            ) {
                Ok(jpeg) => sink
                    .emit(&jpeg)
                    .with_context(|| format!("emit frame for stream '{}'", self.settings.stream_id))?,
                Err(err) => {
                    // Never emit corrupt data; skip this frame but keep pace.
                    log::warn!(
                        "stream '{}': encode failed for frame {}, skipping: {:#}",
                        self.settings.stream_id,
                        self.seq,
                        err
                    );
                }
            }

            // Self-correcting sleep: account for time already spent this
            // iteration or playback drifts slower than real time under load.
            let elapsed = started.elapsed();
            if elapsed < interval {
                std::thread::sleep(interval - elapsed);
            }
        }
    }
}

fn frame_interval(fps: f64) -> Duration {
    let fps = if fps > 0.0 { fps } else { FALLBACK_FPS };
    Duration::from_secs_f64(1.0 / fps)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_falls_back_for_bad_rates() {
        assert_eq!(frame_interval(25.0), Duration::from_secs_f64(1.0 / 25.0));
        assert_eq!(frame_interval(0.0), Duration::from_secs_f64(1.0 / 25.0));
        assert_eq!(frame_interval(-3.0), Duration::from_secs_f64(1.0 / 25.0));
    }
}
