use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:5000";
const DEFAULT_JPEG_QUALITY: u8 = 80;
const DEFAULT_INPUT_SIZE: u32 = 416;
const DEFAULT_WORKERS: usize = 4;
const DEFAULT_QUEUE_CAPACITY: usize = 4;
const DEFAULT_IDLE_WAIT_MS: u64 = 1;
const DEFAULT_FAILURE_BACKOFF_MS: u64 = 50;
const DEFAULT_MAX_BACKOFF_STEPS: u32 = 8;
const DEFAULT_DETECTOR_TIMEOUT_SECS: u64 = 10;
const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.4;
const DEFAULT_PAIR_WINDOW_MS: u64 = 3000;
const DEFAULT_DISPLAY_WINDOW_MS: u64 = 1500;
const DEFAULT_RESET_WINDOW_MS: u64 = 2000;

#[derive(Debug, Deserialize, Default)]
struct VigildConfigFile {
    listen_addr: Option<String>,
    jpeg_quality: Option<u8>,
    detector: Option<DetectorConfigFile>,
    pipeline: Option<PipelineConfigFile>,
    gesture: Option<GestureConfigFile>,
    streams: Option<Vec<StreamConfigFile>>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectorConfigFile {
    api_url: Option<String>,
    api_key: Option<String>,
    timeout_secs: Option<u64>,
    input_size: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct PipelineConfigFile {
    workers: Option<usize>,
    queue_capacity: Option<usize>,
    idle_wait_ms: Option<u64>,
    failure_backoff_ms: Option<u64>,
    max_backoff_steps: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct GestureConfigFile {
    pair_window_ms: Option<u64>,
    display_window_ms: Option<u64>,
    reset_window_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct StreamConfigFile {
    id: String,
    path: String,
    kind: Option<StreamKind>,
    model_id: Option<String>,
    confidence_threshold: Option<f32>,
    fps_override: Option<f64>,
    workers: Option<usize>,
    queue_capacity: Option<usize>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    Detection,
    Gesture,
}

#[derive(Debug, Clone)]
pub struct VigildConfig {
    pub listen_addr: String,
    pub jpeg_quality: u8,
    pub detector: DetectorSettings,
    pub pipeline: PipelineSettings,
    pub gesture: GestureSettings,
    pub streams: Vec<StreamSettings>,
}

#[derive(Debug, Clone)]
pub struct DetectorSettings {
    /// Remote inference base URL; `None` selects the offline stub backend.
    pub api_url: Option<String>,
    pub api_key: String,
    pub timeout: Duration,
    pub input_size: u32,
}

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub workers: usize,
    pub queue_capacity: usize,
    pub idle_wait: Duration,
    pub failure_backoff: Duration,
    pub max_backoff_steps: u32,
}

#[derive(Debug, Clone)]
pub struct GestureSettings {
    pub pair_window: Duration,
    pub display_window: Duration,
    pub reset_window: Duration,
}

#[derive(Debug, Clone)]
pub struct StreamSettings {
    pub id: String,
    pub path: String,
    pub kind: StreamKind,
    pub model_id: String,
    pub confidence_threshold: f32,
    pub fps_override: Option<f64>,
    /// Per-stream pool size; falls back to the pipeline default.
    pub workers: Option<usize>,
    /// Per-stream queue capacity; falls back to the pipeline default.
    pub queue_capacity: Option<usize>,
}

impl StreamSettings {
    pub fn effective_workers(&self, pipeline: &PipelineSettings) -> usize {
        self.workers.unwrap_or(pipeline.workers)
    }

    pub fn effective_queue_capacity(&self, pipeline: &PipelineSettings) -> usize {
        self.queue_capacity.unwrap_or(pipeline.queue_capacity)
    }
}

impl VigildConfig {
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("VIGIL_CONFIG").ok();
        Self::load_with(config_path.as_deref().map(Path::new))
    }

    pub fn load_with(path: Option<&Path>) -> Result<Self> {
        let file_cfg = match path {
            Some(path) => read_config_file(path)?,
            None => VigildConfigFile::default(),
        };
        let mut cfg = Self::from_file(file_cfg)?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: VigildConfigFile) -> Result<Self> {
        let listen_addr = file
            .listen_addr
            .unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string());
        let jpeg_quality = file.jpeg_quality.unwrap_or(DEFAULT_JPEG_QUALITY);

        let detector_file = file.detector.unwrap_or_default();
        let detector = DetectorSettings {
            api_url: detector_file.api_url,
            api_key: detector_file.api_key.unwrap_or_default(),
            timeout: Duration::from_secs(
                detector_file
                    .timeout_secs
                    .unwrap_or(DEFAULT_DETECTOR_TIMEOUT_SECS),
            ),
            input_size: detector_file.input_size.unwrap_or(DEFAULT_INPUT_SIZE),
        };

        let pipeline_file = file.pipeline.unwrap_or_default();
        let pipeline = PipelineSettings {
            workers: pipeline_file.workers.unwrap_or(DEFAULT_WORKERS),
            queue_capacity: pipeline_file.queue_capacity.unwrap_or(DEFAULT_QUEUE_CAPACITY),
            idle_wait: Duration::from_millis(
                pipeline_file.idle_wait_ms.unwrap_or(DEFAULT_IDLE_WAIT_MS),
            ),
            failure_backoff: Duration::from_millis(
                pipeline_file
                    .failure_backoff_ms
                    .unwrap_or(DEFAULT_FAILURE_BACKOFF_MS),
            ),
            max_backoff_steps: pipeline_file
                .max_backoff_steps
                .unwrap_or(DEFAULT_MAX_BACKOFF_STEPS),
        };

        let gesture_file = file.gesture.unwrap_or_default();
        let gesture = GestureSettings {
            pair_window: Duration::from_millis(
                gesture_file.pair_window_ms.unwrap_or(DEFAULT_PAIR_WINDOW_MS),
            ),
            display_window: Duration::from_millis(
                gesture_file
                    .display_window_ms
                    .unwrap_or(DEFAULT_DISPLAY_WINDOW_MS),
            ),
            reset_window: Duration::from_millis(
                gesture_file.reset_window_ms.unwrap_or(DEFAULT_RESET_WINDOW_MS),
            ),
        };

        let streams = file
            .streams
            .unwrap_or_else(default_stream_files)
            .into_iter()
            .map(|s| StreamSettings {
                id: s.id,
                path: s.path,
                kind: s.kind.unwrap_or(StreamKind::Detection),
                model_id: s.model_id.unwrap_or_default(),
                confidence_threshold: s
                    .confidence_threshold
                    .unwrap_or(DEFAULT_CONFIDENCE_THRESHOLD),
                fps_override: s.fps_override,
                workers: s.workers,
                queue_capacity: s.queue_capacity,
            })
            .collect();

        Ok(Self {
            listen_addr,
            jpeg_quality,
            detector,
            pipeline,
            gesture,
            streams,
        })
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(addr) = std::env::var("VIGIL_LISTEN_ADDR") {
            if !addr.trim().is_empty() {
                self.listen_addr = addr;
            }
        }
        if let Ok(url) = std::env::var("VIGIL_DETECTOR_URL") {
            if !url.trim().is_empty() {
                self.detector.api_url = Some(url);
            }
        }
        if let Ok(key) = std::env::var("VIGIL_DETECTOR_API_KEY") {
            if !key.trim().is_empty() {
                self.detector.api_key = key;
            }
        }
        if let Ok(workers) = std::env::var("VIGIL_WORKERS") {
            let workers: usize = workers
                .parse()
                .map_err(|_| anyhow!("VIGIL_WORKERS must be an integer"))?;
            self.pipeline.workers = workers;
        }
        if let Ok(capacity) = std::env::var("VIGIL_QUEUE_CAPACITY") {
            let capacity: usize = capacity
                .parse()
                .map_err(|_| anyhow!("VIGIL_QUEUE_CAPACITY must be an integer"))?;
            self.pipeline.queue_capacity = capacity;
        }
        Ok(())
    }

    fn validate(&mut self) -> Result<()> {
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(anyhow!("jpeg_quality must be in 1..=100"));
        }
        if self.pipeline.workers == 0 {
            return Err(anyhow!("pipeline workers must be greater than zero"));
        }
        if self.pipeline.queue_capacity == 0 {
            return Err(anyhow!("queue_capacity must be greater than zero"));
        }
        if self.detector.input_size == 0 {
            return Err(anyhow!("detector input_size must be greater than zero"));
        }
        if self.gesture.display_window > self.gesture.reset_window {
            return Err(anyhow!(
                "gesture display_window must not exceed reset_window"
            ));
        }
        if self.streams.is_empty() {
            return Err(anyhow!("at least one stream must be configured"));
        }
        let mut seen = std::collections::HashSet::new();
        for stream in &self.streams {
            if stream.id.trim().is_empty() {
                return Err(anyhow!("stream id must not be empty"));
            }
            if !seen.insert(stream.id.clone()) {
                return Err(anyhow!("duplicate stream id '{}'", stream.id));
            }
            if !(0.0..=1.0).contains(&stream.confidence_threshold) {
                return Err(anyhow!(
                    "stream '{}': confidence_threshold must be in [0, 1]",
                    stream.id
                ));
            }
            if stream.workers == Some(0) || stream.queue_capacity == Some(0) {
                return Err(anyhow!(
                    "stream '{}': workers and queue_capacity must be greater than zero",
                    stream.id
                ));
            }
            if stream.kind == StreamKind::Detection
                && self.detector.api_url.is_some()
                && stream.model_id.trim().is_empty()
            {
                return Err(anyhow!(
                    "stream '{}': model_id is required with a remote detector",
                    stream.id
                ));
            }
        }
        Ok(())
    }
}

/// Out-of-the-box demo: one detection stream and one gesture stream over
/// synthetic clips, so the daemon serves without a config file.
fn default_stream_files() -> Vec<StreamConfigFile> {
    vec![
        StreamConfigFile {
            id: "camera1".to_string(),
            path: "stub://camera1".to_string(),
            kind: Some(StreamKind::Detection),
            model_id: Some("objects-v1/1".to_string()),
            confidence_threshold: None,
            fps_override: None,
            workers: None,
            queue_capacity: None,
        },
        StreamConfigFile {
            id: "camera2".to_string(),
            path: "stub://camera2".to_string(),
            kind: Some(StreamKind::Gesture),
            model_id: None,
            confidence_threshold: None,
            fps_override: None,
            workers: None,
            queue_capacity: None,
        },
    ]
}

fn read_config_file(path: &Path) -> Result<VigildConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}
