//! HTTP surface.
//!
//! A small hand-rolled server: one accept loop, one thread per connection.
//! Endpoints:
//! - `GET /`             service banner and stream ids
//! - `GET /streams/<id>` multipart JPEG feed for one configured stream
//! - `GET /status`       stream id -> alert-active booleans
//! - `GET /alerts`       stored alert objects
//! - `POST /alerts`      append an alert; the server stamps the timestamp
//!
//! Responses carry a permissive CORS header; the feeds are consumed by a
//! browser dashboard on another origin.

use anyhow::{anyhow, Context, Result};
use std::collections::{BTreeMap, HashMap};
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::config::{StreamKind, StreamSettings, VigildConfig};
use crate::detect::{Detector, HttpDetector, HttpDetectorConfig, StaticDetector};
use crate::gesture::{GestureConfig, GestureEventDetector};
use crate::ingest::FileConfig;
use crate::pipeline::{CancelToken, FrameQueue, InferenceWorkerPool, ResultCache, WorkerPoolConfig};
use crate::pose::StubPoseEstimator;
use crate::stream::{FrameSink, PumpSettings, PumpStage, StreamPump};

const MAX_REQUEST_BYTES: usize = 64 * 1024;
const MULTIPART_BOUNDARY: &str = "frame";

/// Per-stream alert flags, written by stream pumps and read by `/status`.
#[derive(Default)]
pub struct StatusBoard {
    flags: Mutex<BTreeMap<String, bool>>,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, stream_id: &str) {
        self.flags
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(stream_id.to_string())
            .or_insert(false);
    }

    pub fn set(&self, stream_id: &str, active: bool) {
        self.flags
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(stream_id.to_string(), active);
    }

    pub fn get(&self, stream_id: &str) -> bool {
        self.flags
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(stream_id)
            .copied()
            .unwrap_or(false)
    }

    pub fn snapshot(&self) -> BTreeMap<String, bool> {
        self.flags.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

/// In-memory alert log. Append stamps the server-side timestamp.
#[derive(Default)]
pub struct AlertLog {
    entries: Mutex<Vec<serde_json::Value>>,
}

impl AlertLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, mut alert: serde_json::Value) -> Result<serde_json::Value> {
        let object = alert
            .as_object_mut()
            .ok_or_else(|| anyhow!("alert payload must be a JSON object"))?;
        let stamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        object.insert("timestamp".to_string(), serde_json::Value::String(stamp));
        let stored = alert.clone();
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(alert);
        Ok(stored)
    }

    pub fn list(&self) -> Vec<serde_json::Value> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

struct ServerContext {
    config: VigildConfig,
    detector: Arc<dyn Detector>,
    status: Arc<StatusBoard>,
    alerts: Arc<AlertLog>,
    cancel: CancelToken,
}

pub struct ApiServer {
    ctx: Arc<ServerContext>,
}

impl ApiServer {
    pub fn new(config: VigildConfig, cancel: CancelToken) -> Result<Self> {
        let detector: Arc<dyn Detector> = match &config.detector.api_url {
            Some(api_url) => Arc::new(HttpDetector::new(HttpDetectorConfig {
                api_url: api_url.clone(),
                api_key: config.detector.api_key.clone(),
                timeout: config.detector.timeout,
            })?),
            None => {
                log::warn!("no detector api url configured; streams run without overlays");
                Arc::new(StaticDetector::empty())
            }
        };

        let status = Arc::new(StatusBoard::new());
        for stream in &config.streams {
            status.register(&stream.id);
        }

        Ok(Self {
            ctx: Arc::new(ServerContext {
                config,
                detector,
                status,
                alerts: Arc::new(AlertLog::new()),
                cancel,
            }),
        })
    }

    pub fn status_board(&self) -> Arc<StatusBoard> {
        self.ctx.status.clone()
    }

    /// Accept loop. Returns when the cancel token trips.
    pub fn serve(&self) -> Result<()> {
        let listener = TcpListener::bind(&self.ctx.config.listen_addr)
            .with_context(|| format!("bind {}", self.ctx.config.listen_addr))?;
        listener.set_nonblocking(true)?;
        log::info!("listening on {}", listener.local_addr()?);

        loop {
            if self.ctx.cancel.is_cancelled() {
                return Ok(());
            }
            match listener.accept() {
                Ok((stream, peer)) => {
                    let ctx = self.ctx.clone();
                    std::thread::spawn(move || {
                        if let Err(err) = handle_connection(ctx, stream) {
                            log::debug!("connection from {} ended: {:#}", peer, err);
                        }
                    });
                }
                Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                    std::thread::sleep(Duration::from_millis(50));
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
}

fn handle_connection(ctx: Arc<ServerContext>, mut stream: TcpStream) -> Result<()> {
    stream.set_nonblocking(false)?;
    let request = read_request(&mut stream)?;

    if request.method == "OPTIONS" {
        return write_response(&mut stream, 204, "text/plain", b"");
    }

    if let Some(stream_id) = request.path.strip_prefix("/streams/") {
        if request.method != "GET" {
            return write_json(&mut stream, 405, r#"{"error":"method_not_allowed"}"#);
        }
        let Some(settings) = ctx
            .config
            .streams
            .iter()
            .find(|s| s.id == stream_id)
            .cloned()
        else {
            return write_json(&mut stream, 404, r#"{"error":"unknown_stream"}"#);
        };
        return run_stream_connection(&ctx, &settings, stream);
    }

    match (request.method.as_str(), request.path.as_str()) {
        ("GET", "/") => {
            let ids: Vec<&str> = ctx.config.streams.iter().map(|s| s.id.as_str()).collect();
            let body = serde_json::to_string(&serde_json::json!({
                "status": "running",
                "streams": ids,
            }))?;
            write_json(&mut stream, 200, &body)
        }
        ("GET", "/status") => {
            let body = serde_json::to_string(&ctx.status.snapshot())?;
            write_json(&mut stream, 200, &body)
        }
        ("GET", "/alerts") => {
            let body = serde_json::to_string(&ctx.alerts.list())?;
            write_json(&mut stream, 200, &body)
        }
        ("POST", "/alerts") => {
            let parsed: serde_json::Value = match serde_json::from_slice(&request.body) {
                Ok(value) => value,
                Err(_) => return write_json(&mut stream, 400, r#"{"error":"invalid_json"}"#),
            };
            match ctx.alerts.append(parsed) {
                Ok(stored) => {
                    let body = serde_json::to_string(&serde_json::json!({
                        "status": "success",
                        "alert": stored,
                    }))?;
                    write_json(&mut stream, 201, &body)
                }
                Err(_) => write_json(&mut stream, 400, r#"{"error":"alert_must_be_object"}"#),
            }
        }
        ("GET", _) => write_json(&mut stream, 404, r#"{"error":"not_found"}"#),
        _ => write_json(&mut stream, 405, r#"{"error":"method_not_allowed"}"#),
    }
}

/// Serve one multipart feed. The pump and its worker pool live for exactly
/// this connection; the pool's cancel token is private so stopping it cannot
/// affect other streams.
fn run_stream_connection(
    ctx: &Arc<ServerContext>,
    settings: &StreamSettings,
    mut tcp: TcpStream,
) -> Result<()> {
    let head = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: multipart/x-mixed-replace; boundary={}\r\nAccess-Control-Allow-Origin: *\r\nCache-Control: no-store\r\nConnection: close\r\n\r\n",
        MULTIPART_BOUNDARY
    );
    tcp.write_all(head.as_bytes()).context("write stream head")?;

    let pump_settings = PumpSettings {
        stream_id: settings.id.clone(),
        confidence_threshold: settings.confidence_threshold,
        jpeg_quality: ctx.config.jpeg_quality,
    };
    let source_config = FileConfig {
        path: settings.path.clone(),
        fps_override: settings.fps_override,
    };

    let mut pool = None;
    let stage = match settings.kind {
        StreamKind::Detection => {
            let queue =
                FrameQueue::bounded(settings.effective_queue_capacity(&ctx.config.pipeline));
            let cache = Arc::new(ResultCache::new());
            pool = Some(InferenceWorkerPool::spawn(
                WorkerPoolConfig {
                    workers: settings.effective_workers(&ctx.config.pipeline),
                    input_size: ctx.config.detector.input_size,
                    model_id: settings.model_id.clone(),
                    idle_wait: ctx.config.pipeline.idle_wait,
                    failure_backoff: ctx.config.pipeline.failure_backoff,
                    max_backoff_steps: ctx.config.pipeline.max_backoff_steps,
                },
                queue.clone(),
                cache.clone(),
                ctx.detector.clone(),
                CancelToken::new(),
            ));
            PumpStage::Detection { queue, cache }
        }
        StreamKind::Gesture => PumpStage::Gesture {
            estimator: Box::new(StubPoseEstimator::demo_cycle(150)),
            detector: GestureEventDetector::new(GestureConfig {
                pair_window: ctx.config.gesture.pair_window,
                display_window: ctx.config.gesture.display_window,
                reset_window: ctx.config.gesture.reset_window,
            }),
        },
    };

    match StreamPump::open(
        pump_settings,
        source_config,
        stage,
        ctx.status.clone(),
        ctx.cancel.clone(),
    ) {
        Ok(mut pump) => {
            let mut sink = MultipartSink { stream: tcp };
            if let Err(err) = pump.run(&mut sink) {
                log::debug!("stream '{}' connection closed: {:#}", settings.id, err);
            }
        }
        Err(err) => {
            log::error!("stream '{}' failed to open: {:#}", settings.id, err);
        }
    }

    if let Some(pool) = pool.take() {
        pool.stop();
    }
    Ok(())
}

struct MultipartSink {
    stream: TcpStream,
}

impl FrameSink for MultipartSink {
    fn emit(&mut self, jpeg: &[u8]) -> Result<()> {
        let part_head = format!(
            "--{}\r\nContent-Type: image/jpeg\r\n\r\n",
            MULTIPART_BOUNDARY
        );
        self.stream.write_all(part_head.as_bytes())?;
        self.stream.write_all(jpeg)?;
        self.stream.write_all(b"\r\n")?;
        Ok(())
    }
}

#[derive(Debug)]
struct HttpRequest {
    method: String,
    path: String,
    body: Vec<u8>,
}

fn read_request(stream: &mut TcpStream) -> Result<HttpRequest> {
    stream.set_read_timeout(Some(Duration::from_secs(2)))?;
    let mut buf = [0u8; 1024];
    let mut data = Vec::new();
    let header_end = loop {
        if let Some(pos) = data.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
        let n = stream.read(&mut buf)?;
        if n == 0 {
            return Err(anyhow!("connection closed before request completed"));
        }
        data.extend_from_slice(&buf[..n]);
        if data.len() > MAX_REQUEST_BYTES {
            return Err(anyhow!("request too large"));
        }
    };

    let header_text = String::from_utf8_lossy(&data[..header_end]).into_owned();
    let mut lines = header_text.split("\r\n");
    let request_line = lines.next().ok_or_else(|| anyhow!("empty request"))?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next().ok_or_else(|| anyhow!("missing method"))?;
    let raw_path = parts.next().ok_or_else(|| anyhow!("missing path"))?;

    let mut headers = HashMap::new();
    for line in lines {
        if line.is_empty() {
            break;
        }
        if let Some((k, v)) = line.split_once(':') {
            headers.insert(k.trim().to_lowercase(), v.trim().to_string());
        }
    }

    let content_length: usize = headers
        .get("content-length")
        .map(|v| v.parse())
        .transpose()
        .map_err(|_| anyhow!("invalid content-length"))?
        .unwrap_or(0);
    if content_length > MAX_REQUEST_BYTES {
        return Err(anyhow!("request body too large"));
    }

    let mut body = data[header_end..].to_vec();
    while body.len() < content_length {
        let n = stream.read(&mut buf)?;
        if n == 0 {
            return Err(anyhow!("connection closed mid-body"));
        }
        body.extend_from_slice(&buf[..n]);
    }
    body.truncate(content_length);

    let path = raw_path.split('?').next().unwrap_or(raw_path).to_string();
    Ok(HttpRequest {
        method: method.to_string(),
        path,
        body,
    })
}

fn write_json(stream: &mut TcpStream, status: u16, body: &str) -> Result<()> {
    write_response(stream, status, "application/json", body.as_bytes())
}

fn write_response(
    stream: &mut TcpStream,
    status: u16,
    content_type: &str,
    body: &[u8],
) -> Result<()> {
    let status_line = match status {
        200 => "HTTP/1.1 200 OK",
        201 => "HTTP/1.1 201 Created",
        204 => "HTTP/1.1 204 No Content",
        400 => "HTTP/1.1 400 Bad Request",
        404 => "HTTP/1.1 404 Not Found",
        405 => "HTTP/1.1 405 Method Not Allowed",
        _ => "HTTP/1.1 500 Internal Server Error",
    };
    let header = format!(
        "{status_line}\r\nContent-Type: {content_type}\r\nContent-Length: {len}\r\nAccess-Control-Allow-Origin: *\r\nAccess-Control-Allow-Headers: Content-Type\r\nCache-Control: no-store\r\n\r\n",
        status_line = status_line,
        content_type = content_type,
        len = body.len()
    );
    stream.write_all(header.as_bytes())?;
    stream.write_all(body)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_board_defaults_registered_streams_to_false() {
        let board = StatusBoard::new();
        board.register("camera1");
        assert!(!board.get("camera1"));
        board.set("camera1", true);
        assert!(board.get("camera1"));
        assert!(!board.get("unknown"));
        assert_eq!(board.snapshot().len(), 1);
    }

    #[test]
    fn alert_log_stamps_timestamp_and_lists() {
        let log = AlertLog::new();
        let stored = log
            .append(serde_json::json!({"camera": "camera1", "kind": "sos"}))
            .unwrap();
        assert!(stored.get("timestamp").is_some());
        assert_eq!(log.list().len(), 1);
        assert_eq!(log.list()[0]["camera"], "camera1");
    }

    #[test]
    fn alert_log_rejects_non_objects() {
        let log = AlertLog::new();
        assert!(log.append(serde_json::json!([1, 2, 3])).is_err());
        assert!(log.list().is_empty());
    }
}
