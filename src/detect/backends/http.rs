//! Hosted-inference HTTP backend.
//!
//! Sends the (already letterboxed) frame as a base64 JPEG body to
//! `{api_url}/{model_id}?api_key=...` and parses the prediction list from the
//! JSON response. Only the fields consumed here are part of the contract; the
//! rest of the response is ignored.

use anyhow::{anyhow, Context, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::Deserialize;
use std::time::Duration;
use url::Url;

use crate::detect::backend::Detector;
use crate::detect::result::Detection;
use crate::frame::Frame;

const UPLOAD_JPEG_QUALITY: u8 = 75;

#[derive(Clone, Debug)]
pub struct HttpDetectorConfig {
    /// Base URL of the inference service, e.g. "https://detect.example.com".
    pub api_url: String,
    pub api_key: String,
    /// Per-call timeout. The stream never waits on this; only workers do.
    pub timeout: Duration,
}

pub struct HttpDetector {
    base: Url,
    api_key: String,
    timeout: Duration,
}

impl HttpDetector {
    pub fn new(config: HttpDetectorConfig) -> Result<Self> {
        let base = Url::parse(&config.api_url)
            .with_context(|| format!("invalid detector api url '{}'", config.api_url))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(anyhow!(
                "detector api url must be http(s), got '{}'",
                base.scheme()
            ));
        }
        Ok(Self {
            base,
            api_key: config.api_key,
            timeout: config.timeout,
        })
    }

    fn endpoint(&self, model_id: &str) -> Result<Url> {
        let mut url = self
            .base
            .join(model_id)
            .with_context(|| format!("invalid model id '{}'", model_id))?;
        url.query_pairs_mut().append_pair("api_key", &self.api_key);
        Ok(url)
    }
}

#[derive(Debug, Deserialize)]
struct InferResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[derive(Debug, Deserialize)]
struct Prediction {
    x: f32,
    y: f32,
    width: f32,
    height: f32,
    confidence: f32,
    class: String,
}

impl Detector for HttpDetector {
    fn name(&self) -> &'static str {
        "http"
    }

    fn infer(&self, frame: &Frame, model_id: &str) -> Result<Vec<Detection>> {
        let jpeg = frame.encode_jpeg(UPLOAD_JPEG_QUALITY)?;
        let body = BASE64.encode(&jpeg);
        let endpoint = self.endpoint(model_id)?;

        let response = ureq::post(endpoint.as_str())
            .timeout(self.timeout)
            .set("Content-Type", "application/x-www-form-urlencoded")
            .send_string(&body)
            .with_context(|| format!("inference request to {}", model_id))?;
        let text = response.into_string().context("read inference response")?;
        let parsed: InferResponse =
            serde_json::from_str(&text).context("parse inference response")?;

        Ok(parsed
            .predictions
            .into_iter()
            .map(|p| Detection {
                label: p.class,
                confidence: p.confidence,
                cx: p.x,
                cy: p.y,
                w: p.width,
                h: p.height,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_http_url() {
        let cfg = HttpDetectorConfig {
            api_url: "ftp://detect.example.com".into(),
            api_key: "k".into(),
            timeout: Duration::from_secs(1),
        };
        assert!(HttpDetector::new(cfg).is_err());
    }

    #[test]
    fn endpoint_carries_model_and_key() {
        let detector = HttpDetector::new(HttpDetectorConfig {
            api_url: "https://detect.example.com".into(),
            api_key: "secret".into(),
            timeout: Duration::from_secs(1),
        })
        .unwrap();
        let url = detector.endpoint("weapons-v2/1").unwrap();
        assert_eq!(url.path(), "/weapons-v2/1");
        assert_eq!(url.query(), Some("api_key=secret"));
    }
}
