//! Local file frame source.

use anyhow::{anyhow, Result};

#[cfg(feature = "ingest-ffmpeg")]
use super::file_ffmpeg::FfmpegFileSource;
use crate::frame::Frame;

/// Configuration for a file source.
#[derive(Clone, Debug)]
pub struct FileConfig {
    /// Local file path, or a "stub://name" synthetic clip. Stub paths accept
    /// "stub://name?frames=N&fps=F" to shape the clip.
    pub path: String,
    /// Overrides the rate the container reports.
    pub fps_override: Option<f64>,
}

impl FileConfig {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            fps_override: None,
        }
    }
}

/// Looping local video source.
pub struct FileSource {
    backend: FileBackend,
    fps_override: Option<f64>,
}

enum FileBackend {
    Synthetic(SyntheticSource),
    #[cfg(feature = "ingest-ffmpeg")]
    Ffmpeg(FfmpegFileSource),
}

impl FileSource {
    /// Open the source. Failure here is fatal to the stream: the caller logs
    /// it and the stream produces no output.
    pub fn open(config: FileConfig) -> Result<Self> {
        if !is_local_path(&config.path) {
            return Err(anyhow!("file source only supports local paths, no URLs"));
        }
        let fps_override = config.fps_override;
        let backend = if config.path.starts_with("stub://") {
            FileBackend::Synthetic(SyntheticSource::open(&config.path)?)
        } else {
            #[cfg(feature = "ingest-ffmpeg")]
            {
                FileBackend::Ffmpeg(FfmpegFileSource::open(&config.path)?)
            }
            #[cfg(not(feature = "ingest-ffmpeg"))]
            {
                return Err(anyhow!(
                    "opening '{}' requires the ingest-ffmpeg feature",
                    config.path
                ));
            }
        };
        Ok(Self {
            backend,
            fps_override,
        })
    }

    /// Next frame, or `None` when the clip is exhausted.
    pub fn read(&mut self) -> Result<Option<Frame>> {
        match &mut self.backend {
            FileBackend::Synthetic(source) => source.read(),
            #[cfg(feature = "ingest-ffmpeg")]
            FileBackend::Ffmpeg(source) => source.read(),
        }
    }

    /// Seek back to the first frame.
    pub fn rewind(&mut self) -> Result<()> {
        match &mut self.backend {
            FileBackend::Synthetic(source) => source.rewind(),
            #[cfg(feature = "ingest-ffmpeg")]
            FileBackend::Ffmpeg(source) => source.rewind(),
        }
    }

    /// Native frame rate. Non-positive values are possible for broken
    /// containers; the pump substitutes its fallback interval.
    pub fn frame_rate(&self) -> f64 {
        if let Some(fps) = self.fps_override {
            return fps;
        }
        match &self.backend {
            FileBackend::Synthetic(source) => source.fps,
            #[cfg(feature = "ingest-ffmpeg")]
            FileBackend::Ffmpeg(source) => source.frame_rate(),
        }
    }
}

fn is_local_path(path: &str) -> bool {
    if path.trim().is_empty() {
        return false;
    }
    path.starts_with("stub://") || !path.contains("://")
}

// ----------------------------------------------------------------------------
// Synthetic clips (stub://)
// ----------------------------------------------------------------------------

const STUB_WIDTH: u32 = 320;
const STUB_HEIGHT: u32 = 240;
const STUB_DEFAULT_FRAMES: u64 = 150;
const STUB_DEFAULT_FPS: f64 = 25.0;

struct SyntheticSource {
    frames: u64,
    fps: f64,
    cursor: u64,
}

impl SyntheticSource {
    fn open(path: &str) -> Result<Self> {
        let mut frames = STUB_DEFAULT_FRAMES;
        let mut fps = STUB_DEFAULT_FPS;
        if let Some(query) = path.split_once('?').map(|(_, q)| q) {
            for pair in query.split('&') {
                match pair.split_once('=') {
                    Some(("frames", value)) => {
                        frames = value
                            .parse()
                            .map_err(|_| anyhow!("stub frames must be an integer"))?;
                    }
                    Some(("fps", value)) => {
                        fps = value
                            .parse()
                            .map_err(|_| anyhow!("stub fps must be a number"))?;
                    }
                    _ => return Err(anyhow!("unknown stub option '{}'", pair)),
                }
            }
        }
        if frames == 0 {
            return Err(anyhow!("stub clip must have at least one frame"));
        }
        log::info!("FileSource: opened {} (synthetic, {} frames)", path, frames);
        Ok(Self {
            frames,
            fps,
            cursor: 0,
        })
    }

    fn read(&mut self) -> Result<Option<Frame>> {
        if self.cursor >= self.frames {
            return Ok(None);
        }
        let frame = self.generate(self.cursor);
        self.cursor += 1;
        Ok(Some(frame))
    }

    fn rewind(&mut self) -> Result<()> {
        self.cursor = 0;
        Ok(())
    }

    /// A moving gradient plus a sweeping bright bar so consecutive frames
    /// differ and annotations are visible against the background.
    fn generate(&self, index: u64) -> Frame {
        let mut data = vec![0u8; (STUB_WIDTH * STUB_HEIGHT * 3) as usize];
        let bar_x = ((index * 7) % STUB_WIDTH as u64) as u32;
        for y in 0..STUB_HEIGHT {
            for x in 0..STUB_WIDTH {
                let i = ((y * STUB_WIDTH + x) * 3) as usize;
                data[i] = ((x + index as u32) % 256) as u8;
                data[i + 1] = ((y + index as u32 / 2) % 256) as u8;
                data[i + 2] = if x.abs_diff(bar_x) < 6 { 255 } else { 40 };
            }
        }
        Frame::new(data, STUB_WIDTH, STUB_HEIGHT).unwrap_or_else(|_| {
            Frame::from_image(image::RgbImage::new(STUB_WIDTH, STUB_HEIGHT))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_clip_exhausts_and_rewinds() {
        let mut source = FileSource::open(FileConfig::new("stub://clip?frames=3&fps=50")).unwrap();
        assert_eq!(source.frame_rate(), 50.0);
        for _ in 0..3 {
            assert!(source.read().unwrap().is_some());
        }
        assert!(source.read().unwrap().is_none());
        source.rewind().unwrap();
        assert!(source.read().unwrap().is_some());
    }

    #[test]
    fn fps_override_wins() {
        let mut config = FileConfig::new("stub://clip?frames=2");
        config.fps_override = Some(10.0);
        let source = FileSource::open(config).unwrap();
        assert_eq!(source.frame_rate(), 10.0);
    }

    #[test]
    fn rejects_urls_and_bad_options() {
        assert!(FileSource::open(FileConfig::new("http://example.com/a.mp4")).is_err());
        assert!(FileSource::open(FileConfig::new("stub://clip?frames=0")).is_err());
        assert!(FileSource::open(FileConfig::new("stub://clip?loop=1")).is_err());
    }
}
