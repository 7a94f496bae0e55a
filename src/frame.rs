//! Frame and ticket types.
//!
//! A `Frame` is an owned RGB8 pixel buffer. Frames are immutable once
//! captured: every stage that needs to mutate (annotation) or retain (worker
//! hand-off) a frame works on its own copy, so no stage ever mutates a frame
//! another stage still reads.

use anyhow::{anyhow, Context, Result};
use image::RgbImage;

/// Fixed channel count; all sources decode to packed RGB8.
pub const CHANNELS: u32 = 3;

/// Owned RGB8 pixel buffer.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Result<Self> {
        let expected = (width as usize) * (height as usize) * CHANNELS as usize;
        if data.len() != expected {
            return Err(anyhow!(
                "frame buffer size mismatch: got {} bytes, expected {} for {}x{} rgb",
                data.len(),
                expected,
                width,
                height
            ));
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u32 {
        CHANNELS
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Copy into an owned `RgbImage` for annotation.
    pub fn to_image(&self) -> RgbImage {
        RgbImage::from_raw(self.width, self.height, self.data.clone())
            .unwrap_or_else(|| RgbImage::new(self.width, self.height))
    }

    pub fn from_image(image: RgbImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            data: image.into_raw(),
            width,
            height,
        }
    }

    /// Decode a JPEG byte buffer into a frame.
    pub fn decode_jpeg(bytes: &[u8]) -> Result<Self> {
        let image = image::load_from_memory(bytes).context("decode jpeg")?;
        Ok(Self::from_image(image.to_rgb8()))
    }

    /// Encode this frame as JPEG at the given quality (1..=100).
    pub fn encode_jpeg(&self, quality: u8) -> Result<Vec<u8>> {
        encode_jpeg(&self.data, self.width, self.height, quality)
    }
}

/// Encode packed RGB8 pixels as JPEG.
pub fn encode_jpeg(pixels: &[u8], width: u32, height: u32, quality: u8) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(64 * 1024);
    let mut encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut out, quality);
    encoder
        .encode(pixels, width, height, image::ExtendedColorType::Rgb8)
        .context("encode jpeg")?;
    Ok(out)
}

/// A sequence-numbered frame handed from the stream pump to workers.
///
/// Sequence numbers are assigned by the pump in strictly increasing order and
/// never reused; the frame inside a ticket is a private copy.
#[derive(Clone, Debug)]
pub struct FrameTicket {
    pub seq: u64,
    pub frame: Frame,
}
