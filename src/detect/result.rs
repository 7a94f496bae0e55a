use crate::frame::Frame;

/// A single axis-aligned detection, center-point convention.
///
/// Coordinates are in the space of the image the detector was given. When that
/// image was a letterboxed copy, the consuming stage maps coordinates back via
/// the `CoordMap` carried on the batch.
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    pub label: String,
    pub confidence: f32,
    pub cx: f32,
    pub cy: f32,
    pub w: f32,
    pub h: f32,
}

/// The letterbox transform applied to a frame before inference.
///
/// Carried alongside the detections so the inverse mapping never has to be
/// reconstructed from global state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CoordMap {
    pub scale: f32,
    pub pad_x: f32,
    pub pad_y: f32,
}

impl CoordMap {
    pub fn identity() -> Self {
        Self {
            scale: 1.0,
            pad_x: 0.0,
            pad_y: 0.0,
        }
    }

    /// Map a detection from inference-input space back to frame space.
    pub fn map_to_frame(&self, det: &Detection) -> Detection {
        Detection {
            label: det.label.clone(),
            confidence: det.confidence,
            cx: (det.cx - self.pad_x) / self.scale,
            cy: (det.cy - self.pad_y) / self.scale,
            w: det.w / self.scale,
            h: det.h / self.scale,
        }
    }
}

/// Result of one completed inference call.
#[derive(Clone, Debug)]
pub struct DetectionBatch {
    pub seq: u64,
    pub detections: Vec<Detection>,
    pub coord_map: CoordMap,
}

/// Resize `frame` into a `size`x`size` letterboxed copy, preserving aspect
/// ratio, and return the transform needed to map detections back.
pub fn letterbox(frame: &Frame, size: u32) -> (Frame, CoordMap) {
    let (w, h) = (frame.width(), frame.height());
    let scale = (size as f32 / w as f32).min(size as f32 / h as f32);
    let new_w = ((w as f32 * scale).round() as u32).max(1).min(size);
    let new_h = ((h as f32 * scale).round() as u32).max(1).min(size);
    let pad_x = (size - new_w) / 2;
    let pad_y = (size - new_h) / 2;

    let resized = image::imageops::resize(
        &frame.to_image(),
        new_w,
        new_h,
        image::imageops::FilterType::Triangle,
    );
    let mut canvas = image::RgbImage::new(size, size);
    image::imageops::overlay(&mut canvas, &resized, pad_x as i64, pad_y as i64);

    (
        Frame::from_image(canvas),
        CoordMap {
            scale,
            pad_x: pad_x as f32,
            pad_y: pad_y as f32,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coord_map_round_trips_letterbox() {
        let frame = Frame::new(vec![0u8; 64 * 32 * 3], 64, 32).unwrap();
        let (scaled, map) = letterbox(&frame, 32);
        assert_eq!(scaled.width(), 32);
        assert_eq!(scaled.height(), 32);
        // 64x32 scaled into 32x32: scale 0.5, vertical padding of 8 rows.
        assert_eq!(map.scale, 0.5);
        assert_eq!(map.pad_x, 0.0);
        assert_eq!(map.pad_y, 8.0);

        let det = Detection {
            label: "person".into(),
            confidence: 0.9,
            cx: 16.0,
            cy: 16.0,
            w: 8.0,
            h: 8.0,
        };
        let mapped = map.map_to_frame(&det);
        assert_eq!(mapped.cx, 32.0);
        assert_eq!(mapped.cy, 16.0);
        assert_eq!(mapped.w, 16.0);
        assert_eq!(mapped.h, 16.0);
    }
}
