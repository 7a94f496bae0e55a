//! Overlay drawing.
//!
//! Detection boxes and labels in the stream's accent color, the SOS box in
//! red, and the hand skeleton for gesture streams while no alert is showing.
//! All drawing happens on the pump's private copy of the frame.

mod font;

use image::{Rgb, RgbImage};
use imageproc::drawing::{
    draw_filled_circle_mut, draw_filled_rect_mut, draw_hollow_rect_mut, draw_line_segment_mut,
};
use imageproc::rect::Rect;

use crate::detect::Detection;
use crate::pose::{Bounds, HandPose, HAND_CONNECTIONS};

const BOX_THICKNESS: i32 = 2;
const SOS_LABEL: &str = "SOS DETECTED";

#[derive(Clone, Debug)]
pub struct Annotator {
    pub box_color: Rgb<u8>,
    pub label_color: Rgb<u8>,
    pub sos_color: Rgb<u8>,
    pub skeleton_color: Rgb<u8>,
}

impl Default for Annotator {
    fn default() -> Self {
        Self {
            box_color: Rgb([0, 255, 0]),
            label_color: Rgb([0, 0, 0]),
            sos_color: Rgb([255, 0, 0]),
            skeleton_color: Rgb([0, 200, 255]),
        }
    }
}

impl Annotator {
    /// Draw boxes and "<label> <confidence>" tags for detections already
    /// mapped into frame coordinates.
    pub fn draw_detections(&self, image: &mut RgbImage, detections: &[Detection]) {
        for det in detections {
            let x0 = (det.cx - det.w / 2.0) as i32;
            let y0 = (det.cy - det.h / 2.0) as i32;
            let w = det.w.max(1.0) as u32;
            let h = det.h.max(1.0) as u32;
            draw_thick_rect(image, x0, y0, w, h, self.box_color);

            let label = format!("{} {:.2}", det.label, det.confidence);
            self.draw_label(image, &label, x0, y0, self.box_color);
        }
    }

    /// Draw the SOS bounding box and label.
    pub fn draw_sos(&self, image: &mut RgbImage, bounds: Bounds) {
        let w = (bounds.x_max - bounds.x_min).max(1) as u32;
        let h = (bounds.y_max - bounds.y_min).max(1) as u32;
        draw_thick_rect(image, bounds.x_min, bounds.y_min, w, h, self.sos_color);
        self.draw_label(image, SOS_LABEL, bounds.x_min, bounds.y_min, self.sos_color);
    }

    /// Draw the hand landmark skeleton, shown on gesture streams while no
    /// alert is being rendered.
    pub fn draw_skeleton(&self, image: &mut RgbImage, pose: &HandPose) {
        for &(a, b) in HAND_CONNECTIONS.iter() {
            let (Some(&from), Some(&to)) = (pose.landmarks.get(a), pose.landmarks.get(b)) else {
                continue;
            };
            draw_line_segment_mut(image, from, to, self.skeleton_color);
        }
        for &(x, y) in &pose.landmarks {
            draw_filled_circle_mut(image, (x as i32, y as i32), 2, self.skeleton_color);
        }
    }

    /// Label with a filled background just above the box's top-left corner,
    /// or inside the box when it would fall off the top of the frame.
    fn draw_label(&self, image: &mut RgbImage, text: &str, x: i32, y: i32, background: Rgb<u8>) {
        let text_h = font::GLYPH_HEIGHT as i32;
        let label_y = if y >= text_h + 4 { y - text_h - 4 } else { y + 2 };
        let bg_w = font::text_width(text) + 4;
        if bg_w == 4 {
            return;
        }
        if let Some(rect) = clamped_rect(image, x, label_y, bg_w, text_h as u32 + 4) {
            draw_filled_rect_mut(image, rect, background);
        }
        font::draw_text(image, text, x + 2, label_y + 2, self.label_color);
    }
}

fn draw_thick_rect(image: &mut RgbImage, x: i32, y: i32, w: u32, h: u32, color: Rgb<u8>) {
    for inset in 0..BOX_THICKNESS {
        let iw = w as i32 - 2 * inset;
        let ih = h as i32 - 2 * inset;
        if iw <= 0 || ih <= 0 {
            break;
        }
        if let Some(rect) = clamped_rect(image, x + inset, y + inset, iw as u32, ih as u32) {
            draw_hollow_rect_mut(image, rect, color);
        }
    }
}

/// Intersect a rectangle with the image; None when fully outside.
fn clamped_rect(image: &RgbImage, x: i32, y: i32, w: u32, h: u32) -> Option<Rect> {
    let (img_w, img_h) = image.dimensions();
    let x0 = x.max(0);
    let y0 = y.max(0);
    let x1 = (x + w as i32).min(img_w as i32);
    let y1 = (y + h as i32).min(img_h as i32);
    if x1 <= x0 || y1 <= y0 {
        return None;
    }
    Some(Rect::at(x0, y0).of_size((x1 - x0) as u32, (y1 - y0) as u32))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detection_box_marks_pixels() {
        let mut image = RgbImage::new(64, 64);
        let annotator = Annotator::default();
        annotator.draw_detections(
            &mut image,
            &[Detection {
                label: "person".into(),
                confidence: 0.87,
                cx: 32.0,
                cy: 32.0,
                w: 20.0,
                h: 20.0,
            }],
        );
        assert!(image.pixels().any(|p| p.0 == [0, 255, 0]));
    }

    #[test]
    fn off_frame_bounds_do_not_panic() {
        let mut image = RgbImage::new(32, 32);
        let annotator = Annotator::default();
        annotator.draw_sos(
            &mut image,
            Bounds {
                x_min: -10,
                y_min: -10,
                x_max: 100,
                y_max: 100,
            },
        );
        annotator.draw_sos(
            &mut image,
            Bounds {
                x_min: 200,
                y_min: 200,
                x_max: 210,
                y_max: 210,
            },
        );
    }
}
