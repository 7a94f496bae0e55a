//! Hand pose capability.
//!
//! Unlike the box detector, pose estimation is synchronous and fast enough to
//! run inline in the stream pump, so there is no queueing on this path. The
//! estimator itself is an external capability behind `PoseEstimator`; the
//! crate ships a scripted stub used by tests and the stub:// demo streams.

use anyhow::Result;

use crate::frame::Frame;

/// Landmark count of a tracked hand (wrist + 4 joints per finger).
pub const LANDMARK_COUNT: usize = 21;

/// (fingertip, knuckle) landmark index pairs for the four non-thumb fingers.
const FINGER_PAIRS: [(usize, usize); 4] = [(8, 6), (12, 10), (16, 14), (20, 18)];

/// Landmark index pairs forming the drawable hand skeleton.
pub const HAND_CONNECTIONS: [(usize, usize); 21] = [
    (0, 1),
    (1, 2),
    (2, 3),
    (3, 4),
    (0, 5),
    (5, 6),
    (6, 7),
    (7, 8),
    (5, 9),
    (9, 10),
    (10, 11),
    (11, 12),
    (9, 13),
    (13, 14),
    (14, 15),
    (15, 16),
    (13, 17),
    (17, 18),
    (18, 19),
    (19, 20),
    (0, 17),
];

/// Axis-aligned pixel rectangle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Bounds {
    pub x_min: i32,
    pub y_min: i32,
    pub x_max: i32,
    pub y_max: i32,
}

/// One tracked hand's landmark set, in pixel coordinates.
#[derive(Clone, Debug)]
pub struct HandPose {
    pub landmarks: Vec<(f32, f32)>,
}

impl HandPose {
    pub fn new(landmarks: Vec<(f32, f32)>) -> Self {
        Self { landmarks }
    }

    /// A hand counts as closed when all four non-thumb fingertips sit below
    /// their knuckles (image y grows downward, so folded means tip.y > pip.y).
    pub fn is_closed(&self) -> bool {
        if self.landmarks.len() < LANDMARK_COUNT {
            return false;
        }
        FINGER_PAIRS
            .iter()
            .all(|&(tip, pip)| self.landmarks[tip].1 > self.landmarks[pip].1)
    }

    /// Bounding rectangle of all landmarks.
    pub fn bounds(&self) -> Bounds {
        let mut x_min = f32::MAX;
        let mut y_min = f32::MAX;
        let mut x_max = f32::MIN;
        let mut y_max = f32::MIN;
        for &(x, y) in &self.landmarks {
            x_min = x_min.min(x);
            y_min = y_min.min(y);
            x_max = x_max.max(x);
            y_max = y_max.max(y);
        }
        Bounds {
            x_min: x_min as i32,
            y_min: y_min as i32,
            x_max: x_max as i32,
            y_max: y_max as i32,
        }
    }
}

/// External pose capability: zero or more tracked hands per frame.
pub trait PoseEstimator: Send {
    fn detect_pose(&mut self, frame: &Frame) -> Result<Vec<HandPose>>;
}

/// Scripted pose estimator for tests and stub:// demo streams.
///
/// Emits a synthetic hand per frame according to a repeating script of
/// open/closed states; `None` entries produce no hand at all.
pub struct StubPoseEstimator {
    script: Vec<Option<bool>>,
    cursor: usize,
}

impl StubPoseEstimator {
    pub fn from_script(script: Vec<Option<bool>>) -> Self {
        Self { script, cursor: 0 }
    }

    /// Demo script: a hand appears and clenches twice within `period` frames.
    pub fn demo_cycle(period: usize) -> Self {
        let mut script = vec![Some(false); period.max(16)];
        let first = script.len() / 4;
        let second = first + 6;
        script[first] = Some(true);
        script[first + 1] = Some(true);
        script[second] = Some(true);
        script[second + 1] = Some(true);
        Self::from_script(script)
    }
}

impl PoseEstimator for StubPoseEstimator {
    fn detect_pose(&mut self, frame: &Frame) -> Result<Vec<HandPose>> {
        if self.script.is_empty() {
            return Ok(Vec::new());
        }
        let state = self.script[self.cursor % self.script.len()];
        self.cursor += 1;
        Ok(match state {
            Some(closed) => vec![synthetic_hand(frame.width(), frame.height(), closed)],
            None => Vec::new(),
        })
    }
}

/// Build a plausible hand centered in the frame, open or closed.
pub fn synthetic_hand(width: u32, height: u32, closed: bool) -> HandPose {
    let cx = width as f32 / 2.0;
    let cy = height as f32 / 2.0;
    let spread = (width.min(height) as f32 / 8.0).max(8.0);
    let mut landmarks = vec![(cx, cy + spread); LANDMARK_COUNT];
    // Knuckles in a row above the wrist; tips above (open) or below (closed).
    for (finger, &(tip, pip)) in FINGER_PAIRS.iter().enumerate() {
        let x = cx + (finger as f32 - 1.5) * spread / 2.0;
        landmarks[pip] = (x, cy);
        landmarks[tip] = if closed {
            (x, cy + spread / 2.0)
        } else {
            (x, cy - spread)
        };
    }
    // Thumb off to the side; does not affect the closed test.
    landmarks[4] = (cx - spread * 1.5, cy);
    HandPose::new(landmarks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_hand_matches_requested_state() {
        assert!(synthetic_hand(320, 240, true).is_closed());
        assert!(!synthetic_hand(320, 240, false).is_closed());
    }

    #[test]
    fn short_landmark_set_is_never_closed() {
        let pose = HandPose::new(vec![(0.0, 0.0); 5]);
        assert!(!pose.is_closed());
    }

    #[test]
    fn bounds_cover_all_landmarks() {
        let pose = synthetic_hand(320, 240, false);
        let b = pose.bounds();
        for &(x, y) in &pose.landmarks {
            assert!(x as i32 >= b.x_min && x as i32 <= b.x_max);
            assert!(y as i32 >= b.y_min && y as i32 <= b.y_max);
        }
    }
}
