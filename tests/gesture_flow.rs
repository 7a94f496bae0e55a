//! Gesture pipeline end-to-end: a synthetic clip timeline through the state
//! machine, and loop-reset behavior through a real stream pump.

use anyhow::Result;
use std::sync::Arc;
use std::time::{Duration, Instant};

use vigil::api::StatusBoard;
use vigil::gesture::{GestureConfig, GestureEventDetector};
use vigil::ingest::FileConfig;
use vigil::pipeline::CancelToken;
use vigil::pose::{synthetic_hand, HandPose, StubPoseEstimator};
use vigil::stream::{FrameSink, PumpSettings, PumpStage, StreamPump};

struct CountingSink {
    emitted: usize,
    cancel: CancelToken,
    max_frames: usize,
}

impl FrameSink for CountingSink {
    fn emit(&mut self, _jpeg: &[u8]) -> Result<()> {
        self.emitted += 1;
        if self.emitted >= self.max_frames {
            self.cancel.cancel();
        }
        Ok(())
    }
}

/// Ten frames at a simulated 0.1s gap, closed hands at frames 3 and 7:
/// two events after frame 7, alert raised at t7, box shown until t7+1.5s,
/// everything reset by t7+2.0s.
#[test]
fn ten_frame_clip_arms_at_second_clench() {
    let mut detector = GestureEventDetector::new(GestureConfig::default());
    let t0 = Instant::now();
    let gap = Duration::from_millis(100);
    let at = |i: u64| t0 + gap * i as u32;

    for i in 0..10u64 {
        let pose: Option<HandPose> = if i == 3 || i == 7 {
            Some(synthetic_hand(320, 240, true))
        } else {
            Some(synthetic_hand(320, 240, false))
        };
        let overlay = detector.observe(pose.as_ref(), at(i));
        if i < 7 {
            assert!(!overlay.alert_active, "alert raised early at frame {}", i);
        } else {
            assert!(overlay.alert_active, "alert missing at frame {}", i);
            assert!(overlay.sos_bounds.is_some());
        }
    }
    assert_eq!(detector.closed_events(), 2);

    let t7 = at(7);
    // Box visible just inside the display window, gone just past it while
    // the status flag stays raised.
    let overlay = detector.observe(Some(&synthetic_hand(320, 240, false)), t7 + Duration::from_millis(1400));
    assert!(overlay.sos_bounds.is_some());
    assert!(overlay.alert_active);

    let overlay = detector.observe(Some(&synthetic_hand(320, 240, false)), t7 + Duration::from_millis(1600));
    assert!(overlay.sos_bounds.is_none());
    assert!(overlay.alert_active);

    // Cooldown elapsed: flag cleared, counter reset, re-armed.
    let overlay = detector.observe(Some(&synthetic_hand(320, 240, false)), t7 + Duration::from_millis(2000));
    assert!(!overlay.alert_active);
    assert_eq!(detector.closed_events(), 0);
}

/// One clench per loop pass must never pair across the loop boundary: the
/// pump resets gesture state when the clip rewinds.
#[test]
fn clenches_do_not_pair_across_loop_boundary() {
    // 6-frame clip; the pose script matches the clip length so every pass
    // contains exactly one clench (frames 2 and 3 closed).
    let script = vec![
        Some(false),
        Some(false),
        Some(true),
        Some(true),
        Some(false),
        None,
    ];
    let cancel = CancelToken::new();
    let status = Arc::new(StatusBoard::new());
    status.register("gesture");

    let mut pump = StreamPump::open(
        PumpSettings {
            stream_id: "gesture".into(),
            confidence_threshold: 0.4,
            jpeg_quality: 75,
        },
        FileConfig::new("stub://clip?frames=6&fps=200"),
        PumpStage::Gesture {
            estimator: Box::new(StubPoseEstimator::from_script(script)),
            detector: GestureEventDetector::new(GestureConfig::default()),
        },
        status.clone(),
        cancel.clone(),
    )
    .expect("open pump");

    // Four full loop passes: clenches 30ms apart across passes would pair
    // easily inside the 3s window if state survived the rewind.
    let mut sink = CountingSink {
        emitted: 0,
        cancel,
        max_frames: 24,
    };
    pump.run(&mut sink).expect("pump run");

    assert_eq!(sink.emitted, 24);
    assert!(
        !status.get("gesture"),
        "a single clench per pass must never trigger the alert"
    );
}

/// Two clenches inside one pass do trigger, end to end through the pump.
#[test]
fn two_clenches_in_one_pass_trigger_alert() {
    let script = vec![
        Some(false),
        Some(true),
        Some(true),
        Some(false),
        Some(true),
        Some(true),
        Some(false),
        Some(false),
        Some(false),
        Some(false),
    ];
    let cancel = CancelToken::new();
    let status = Arc::new(StatusBoard::new());
    status.register("gesture");

    let mut pump = StreamPump::open(
        PumpSettings {
            stream_id: "gesture".into(),
            confidence_threshold: 0.4,
            jpeg_quality: 75,
        },
        FileConfig::new("stub://clip?frames=10&fps=200"),
        PumpStage::Gesture {
            estimator: Box::new(StubPoseEstimator::from_script(script)),
            detector: GestureEventDetector::new(GestureConfig::default()),
        },
        status.clone(),
        cancel.clone(),
    )
    .expect("open pump");

    // Stop before the rewind so the raised flag is still observable (the
    // reset window is far longer than one 50ms pass).
    let mut sink = CountingSink {
        emitted: 0,
        cancel,
        max_frames: 10,
    };
    pump.run(&mut sink).expect("pump run");

    assert!(status.get("gesture"), "second clench should raise the alert");
}
