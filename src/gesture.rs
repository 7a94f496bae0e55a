//! Closed-hand gesture state machine.
//!
//! Converts a sequence of per-frame hand poses into discrete closed-hand
//! transition events and an SOS trigger: two distinct open-to-closed
//! transitions within the pairing window arm the alert ("clench twice").
//! The SOS box is rendered for the display window, the alert status stays
//! raised until the longer reset window elapses, then the machine re-arms.
//!
//! Time is passed in explicitly so tests can drive the machine on a
//! simulated clock.

use std::time::{Duration, Instant};

use crate::pose::{Bounds, HandPose};

#[derive(Clone, Copy, Debug)]
pub struct GestureConfig {
    /// Maximum separation between the two closed-hand events; a second
    /// clench arriving later restarts the count instead of arming.
    pub pair_window: Duration,
    /// How long the SOS box and label are rendered after the trigger.
    pub display_window: Duration,
    /// How long the alert status stays raised; also the cooldown after
    /// which the machine resets and re-arms.
    pub reset_window: Duration,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            pair_window: Duration::from_secs(3),
            display_window: Duration::from_millis(1500),
            reset_window: Duration::from_millis(2000),
        }
    }
}

/// What the annotator should render for this frame.
#[derive(Clone, Copy, Debug)]
pub struct GestureOverlay {
    /// Bounding box of the triggering hand, present only inside the
    /// display window.
    pub sos_bounds: Option<Bounds>,
    pub alert_active: bool,
}

/// Per-stream gesture state. Private to that stream's control loop.
pub struct GestureEventDetector {
    config: GestureConfig,
    closed_events: u32,
    prev_closed: bool,
    first_event_at: Option<Instant>,
    sos_trigger: Option<Instant>,
    trigger_bounds: Option<Bounds>,
}

impl GestureEventDetector {
    pub fn new(config: GestureConfig) -> Self {
        Self {
            config,
            closed_events: 0,
            prev_closed: false,
            first_event_at: None,
            sos_trigger: None,
            trigger_bounds: None,
        }
    }

    /// Feed one frame's pose (or none) at time `now`.
    pub fn observe(&mut self, pose: Option<&HandPose>, now: Instant) -> GestureOverlay {
        // Cooldown: once the reset window elapses, clear everything and
        // re-arm for a new gesture sequence.
        if let Some(trigger) = self.sos_trigger {
            if now.duration_since(trigger) >= self.config.reset_window {
                self.sos_trigger = None;
                self.closed_events = 0;
                self.first_event_at = None;
                self.trigger_bounds = None;
            }
        }

        // An unpaired first clench goes stale after the pairing window;
        // the next clench then starts a fresh sequence.
        if self.sos_trigger.is_none() {
            if let Some(first) = self.first_event_at {
                if now.duration_since(first) >= self.config.pair_window {
                    self.closed_events = 0;
                    self.first_event_at = None;
                }
            }
        }

        let current_closed = pose.is_some_and(|p| p.is_closed());

        // Edge-triggered: a sustained closed run counts once.
        if current_closed && !self.prev_closed {
            self.closed_events += 1;
            self.trigger_bounds = pose.map(|p| p.bounds());
            if self.closed_events == 1 {
                self.first_event_at = Some(now);
            }
            log::debug!("closed-hand event, count={}", self.closed_events);
        }
        self.prev_closed = current_closed;

        if self.closed_events >= 2 && self.sos_trigger.is_none() {
            self.sos_trigger = Some(now);
            log::info!("sos gesture triggered");
        }

        let show_box = self
            .sos_trigger
            .is_some_and(|t| now.duration_since(t) < self.config.display_window);

        GestureOverlay {
            sos_bounds: if show_box { self.trigger_bounds } else { None },
            alert_active: self.alert_active(now),
        }
    }

    /// True exactly while a trigger is set and younger than the reset window.
    pub fn alert_active(&self, now: Instant) -> bool {
        self.sos_trigger
            .is_some_and(|t| now.duration_since(t) < self.config.reset_window)
    }

    /// Full reset, used when the underlying stream loops back to its start
    /// so a gesture cannot span a loop boundary.
    pub fn reset(&mut self) {
        self.closed_events = 0;
        self.prev_closed = false;
        self.first_event_at = None;
        self.sos_trigger = None;
        self.trigger_bounds = None;
    }

    pub fn closed_events(&self) -> u32 {
        self.closed_events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::synthetic_hand;

    fn closed() -> HandPose {
        synthetic_hand(320, 240, true)
    }

    fn open() -> HandPose {
        synthetic_hand(320, 240, false)
    }

    fn detector() -> GestureEventDetector {
        GestureEventDetector::new(GestureConfig::default())
    }

    #[test]
    fn sustained_closed_run_counts_once() {
        let mut d = detector();
        let t0 = Instant::now();
        for i in 0..5 {
            d.observe(Some(&closed()), t0 + Duration::from_millis(i * 100));
        }
        assert_eq!(d.closed_events(), 1);
    }

    #[test]
    fn closed_open_closed_counts_two_and_arms() {
        let mut d = detector();
        let t0 = Instant::now();
        d.observe(Some(&closed()), t0);
        d.observe(Some(&open()), t0 + Duration::from_millis(100));
        let overlay = d.observe(Some(&closed()), t0 + Duration::from_millis(200));
        assert_eq!(d.closed_events(), 2);
        assert!(overlay.alert_active);
        assert!(overlay.sos_bounds.is_some());
    }

    #[test]
    fn no_hand_counts_as_open() {
        let mut d = detector();
        let t0 = Instant::now();
        d.observe(Some(&closed()), t0);
        d.observe(None, t0 + Duration::from_millis(100));
        d.observe(Some(&closed()), t0 + Duration::from_millis(200));
        assert_eq!(d.closed_events(), 2);
    }

    #[test]
    fn display_and_reset_windows() {
        let mut d = detector();
        let t0 = Instant::now();
        d.observe(Some(&closed()), t0);
        d.observe(Some(&open()), t0 + Duration::from_millis(100));
        d.observe(Some(&closed()), t0 + Duration::from_millis(200));
        let trigger = t0 + Duration::from_millis(200);

        // Inside the display window: box rendered, alert raised.
        let o = d.observe(Some(&open()), trigger + Duration::from_millis(1400));
        assert!(o.sos_bounds.is_some());
        assert!(o.alert_active);

        // Past the display window but inside the reset window: box gone,
        // alert still raised.
        let o = d.observe(Some(&open()), trigger + Duration::from_millis(1700));
        assert!(o.sos_bounds.is_none());
        assert!(o.alert_active);

        // Past the reset window: everything cleared and re-armed.
        let o = d.observe(Some(&open()), trigger + Duration::from_millis(2000));
        assert!(o.sos_bounds.is_none());
        assert!(!o.alert_active);
        assert_eq!(d.closed_events(), 0);

        // A new gesture sequence arms again.
        d.observe(Some(&closed()), trigger + Duration::from_millis(2100));
        d.observe(Some(&open()), trigger + Duration::from_millis(2200));
        let o = d.observe(Some(&closed()), trigger + Duration::from_millis(2300));
        assert!(o.alert_active);
    }

    #[test]
    fn stale_first_clench_does_not_pair() {
        let mut d = detector();
        let t0 = Instant::now();
        d.observe(Some(&closed()), t0);
        d.observe(Some(&open()), t0 + Duration::from_millis(100));
        // Second clench arrives past the pairing window.
        let o = d.observe(Some(&closed()), t0 + Duration::from_secs(4));
        assert!(!o.alert_active);
        assert_eq!(d.closed_events(), 1);
        // It can still pair with a third clench inside the window.
        d.observe(Some(&open()), t0 + Duration::from_millis(4100));
        let o = d.observe(Some(&closed()), t0 + Duration::from_millis(4200));
        assert!(o.alert_active);
    }

    #[test]
    fn loop_reset_clears_half_completed_gesture() {
        let mut d = detector();
        let t0 = Instant::now();
        d.observe(Some(&closed()), t0);
        assert_eq!(d.closed_events(), 1);
        d.reset();
        assert_eq!(d.closed_events(), 0);
        d.observe(Some(&open()), t0 + Duration::from_millis(100));
        let o = d.observe(Some(&closed()), t0 + Duration::from_millis(200));
        // Only one event since the reset: no alert.
        assert_eq!(d.closed_events(), 1);
        assert!(!o.alert_active);
    }
}
