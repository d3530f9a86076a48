//! Pinch-zoom, pan, and double-tap as an explicit state machine.
//!
//! Every transition is a pure function of `(session, transform, event)`, so the
//! engine can be driven from a test without any input surface. [`GestureEngine`]
//! wraps the pure [`step`] with the state a view needs to hold between events.
//!
//! The branch taken on each callback depends only on the number of contact
//! points in *that* callback. Lifting one finger of a pinch is expected to
//! produce a fresh [`GestureEvent::Start`] with one point, which re-baselines
//! the pan.

use super::transform::{DEFAULT_MAX_SCALE, MIN_SCALE, Transform};
use cgmath::{MetricSpace, Point2, Vector2, Zero};
use std::time::Duration;

/// Pinch baselines at or below this distance are treated as absent.
const MIN_PINCH_DISTANCE: f64 = 1e-6;

/// One contact point. `id` is stable for the lifetime of the contact.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchPoint {
    pub id: u64,
    pub position: Point2<f64>,
}

impl TouchPoint {
    pub fn new(id: u64, x: f64, y: f64) -> Self {
        Self {
            id,
            position: Point2::new(x, y),
        }
    }
}

/// Raw input delivered by the view.
#[derive(Debug, Clone, PartialEq)]
pub enum GestureEvent {
    Start(Vec<TouchPoint>),
    Move(Vec<TouchPoint>),
    End,
    /// A discrete tap at the given input-clock time.
    Tap(Duration),
}

/// Tunables for the engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureSettings {
    pub max_scale: f64,
    pub double_tap_scale: f64,
    pub double_tap_window: Duration,
}

impl Default for GestureSettings {
    fn default() -> Self {
        Self {
            max_scale: DEFAULT_MAX_SCALE,
            double_tap_scale: 2.5,
            double_tap_window: Duration::from_millis(300),
        }
    }
}

/// Baselines captured while a gesture is in progress.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureSession {
    /// Survives across gestures; drives double-tap detection.
    pub last_tap: Option<Duration>,
    pub pinch_distance: Option<f64>,
    pub pinch_scale: f64,
    pub pan_origin: Option<Point2<f64>>,
    pub pan_offset: Vector2<f64>,
    pub panning: bool,
}

impl Default for GestureSession {
    fn default() -> Self {
        Self {
            last_tap: None,
            pinch_distance: None,
            pinch_scale: MIN_SCALE,
            pan_origin: None,
            pan_offset: Vector2::zero(),
            panning: false,
        }
    }
}

impl GestureSession {
    /// Drop the per-gesture baselines, keeping tap history.
    fn ended(self) -> Self {
        Self {
            last_tap: self.last_tap,
            ..Self::default()
        }
    }
}

fn pinch_distance(points: &[TouchPoint]) -> f64 {
    points[0].position.distance(points[1].position)
}

/// Record baselines for the gesture that is starting. Never changes the transform.
pub fn gesture_start(
    session: GestureSession,
    transform: Transform,
    points: &[TouchPoint],
) -> GestureSession {
    match points.len() {
        2 => GestureSession {
            pinch_distance: Some(pinch_distance(points)),
            pinch_scale: transform.scale(),
            panning: false,
            ..session
        },
        1 if transform.is_zoomed() => GestureSession {
            panning: true,
            pan_origin: Some(points[0].position),
            pan_offset: transform.pan(),
            ..session
        },
        _ => session,
    }
}

/// Compute the transform for a move relative to the recorded baselines.
pub fn gesture_move(
    session: &GestureSession,
    transform: Transform,
    points: &[TouchPoint],
    settings: &GestureSettings,
) -> Transform {
    match points.len() {
        2 => {
            let Some(baseline) = session.pinch_distance.filter(|d| *d > MIN_PINCH_DISTANCE)
            else {
                return transform;
            };
            let scale = session.pinch_scale * (pinch_distance(points) / baseline);
            Transform::clamped(scale, transform.pan(), settings.max_scale)
        }
        1 if session.panning && transform.is_zoomed() => match session.pan_origin {
            Some(origin) => transform.with_pan(session.pan_offset + (points[0].position - origin)),
            None => transform,
        },
        _ => transform,
    }
}

/// Finish the gesture. Anything at or below unity snaps back to identity.
pub fn gesture_end(session: GestureSession, transform: Transform) -> (GestureSession, Transform) {
    let transform = if transform.scale() <= MIN_SCALE {
        Transform::identity()
    } else {
        transform
    };
    (session.ended(), transform)
}

/// Register a tap; a second tap inside the window toggles zoom.
pub fn tap(
    session: GestureSession,
    transform: Transform,
    now: Duration,
    settings: &GestureSettings,
) -> (GestureSession, Transform) {
    let is_double = session
        .last_tap
        .and_then(|last| now.checked_sub(last))
        .is_some_and(|delta| delta < settings.double_tap_window);

    let transform = match (is_double, transform.is_zoomed()) {
        (false, _) => transform,
        (true, true) => Transform::identity(),
        (true, false) => {
            Transform::clamped(settings.double_tap_scale, Vector2::zero(), settings.max_scale)
        }
    };

    let session = GestureSession {
        last_tap: Some(now),
        ..session
    };
    (session, transform)
}

/// Apply one event.
pub fn step(
    session: GestureSession,
    transform: Transform,
    event: &GestureEvent,
    settings: &GestureSettings,
) -> (GestureSession, Transform) {
    match event {
        GestureEvent::Start(points) => (gesture_start(session, transform, points), transform),
        GestureEvent::Move(points) => {
            let next = gesture_move(&session, transform, points, settings);
            (session, next)
        }
        GestureEvent::End => gesture_end(session, transform),
        GestureEvent::Tap(now) => tap(session, transform, *now, settings),
    }
}

/// Holds the session and the published transform between input callbacks.
#[derive(Debug, Clone, Default)]
pub struct GestureEngine {
    session: GestureSession,
    transform: Transform,
    settings: GestureSettings,
}

impl GestureEngine {
    pub fn new(settings: GestureSettings) -> Self {
        Self {
            session: GestureSession::default(),
            transform: Transform::identity(),
            settings,
        }
    }

    pub fn transform(&self) -> Transform {
        self.transform
    }

    pub fn session(&self) -> &GestureSession {
        &self.session
    }

    /// The view may ease transform changes only while no pan is in progress.
    pub fn should_animate(&self) -> bool {
        !self.session.panning
    }

    pub fn handle(&mut self, event: &GestureEvent) -> Transform {
        let (session, transform) = step(self.session, self.transform, event, &self.settings);
        if transform != self.transform {
            tracing::trace!(
                scale = transform.scale(),
                pan_x = transform.pan().x,
                pan_y = transform.pan().y,
                "transform updated"
            );
        }
        self.session = session;
        self.transform = transform;
        transform
    }

    pub fn on_gesture_start(&mut self, points: &[TouchPoint]) {
        self.handle(&GestureEvent::Start(points.to_vec()));
    }

    pub fn on_gesture_move(&mut self, points: &[TouchPoint]) -> Transform {
        self.handle(&GestureEvent::Move(points.to_vec()))
    }

    pub fn on_gesture_end(&mut self) -> Transform {
        self.handle(&GestureEvent::End)
    }

    pub fn on_tap(&mut self, now: Duration) -> Transform {
        self.handle(&GestureEvent::Tap(now))
    }

    /// Back to identity, e.g. when the viewer closes.
    pub fn reset(&mut self) {
        self.session = self.session.ended();
        self.transform = Transform::identity();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::vec2;

    fn pinch(distance: f64) -> Vec<TouchPoint> {
        vec![
            TouchPoint::new(1, 0.0, 0.0),
            TouchPoint::new(2, distance, 0.0),
        ]
    }

    fn finger(x: f64, y: f64) -> Vec<TouchPoint> {
        vec![TouchPoint::new(1, x, y)]
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn zoomed_engine(scale_distance: f64) -> GestureEngine {
        let mut engine = GestureEngine::default();
        engine.on_gesture_start(&pinch(100.0));
        engine.on_gesture_move(&pinch(scale_distance));
        engine.on_gesture_end();
        engine
    }

    // =========================================================================
    // Pinch
    // =========================================================================

    #[test]
    fn pinch_doubles_scale_when_distance_doubles() {
        let mut engine = GestureEngine::default();
        engine.on_gesture_start(&pinch(100.0));
        let t = engine.on_gesture_move(&pinch(200.0));
        assert_eq!(t.scale(), 2.0);
    }

    #[test]
    fn pinch_clamps_at_max_scale() {
        let mut engine = GestureEngine::default();
        engine.on_gesture_start(&pinch(100.0));
        assert_eq!(engine.on_gesture_move(&pinch(200.0)).scale(), 2.0);
        // 1 × 600/100 = 6, capped at 5
        assert_eq!(engine.on_gesture_move(&pinch(600.0)).scale(), 5.0);
    }

    #[test]
    fn pinch_is_relative_to_baseline_scale() {
        let mut engine = zoomed_engine(200.0);
        engine.on_gesture_start(&pinch(100.0));
        let t = engine.on_gesture_move(&pinch(150.0));
        assert_eq!(t.scale(), 3.0);
    }

    #[test]
    fn pinch_back_to_unity_recenters() {
        let mut engine = zoomed_engine(300.0);
        engine.on_gesture_start(&finger(0.0, 0.0));
        engine.on_gesture_move(&finger(40.0, 25.0));
        engine.on_gesture_end();
        assert_eq!(engine.transform().pan(), vec2(40.0, 25.0));

        engine.on_gesture_start(&pinch(300.0));
        let t = engine.on_gesture_move(&pinch(50.0));
        assert_eq!(t.scale(), 1.0);
        assert_eq!(t.pan(), vec2(0.0, 0.0));
    }

    #[test]
    fn pinch_keeps_pan_while_above_unity() {
        let mut engine = zoomed_engine(300.0);
        engine.on_gesture_start(&finger(0.0, 0.0));
        engine.on_gesture_move(&finger(10.0, 10.0));
        engine.on_gesture_end();

        engine.on_gesture_start(&pinch(100.0));
        let t = engine.on_gesture_move(&pinch(80.0));
        assert!((t.scale() - 2.4).abs() < 1e-9);
        assert_eq!(t.pan(), vec2(10.0, 10.0));
    }

    #[test]
    fn pinch_with_zero_baseline_is_a_noop() {
        let mut engine = GestureEngine::default();
        engine.on_gesture_start(&pinch(0.0));
        let t = engine.on_gesture_move(&pinch(200.0));
        assert_eq!(t, Transform::identity());
    }

    #[test]
    fn pinch_move_without_start_is_a_noop() {
        let mut engine = GestureEngine::default();
        let t = engine.on_gesture_move(&pinch(200.0));
        assert_eq!(t, Transform::identity());
    }

    #[test]
    fn scale_stays_in_bounds_for_any_pinch_sequence() {
        // Deterministic pseudo-random distances, including degenerate ones.
        let mut seed: u64 = 0x2545_f491_4f6c_dd1d;
        let mut next = || {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            (seed % 10_000) as f64 / 10.0
        };

        let mut engine = GestureEngine::default();
        for round in 0..200 {
            engine.on_gesture_start(&pinch(next()));
            for _ in 0..20 {
                let t = engine.on_gesture_move(&pinch(next()));
                assert!((1.0..=5.0).contains(&t.scale()), "round {round}: {t:?}");
                if t.scale() == 1.0 {
                    assert_eq!(t.pan(), vec2(0.0, 0.0));
                }
            }
            let t = engine.on_gesture_end();
            assert!((1.0..=5.0).contains(&t.scale()));
            if t.scale() == 1.0 {
                assert_eq!(t.pan(), vec2(0.0, 0.0));
            }
        }
    }

    // =========================================================================
    // Pan
    // =========================================================================

    #[test]
    fn pan_requires_zoom() {
        let mut engine = GestureEngine::default();
        engine.on_gesture_start(&finger(10.0, 10.0));
        assert!(!engine.session().panning);
        let t = engine.on_gesture_move(&finger(90.0, 90.0));
        assert_eq!(t, Transform::identity());
    }

    #[test]
    fn pan_adds_finger_delta_to_baseline_offset() {
        let mut engine = zoomed_engine(200.0);
        engine.on_gesture_start(&finger(100.0, 100.0));
        engine.on_gesture_move(&finger(130.0, 80.0));
        engine.on_gesture_end();

        // Second drag continues from the previous offset
        engine.on_gesture_start(&finger(0.0, 0.0));
        let t = engine.on_gesture_move(&finger(-5.0, 15.0));
        assert_eq!(t.pan(), vec2(25.0, -5.0));
        assert_eq!(t.scale(), 2.0);
    }

    #[test]
    fn pan_is_not_clamped() {
        let mut engine = zoomed_engine(200.0);
        engine.on_gesture_start(&finger(0.0, 0.0));
        let t = engine.on_gesture_move(&finger(10_000.0, -10_000.0));
        assert_eq!(t.pan(), vec2(10_000.0, -10_000.0));
    }

    #[test]
    fn lifting_a_finger_rebaselines_pan() {
        let mut engine = GestureEngine::default();
        engine.on_gesture_start(&pinch(100.0));
        engine.on_gesture_move(&pinch(300.0));
        // One finger lifts: the view restarts with the remaining contact
        engine.on_gesture_start(&finger(300.0, 0.0));
        let t = engine.on_gesture_move(&finger(320.0, 10.0));
        assert_eq!(t.pan(), vec2(20.0, 10.0));
        assert_eq!(t.scale(), 3.0);
    }

    #[test]
    fn three_fingers_are_ignored() {
        let mut engine = zoomed_engine(200.0);
        let before = engine.transform();
        let three = vec![
            TouchPoint::new(1, 0.0, 0.0),
            TouchPoint::new(2, 50.0, 0.0),
            TouchPoint::new(3, 0.0, 50.0),
        ];
        engine.on_gesture_start(&three);
        assert_eq!(engine.on_gesture_move(&three), before);
    }

    #[test]
    fn animation_is_suppressed_while_panning() {
        let mut engine = zoomed_engine(200.0);
        assert!(engine.should_animate());
        engine.on_gesture_start(&finger(0.0, 0.0));
        assert!(!engine.should_animate());
        engine.on_gesture_end();
        assert!(engine.should_animate());
    }

    // =========================================================================
    // End
    // =========================================================================

    #[test]
    fn end_clears_panning_and_baselines() {
        let mut engine = zoomed_engine(200.0);
        engine.on_gesture_start(&finger(0.0, 0.0));
        engine.on_gesture_end();
        let session = engine.session();
        assert!(!session.panning);
        assert_eq!(session.pan_origin, None);
        assert_eq!(session.pinch_distance, None);
    }

    #[test]
    fn end_at_unity_resets_fully() {
        let (_, t) = gesture_end(GestureSession::default(), Transform::identity());
        assert_eq!(t, Transform::identity());
    }

    #[test]
    fn end_preserves_zoomed_transform() {
        let mut engine = zoomed_engine(250.0);
        let t = engine.on_gesture_end();
        assert_eq!(t.scale(), 2.5);
    }

    // =========================================================================
    // Double tap
    // =========================================================================

    #[test]
    fn first_tap_never_toggles() {
        let mut engine = GestureEngine::default();
        assert_eq!(engine.on_tap(ms(1_000)), Transform::identity());
        assert_eq!(engine.session().last_tap, Some(ms(1_000)));
    }

    #[test]
    fn taps_250ms_apart_toggle_once() {
        let mut engine = GestureEngine::default();
        engine.on_tap(ms(1_000));
        let t = engine.on_tap(ms(1_250));
        assert_eq!(t.scale(), 2.5);
        assert_eq!(t.pan(), vec2(0.0, 0.0));
    }

    #[test]
    fn taps_350ms_apart_do_not_toggle() {
        let mut engine = GestureEngine::default();
        engine.on_tap(ms(1_000));
        let t = engine.on_tap(ms(1_350));
        assert_eq!(t, Transform::identity());
    }

    #[test]
    fn exactly_at_window_does_not_toggle() {
        let mut engine = GestureEngine::default();
        engine.on_tap(ms(0));
        assert_eq!(engine.on_tap(ms(300)), Transform::identity());
    }

    #[test]
    fn double_tap_while_zoomed_resets() {
        let mut engine = zoomed_engine(400.0);
        engine.on_gesture_start(&finger(0.0, 0.0));
        engine.on_gesture_move(&finger(33.0, 44.0));
        engine.on_gesture_end();

        engine.on_tap(ms(5_000));
        let t = engine.on_tap(ms(5_100));
        assert_eq!(t, Transform::identity());
    }

    #[test]
    fn third_rapid_tap_toggles_again() {
        let mut engine = GestureEngine::default();
        engine.on_tap(ms(0));
        assert_eq!(engine.on_tap(ms(200)).scale(), 2.5);
        assert_eq!(engine.on_tap(ms(400)).scale(), 1.0);
        assert_eq!(engine.on_tap(ms(600)).scale(), 2.5);
    }

    #[test]
    fn slow_tap_still_advances_timestamp() {
        let mut engine = GestureEngine::default();
        engine.on_tap(ms(0));
        engine.on_tap(ms(1_000));
        // Measured from the second tap, not the first
        assert_eq!(engine.on_tap(ms(1_100)).scale(), 2.5);
    }

    #[test]
    fn tap_from_earlier_clock_does_not_toggle() {
        let mut engine = GestureEngine::default();
        engine.on_tap(ms(500));
        assert_eq!(engine.on_tap(ms(400)), Transform::identity());
    }

    #[test]
    fn double_tap_scale_respects_settings() {
        let settings = GestureSettings {
            double_tap_scale: 3.5,
            ..GestureSettings::default()
        };
        let (session, _) = tap(GestureSession::default(), Transform::identity(), ms(0), &settings);
        let (_, t) = tap(session, Transform::identity(), ms(100), &settings);
        assert_eq!(t.scale(), 3.5);
    }

    // =========================================================================
    // Pure step function
    // =========================================================================

    #[test]
    fn step_start_never_changes_transform() {
        let settings = GestureSettings::default();
        let t = Transform::clamped(2.0, vec2(5.0, 5.0), settings.max_scale);
        let (_, after) = step(
            GestureSession::default(),
            t,
            &GestureEvent::Start(pinch(120.0)),
            &settings,
        );
        assert_eq!(after, t);
    }

    #[test]
    fn reset_returns_to_identity_and_keeps_tap_history() {
        let mut engine = zoomed_engine(300.0);
        engine.on_tap(ms(10));
        engine.reset();
        assert_eq!(engine.transform(), Transform::identity());
        assert_eq!(engine.session().last_tap, Some(ms(10)));
    }
}
