//! Replay recorded gesture scripts through the engine.
//!
//! A script is a JSON array of steps. Contact ids are assigned by position in
//! the `points` array, which is enough for the engine since it only looks at
//! point counts and positions:
//!
//! ```json
//! [
//!   { "kind": "start", "points": [[0, 0], [100, 0]] },
//!   { "kind": "move",  "points": [[0, 0], [200, 0]] },
//!   { "kind": "end" },
//!   { "kind": "tap", "at_ms": 1000 }
//! ]
//! ```

use super::engine::{GestureEngine, GestureEvent, TouchPoint};
use super::transform::Transform;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScriptStep {
    Start { points: Vec<[f64; 2]> },
    Move { points: Vec<[f64; 2]> },
    End,
    Tap { at_ms: u64 },
}

fn touch_points(points: &[[f64; 2]]) -> Vec<TouchPoint> {
    points
        .iter()
        .enumerate()
        .map(|(i, [x, y])| TouchPoint::new(i as u64, *x, *y))
        .collect()
}

impl From<&ScriptStep> for GestureEvent {
    fn from(step: &ScriptStep) -> Self {
        match step {
            ScriptStep::Start { points } => GestureEvent::Start(touch_points(points)),
            ScriptStep::Move { points } => GestureEvent::Move(touch_points(points)),
            ScriptStep::End => GestureEvent::End,
            ScriptStep::Tap { at_ms } => GestureEvent::Tap(Duration::from_millis(*at_ms)),
        }
    }
}

pub fn parse_script(json: &str) -> Result<Vec<ScriptStep>, serde_json::Error> {
    serde_json::from_str(json)
}

/// Feed every step to `engine`, returning the transform after each one.
pub fn replay(engine: &mut GestureEngine, steps: &[ScriptStep]) -> Vec<Transform> {
    steps
        .iter()
        .map(|step| engine.handle(&GestureEvent::from(step)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PINCH_THEN_DOUBLE_TAP: &str = r#"[
        { "kind": "start", "points": [[0, 0], [100, 0]] },
        { "kind": "move",  "points": [[0, 0], [200, 0]] },
        { "kind": "move",  "points": [[0, 0], [600, 0]] },
        { "kind": "end" },
        { "kind": "tap", "at_ms": 1000 },
        { "kind": "tap", "at_ms": 1250 }
    ]"#;

    #[test]
    fn parse_reads_all_step_kinds() {
        let steps = parse_script(PINCH_THEN_DOUBLE_TAP).unwrap();
        assert_eq!(steps.len(), 6);
        assert_eq!(steps[3], ScriptStep::End);
        assert_eq!(steps[5], ScriptStep::Tap { at_ms: 1250 });
    }

    #[test]
    fn parse_rejects_unknown_kind() {
        assert!(parse_script(r#"[{ "kind": "swipe" }]"#).is_err());
    }

    #[test]
    fn replay_reports_transform_per_step() {
        let steps = parse_script(PINCH_THEN_DOUBLE_TAP).unwrap();
        let mut engine = GestureEngine::default();

        let scales: Vec<f64> = replay(&mut engine, &steps)
            .iter()
            .map(Transform::scale)
            .collect();

        assert_eq!(scales, vec![1.0, 2.0, 5.0, 5.0, 5.0, 1.0]);
    }
}
