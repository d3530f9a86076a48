//! The viewing transform applied to a displayed image.
//!
//! A [`Transform`] is a zoom scale plus a pan offset. Its fields are private so
//! every value that escapes this module satisfies two invariants:
//!
//! - `MIN_SCALE <= scale <= max_scale` (producers clamp before publishing)
//! - `scale == MIN_SCALE` implies `pan == (0, 0)`
//!
//! The pan offset is not bounded; the view is expected to clip overflow.

use cgmath::{Matrix3, Point2, Vector2, Zero};

/// Unity zoom. Not configurable: the recentering rules are defined against it.
pub const MIN_SCALE: f64 = 1.0;

/// Default upper zoom bound.
pub const DEFAULT_MAX_SCALE: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    scale: f64,
    pan: Vector2<f64>,
}

impl Transform {
    /// Unity scale, no pan.
    pub fn identity() -> Self {
        Self {
            scale: MIN_SCALE,
            pan: Vector2::zero(),
        }
    }

    /// Build a transform, clamping `scale` into `[MIN_SCALE, max_scale]`.
    ///
    /// A scale that lands on unity drops the pan.
    pub fn clamped(scale: f64, pan: Vector2<f64>, max_scale: f64) -> Self {
        let scale = if scale.is_nan() {
            MIN_SCALE
        } else {
            scale.clamp(MIN_SCALE, max_scale)
        };
        if scale == MIN_SCALE {
            Self::identity()
        } else {
            Self { scale, pan }
        }
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn pan(&self) -> Vector2<f64> {
        self.pan
    }

    pub fn is_zoomed(&self) -> bool {
        self.scale > MIN_SCALE
    }

    /// Same scale, different pan. Ignored at unity scale.
    pub fn with_pan(self, pan: Vector2<f64>) -> Self {
        if self.is_zoomed() {
            Self { pan, ..self }
        } else {
            self
        }
    }

    /// Homogeneous 2D matrix: scale about the origin, then translate by the pan.
    pub fn matrix(&self) -> Matrix3<f64> {
        let s = self.scale;
        #[rustfmt::skip]
        let m = Matrix3::new(
            s,          0.0,        0.0,
            0.0,        s,          0.0,
            self.pan.x, self.pan.y, 1.0,
        );
        m
    }

    /// Map a point in image space to view space.
    pub fn apply(&self, point: Point2<f64>) -> Point2<f64> {
        Point2::new(
            point.x * self.scale + self.pan.x,
            point.y * self.scale + self.pan.y,
        )
    }

    /// CSS `transform` value for web views.
    pub fn to_css(&self) -> String {
        format!(
            "translate({}px, {}px) scale({})",
            self.pan.x, self.pan.y, self.scale
        )
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}
