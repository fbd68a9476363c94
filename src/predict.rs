//! Straight-line intercept prediction from two ball samples
//!
//! The pixel path only ever sees positions, so velocity comes from the
//! difference of two timestamped samples. Wall bounces are modelled by
//! folding the projected x back into the canvas.

use crate::fold_between;
use crate::vision::Sample;

/// Estimated ball velocity in px/ms
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Velocity {
    pub vx: f32,
    pub vy: f32,
}

/// Velocity between two samples, `None` if time did not advance
pub fn estimate_velocity(prev: &Sample, curr: &Sample) -> Option<Velocity> {
    let dt = (curr.captured_at_ms - prev.captured_at_ms) as f32;
    if !(dt > 0.0) {
        return None;
    }
    let velocity = Velocity {
        vx: (curr.x - prev.x) / dt,
        vy: (curr.y - prev.y) / dt,
    };
    (velocity.vx.is_finite() && velocity.vy.is_finite()).then_some(velocity)
}

/// Predict where the ball crosses `paddle_y`, folded into `[0, width]`.
///
/// Falls back to the current x whenever prediction is meaningless: time did
/// not advance, the ball is rising, or it is already at the paddle line.
pub fn predict_ball_x(prev: &Sample, curr: &Sample, paddle_y: f32, width: f32) -> f32 {
    let fallback = fold_between(curr.x, 0.0, width);

    let Some(Velocity { vx, vy }) = estimate_velocity(prev, curr) else {
        return fallback;
    };
    if !(vy > 0.0) {
        return fallback;
    }
    let remaining = paddle_y - curr.y;
    if !(remaining > 0.0) {
        return fallback;
    }

    let t = remaining / vy;
    let raw_x = curr.x + vx * t;
    fold_between(raw_x, 0.0, width)
}
