//! Collision detection and response for the rectangular playfield
//!
//! Circle-vs-rectangle overlap for bricks, wall reflection, and the paddle
//! rebound rule where contact position sets the outgoing angle.

use glam::Vec2;

/// Largest rebound angle from vertical, reached at the paddle tips
pub const MAX_REBOUND_ANGLE: f32 = std::f32::consts::FRAC_PI_3;

/// Whether a circle touches an axis-aligned rectangle (edges included)
pub fn circle_overlaps_rect(center: Vec2, radius: f32, min: Vec2, max: Vec2) -> bool {
    center.distance_squared(center.clamp(min, max)) <= radius * radius
}

/// Reflect velocity off a surface
///
/// Standard reflection: v' = v - 2(v·n)n
#[inline]
pub fn reflect_velocity(velocity: Vec2, normal: Vec2) -> Vec2 {
    velocity - 2.0 * velocity.dot(normal) * normal
}

/// Outgoing velocity after the ball meets the paddle.
///
/// Speed is preserved; the angle from vertical scales with how far from the
/// paddle center the ball lands, up to [`MAX_REBOUND_ANGLE`] at the tips.
pub fn paddle_rebound(velocity: Vec2, contact_x: f32, paddle_center: f32, half_width: f32) -> Vec2 {
    let speed = velocity.length();
    let rel = if half_width > 0.0 {
        ((contact_x - paddle_center) / half_width).clamp(-1.0, 1.0)
    } else {
        0.0
    };
    let angle = rel * MAX_REBOUND_ANGLE;
    Vec2::new(speed * angle.sin(), -speed * angle.cos())
}
