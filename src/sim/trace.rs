//! Step-wise trajectory tracing against the authoritative snapshot
//!
//! Given real velocities we can do better than tracking: walk the rebound
//! off the paddle through wall and ceiling bounces until it meets a brick,
//! and pick the paddle placement that sends the ball where we want it.

use glam::Vec2;

use super::collision::{circle_overlaps_rect, paddle_rebound, reflect_velocity};
use super::state::{BallSnapshot, Brick, BrickKind, GameState};
use crate::{clamp_finite, fold_between};

/// Distance the ball advances per trace step (px)
pub const TRACE_STEP: f32 = 2.0;
/// Trace gives up after this many steps
pub const MAX_TRACE_STEPS: usize = 2000;
/// Spacing of candidate paddle offsets (px)
pub const OFFSET_STEP: f32 = 4.0;
/// Fraction of the paddle half-width usable as contact offset
pub const OFFSET_REACH: f32 = 0.9;

/// Where the paddle should go this frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShotPlan {
    /// Target x for the paddle center (canvas px)
    pub paddle_x: f32,
    /// Ball center x when it reaches the paddle, if it is descending
    pub contact_x: Option<f32>,
    /// Brick the rebound is steered toward
    pub target: Option<u32>,
}

/// Ball center x when it descends to `contact_y`, folding off both walls.
///
/// `None` unless the ball is moving down and still above the line.
pub fn intercept_x(ball: &BallSnapshot, contact_y: f32, width: f32) -> Option<f32> {
    if !(ball.vy > 0.0) {
        return None;
    }
    let remaining = contact_y - ball.y;
    if !(remaining > 0.0) {
        return None;
    }
    let t = remaining / ball.vy;
    let raw_x = ball.x + ball.vx * t;
    let margin = ball.r.clamp(0.0, width / 2.0);
    Some(fold_between(raw_x, margin, width - margin))
}

/// Walk the ball from `start` along `velocity` and return the first alive
/// brick it touches. Reflects off the side walls and the ceiling; gives up
/// once the ball falls back below its starting line.
pub fn trace_rebound(
    start: Vec2,
    velocity: Vec2,
    radius: f32,
    bricks: &[Brick],
    width: f32,
) -> Option<u32> {
    let speed = velocity.length();
    if !(speed > 0.0) || !speed.is_finite() || !(width > 2.0 * radius) {
        return None;
    }

    let mut pos = start;
    let mut dir = velocity / speed;

    for _ in 0..MAX_TRACE_STEPS {
        pos += dir * TRACE_STEP;

        if pos.x < radius {
            pos.x = radius;
            dir = reflect_velocity(dir, Vec2::X);
        } else if pos.x > width - radius {
            pos.x = width - radius;
            dir = reflect_velocity(dir, Vec2::NEG_X);
        }
        if pos.y < radius {
            pos.y = radius;
            dir = reflect_velocity(dir, Vec2::Y);
        }
        if dir.y > 0.0 && pos.y > start.y {
            return None;
        }

        if let Some(brick) = bricks
            .iter()
            .filter(|b| b.alive)
            .find(|b| circle_overlaps_rect(pos, radius, b.min(), b.max()))
        {
            return Some(brick.idx);
        }
    }

    None
}

/// Brick worth aiming at: a chest while holding a key, else a key brick,
/// else any brick. Within a kind, the one nearest the paddle.
pub fn choose_target_brick(state: &GameState) -> Option<&Brick> {
    let paddle_point = Vec2::new(state.paddle.center_x(), state.paddle.y);
    let nearest = |kind: BrickKind| {
        state
            .alive_bricks()
            .filter(|b| b.kind == kind)
            .min_by(|a, b| {
                let da = a.center().distance_squared(paddle_point);
                let db = b.center().distance_squared(paddle_point);
                da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
            })
    };

    let priority: &[BrickKind] = if state.keys > 0 {
        &[BrickKind::Chest, BrickKind::Key, BrickKind::Normal]
    } else {
        &[BrickKind::Key, BrickKind::Normal]
    };
    priority.iter().find_map(|&kind| nearest(kind))
}

/// Paddle center that makes the rebound from `contact_x` hit `target`.
///
/// Candidate offsets are scanned at [`OFFSET_STEP`]; among the hits, the
/// center closest to the ball's current x wins (earliest offset on ties).
pub fn best_paddle_center(state: &GameState, contact_x: f32, target: u32, width: f32) -> Option<f32> {
    let ball = &state.ball;
    let half = state.paddle.half_width();
    if !(half > 0.0) {
        return None;
    }

    let contact_y = state.paddle.y - ball.r;
    let start = Vec2::new(contact_x, contact_y);
    let reach = half * OFFSET_REACH;
    let steps = (2.0 * reach / OFFSET_STEP).floor() as i32;

    let mut best: Option<(f32, f32)> = None;
    for i in 0..=steps {
        let offset = -reach + i as f32 * OFFSET_STEP;
        let center = contact_x - offset;
        let outgoing = paddle_rebound(ball.vel(), contact_x, center, half);
        if trace_rebound(start, outgoing, ball.r, &state.bricks, width) != Some(target) {
            continue;
        }
        let distance = (center - ball.x).abs();
        if best.is_none_or(|(d, _)| distance < d) {
            best = Some((distance, center));
        }
    }

    best.map(|(_, center)| center)
}

/// Decide where the paddle goes from an authoritative snapshot
pub fn plan_shot(state: &GameState, width: f32) -> ShotPlan {
    let ball = &state.ball;
    let contact_y = state.paddle.y - ball.r;

    let Some(contact_x) = intercept_x(ball, contact_y, width) else {
        return ShotPlan {
            paddle_x: clamp_finite(ball.x, 0.0, width),
            contact_x: None,
            target: None,
        };
    };

    let steered = choose_target_brick(state).and_then(|brick| {
        best_paddle_center(state, contact_x, brick.idx, width).map(|center| (center, brick.idx))
    });

    match steered {
        Some((center, idx)) => ShotPlan {
            paddle_x: clamp_finite(center, 0.0, width),
            contact_x: Some(contact_x),
            target: Some(idx),
        },
        None => ShotPlan {
            paddle_x: contact_x,
            contact_x: Some(contact_x),
            target: None,
        },
    }
}
