//! Authoritative game-state snapshot
//!
//! Some pages expose the mini-game's own state as JSON. When present it is
//! strictly better than pixel inference. All coordinates are canvas pixels.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::vision::{PaddleSpan, PositionSource, Sample};

/// Ball as reported by the game
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BallSnapshot {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub vx: f32,
    #[serde(default)]
    pub vy: f32,
    #[serde(default = "default_ball_radius")]
    pub r: f32,
    /// Ball parked on the paddle waiting to be served
    #[serde(default)]
    pub stuck: bool,
}

fn default_ball_radius() -> f32 {
    6.0
}

impl BallSnapshot {
    #[inline]
    pub fn pos(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    #[inline]
    pub fn vel(&self) -> Vec2 {
        Vec2::new(self.vx, self.vy)
    }
}

/// Paddle as reported by the game. `x` is the left edge, `y` the top edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PaddleSnapshot {
    pub x: f32,
    pub w: f32,
    pub y: f32,
}

impl PaddleSnapshot {
    #[inline]
    pub fn center_x(&self) -> f32 {
        self.x + self.w / 2.0
    }

    #[inline]
    pub fn half_width(&self) -> f32 {
        self.w / 2.0
    }
}

/// Brick types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrickKind {
    /// Breaking it grants a key
    Key,
    /// Opens only with a key
    Chest,
    /// Plain brick; also any type we do not recognise
    #[default]
    #[serde(other)]
    Normal,
}

/// A brick rectangle (top-left origin)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Brick {
    pub idx: u32,
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
    #[serde(default = "default_alive")]
    pub alive: bool,
    #[serde(rename = "t", default)]
    pub kind: BrickKind,
}

fn default_alive() -> bool {
    true
}

impl Brick {
    #[inline]
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.w / 2.0, self.y + self.h / 2.0)
    }

    #[inline]
    pub fn min(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    #[inline]
    pub fn max(&self) -> Vec2 {
        Vec2::new(self.x + self.w, self.y + self.h)
    }
}

/// Full snapshot, read-only
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    pub ball: BallSnapshot,
    pub paddle: PaddleSnapshot,
    #[serde(default)]
    pub bricks: Vec<Brick>,
    /// Keys currently held (spent on chests)
    #[serde(default)]
    pub keys: u32,
}

impl GameState {
    /// Parse a snapshot, returning `None` on malformed JSON
    pub fn from_json(json: &str) -> Option<Self> {
        match serde_json::from_str(json) {
            Ok(state) => Some(state),
            Err(e) => {
                log::debug!("Ignoring malformed game state: {}", e);
                None
            }
        }
    }

    /// Alive bricks in stable order
    pub fn alive_bricks(&self) -> impl Iterator<Item = &Brick> {
        self.bricks.iter().filter(|b| b.alive)
    }
}

impl PositionSource for GameState {
    fn ball(&self, captured_at_ms: f64) -> Option<Sample> {
        let ball = &self.ball;
        (ball.x.is_finite() && ball.y.is_finite()).then_some(Sample {
            x: ball.x,
            y: ball.y,
            captured_at_ms,
        })
    }

    fn paddle(&self) -> Option<PaddleSpan> {
        let p = &self.paddle;
        (p.w > 0.0 && p.x.is_finite()).then(|| PaddleSpan::new(p.x, p.x + p.w))
    }
}
