//! Brick Autopilot - paddle control for a canvas brick-breaker mini-game
//!
//! Core modules:
//! - `vision`: Pixel sampling (ball centroid, paddle span, brick region)
//! - `predict`: Straight-line intercept prediction with wall folding
//! - `sim`: Authoritative game-state snapshot and step-wise trajectory simulation
//! - `input`: Canvas-to-client mapping and synthetic key tables
//! - `classify`: Play-state classification from UI control visibility
//! - `pilot`: The per-frame control loop and its state machine
//! - `platform`: Host abstraction (browser binding on wasm32)

pub mod classify;
pub mod input;
pub mod pilot;
pub mod platform;
pub mod predict;
pub mod settings;
pub mod sim;
pub mod stats;
pub mod vision;

pub use pilot::{Directive, Pilot, PilotPhase};
pub use settings::{PilotConfig, Timing};
pub use stats::SessionStats;
pub use vision::{PaddleSpan, Sample};

/// Detection and control constants
pub mod consts {
    /// Minimum alpha for a pixel to count as drawn
    pub const OPAQUE_ALPHA: u8 = 200;

    /// Ball pixels: every channel at or above this value
    pub const BALL_THRESHOLD: u8 = 240;
    /// Pixel stride for the ball scan (both axes)
    pub const BALL_STRIDE: usize = 2;
    /// Rows excluded at the bottom of the ball scan (paddle lives there)
    pub const BALL_BOTTOM_MARGIN: u32 = 25;
    /// Largest bounding box extent accepted as a ball, per axis
    pub const BALL_MAX_EXTENT: f32 = 40.0;

    /// Paddle pixels: every channel strictly above this value
    pub const PADDLE_THRESHOLD: u8 = 220;
    /// Height of the bottom strip scanned for the paddle
    pub const PADDLE_STRIP_HEIGHT: u32 = 30;
    /// Paddle width assumed before the first span is measured
    pub const DEFAULT_PADDLE_WIDTH: f32 = 100.0;

    /// Fraction of the canvas height scanned for bricks (from the top)
    pub const BRICK_REGION_FRACTION: f32 = 0.45;
    pub const BRICK_STRIDE: usize = 4;
    pub const BRICK_MIN_ALPHA: u8 = 80;
    pub const BRICK_MIN_BRIGHTNESS: f32 = 60.0;
    pub const BRICK_MAX_BRIGHTNESS: f32 = 240.0;
    /// Matches needed before the brick region is trusted
    pub const BRICK_MIN_MATCHES: usize = 20;

    /// Scan mode reverses this far from each edge
    pub const SCAN_EDGE_MARGIN: f32 = 60.0;

    /// Pointer y offset above the canvas bottom (client px)
    pub const POINTER_BOTTOM_OFFSET: f64 = 50.0;
    /// Pointer-down for ball release, above the canvas bottom (client px)
    pub const RELEASE_BOTTOM_OFFSET: f64 = 30.0;

    /// Jitter is only re-rolled once the ball is below this fraction of the height
    pub const JITTER_ZONE_FRACTION: f32 = 0.55;
    /// Minimum interval between jitter re-rolls (ms)
    pub const JITTER_REROLL_MS: f64 = 250.0;
    /// Minimum jitter range (px)
    pub const JITTER_MIN_RANGE: f32 = 10.0;
    /// Combined jitter and bias offset stays within this fraction of the paddle width
    pub const SAFE_OFFSET_FRACTION: f32 = 0.45;

    /// A ball below `height - WEDGE_ZONE` counts as near the bottom edge
    pub const WEDGE_ZONE: f32 = 60.0;
    /// Movement smaller than this between samples counts as stationary (px)
    pub const MOVE_EPSILON: f32 = 2.0;

    /// Log throttling period (frames)
    pub const LOG_EVERY_FRAMES: u64 = 60;
}

/// Reflect `x` back into `[lo, hi]` as if it bounced elastically off both ends.
///
/// Handles any number of bounces by folding modulo twice the range width.
/// Degenerate ranges collapse to `lo`; non-finite input is clamped.
#[inline]
pub fn fold_between(x: f32, lo: f32, hi: f32) -> f32 {
    let span = hi - lo;
    if !(span > 0.0) || !span.is_finite() {
        return lo;
    }
    if !x.is_finite() {
        return if x > 0.0 { hi } else { lo };
    }
    let m = (x - lo).rem_euclid(2.0 * span);
    if m > span { lo + 2.0 * span - m } else { lo + m }
}

/// Clamp to `[lo, hi]`, mapping NaN to `lo`
#[inline]
pub fn clamp_finite(x: f32, lo: f32, hi: f32) -> f32 {
    if x.is_nan() { lo } else { x.max(lo).min(hi) }
}
