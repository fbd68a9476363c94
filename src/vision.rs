//! Frame sampling: locate the ball and paddle in raw canvas pixels
//!
//! The canvas is opaque to us, so everything is inferred from RGBA bytes.
//! The ball is the only compact bright blob above the paddle strip; the
//! paddle is whatever bright run sits in the bottom strip.

use serde::{Deserialize, Serialize};

use crate::consts::*;

/// One observed ball position
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub x: f32,
    pub y: f32,
    /// Monotonic clock reading when the frame was captured (ms)
    pub captured_at_ms: f64,
}

/// Horizontal extent of the paddle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PaddleSpan {
    pub min_x: f32,
    pub max_x: f32,
    pub width: f32,
}

impl PaddleSpan {
    pub fn new(min_x: f32, max_x: f32) -> Self {
        Self {
            min_x,
            max_x,
            width: max_x - min_x,
        }
    }

    #[inline]
    pub fn center(&self) -> f32 {
        (self.min_x + self.max_x) / 2.0
    }
}

/// Anything that can report where the ball and paddle are.
///
/// Implemented by raw pixel frames and by the authoritative game-state
/// snapshot, so the control loop never cares where a position came from.
pub trait PositionSource {
    fn ball(&self, captured_at_ms: f64) -> Option<Sample>;
    fn paddle(&self) -> Option<PaddleSpan>;
}

/// Borrowed RGBA canvas bitmap (row-major, 4 bytes per pixel)
#[derive(Debug, Clone, Copy)]
pub struct PixelFrame<'a> {
    data: &'a [u8],
    width: u32,
    height: u32,
}

impl<'a> PixelFrame<'a> {
    /// Wrap a pixel buffer. Returns `None` for zero dimensions or a buffer
    /// too short for the stated size.
    pub fn new(data: &'a [u8], width: u32, height: u32) -> Option<Self> {
        if width == 0 || height == 0 {
            return None;
        }
        let needed = (width as usize)
            .checked_mul(height as usize)?
            .checked_mul(4)?;
        if data.len() < needed {
            return None;
        }
        Some(Self {
            data,
            width,
            height,
        })
    }

    #[inline]
    fn rgba(&self, x: usize, y: usize) -> (u8, u8, u8, u8) {
        let idx = (y * self.width as usize + x) * 4;
        let p = &self.data[idx..idx + 4];
        (p[0], p[1], p[2], p[3])
    }
}

impl PositionSource for PixelFrame<'_> {
    fn ball(&self, captured_at_ms: f64) -> Option<Sample> {
        detect_ball(self, captured_at_ms)
    }

    fn paddle(&self) -> Option<PaddleSpan> {
        detect_paddle_span(self)
    }
}

#[inline]
fn is_ball_pixel((r, g, b, a): (u8, u8, u8, u8)) -> bool {
    a > OPAQUE_ALPHA && r >= BALL_THRESHOLD && g >= BALL_THRESHOLD && b >= BALL_THRESHOLD
}

#[inline]
fn is_paddle_pixel((r, g, b, a): (u8, u8, u8, u8)) -> bool {
    a > OPAQUE_ALPHA && r > PADDLE_THRESHOLD && g > PADDLE_THRESHOLD && b > PADDLE_THRESHOLD
}

/// Find the ball as the centroid of bright pixels above the paddle strip.
///
/// Rejects blobs whose bounding box exceeds [`BALL_MAX_EXTENT`] on either
/// axis (bright UI chrome or text rather than a ball).
pub fn detect_ball(frame: &PixelFrame, captured_at_ms: f64) -> Option<Sample> {
    let width = frame.width as usize;
    let y_limit = frame.height.saturating_sub(BALL_BOTTOM_MARGIN) as usize;

    let mut sum_x = 0u64;
    let mut sum_y = 0u64;
    let mut count = 0u64;
    let (mut min_x, mut max_x) = (usize::MAX, 0usize);
    let (mut min_y, mut max_y) = (usize::MAX, 0usize);

    for y in (0..y_limit).step_by(BALL_STRIDE) {
        for x in (0..width).step_by(BALL_STRIDE) {
            if !is_ball_pixel(frame.rgba(x, y)) {
                continue;
            }
            sum_x += x as u64;
            sum_y += y as u64;
            count += 1;
            min_x = min_x.min(x);
            max_x = max_x.max(x);
            min_y = min_y.min(y);
            max_y = max_y.max(y);
        }
    }

    if count == 0 {
        return None;
    }
    if (max_x - min_x) as f32 > BALL_MAX_EXTENT || (max_y - min_y) as f32 > BALL_MAX_EXTENT {
        return None;
    }

    Some(Sample {
        x: sum_x as f32 / count as f32,
        y: sum_y as f32 / count as f32,
        captured_at_ms,
    })
}

/// Measure the paddle's horizontal extent in the bottom strip
pub fn detect_paddle_span(frame: &PixelFrame) -> Option<PaddleSpan> {
    let width = frame.width as usize;
    let height = frame.height as usize;
    let y_start = frame.height.saturating_sub(PADDLE_STRIP_HEIGHT) as usize;

    let (mut min_x, mut max_x) = (usize::MAX, 0usize);
    let mut count = 0usize;

    for y in y_start..height {
        for x in 0..width {
            if is_paddle_pixel(frame.rgba(x, y)) {
                count += 1;
                min_x = min_x.min(x);
                max_x = max_x.max(x);
            }
        }
    }

    if count == 0 || min_x >= max_x {
        return None;
    }
    Some(PaddleSpan::new(min_x as f32, max_x as f32))
}

/// Mean x of mid-brightness pixels in the top of the canvas, where the
/// bricks live. Used to bias the paddle toward the remaining bricks.
pub fn detect_brick_target_x(frame: &PixelFrame) -> Option<f32> {
    let width = frame.width as usize;
    let y_limit = ((frame.height as f32 * BRICK_REGION_FRACTION).floor() as usize).max(1);

    let mut sum_x = 0u64;
    let mut count = 0usize;

    for y in (0..y_limit).step_by(BRICK_STRIDE) {
        for x in (0..width).step_by(BRICK_STRIDE) {
            let (r, g, b, a) = frame.rgba(x, y);
            if a < BRICK_MIN_ALPHA {
                continue;
            }
            let brightness = (r as f32 + g as f32 + b as f32) / 3.0;
            if brightness > BRICK_MIN_BRIGHTNESS && brightness < BRICK_MAX_BRIGHTNESS {
                sum_x += x as u64;
                count += 1;
            }
        }
    }

    if count < BRICK_MIN_MATCHES {
        return None;
    }
    Some(sum_x as f32 / count as f32)
}
