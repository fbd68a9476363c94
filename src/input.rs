//! Input synthesis: where to point and which keys to press
//!
//! The host page only reacts to real-looking DOM events, so the paddle is
//! steered by faking the cursor. This module holds the pure parts (coordinate
//! mapping, key tables); the platform layer dispatches the events.

use crate::consts::{POINTER_BOTTOM_OFFSET, RELEASE_BOTTOM_OFFSET};

/// Keys the mini-game listens for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// Serve / launch
    Space,
    ArrowLeft,
    ArrowRight,
}

impl Key {
    /// `KeyboardEvent.key`
    pub fn key(&self) -> &'static str {
        match self {
            Key::Space => " ",
            Key::ArrowLeft => "ArrowLeft",
            Key::ArrowRight => "ArrowRight",
        }
    }

    /// `KeyboardEvent.code`
    pub fn code(&self) -> &'static str {
        match self {
            Key::Space => "Space",
            Key::ArrowLeft => "ArrowLeft",
            Key::ArrowRight => "ArrowRight",
        }
    }

    /// Legacy `keyCode` / `which`
    pub fn key_code(&self) -> u32 {
        match self {
            Key::Space => 32,
            Key::ArrowLeft => 37,
            Key::ArrowRight => 39,
        }
    }
}

/// Canvas bounding rectangle in client (viewport) coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CanvasRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

/// A point in client coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClientPoint {
    pub x: f64,
    pub y: f64,
}

/// Map a canvas-space x to the client point the pointer should sit at.
///
/// Accounts for CSS scaling between the canvas's intrinsic width and its
/// displayed width; a zero intrinsic width is treated as unscaled.
pub fn pointer_target(canvas_x: f32, rect: &CanvasRect, intrinsic_width: u32) -> ClientPoint {
    let scale = if intrinsic_width > 0 {
        rect.width / intrinsic_width as f64
    } else {
        1.0
    };
    ClientPoint {
        x: rect.left + canvas_x as f64 * scale,
        y: rect.top + rect.height - POINTER_BOTTOM_OFFSET,
    }
}

/// Where to press to release an idle ball: bottom-center of the canvas
pub fn release_point(rect: &CanvasRect) -> ClientPoint {
    ClientPoint {
        x: rect.left + rect.width / 2.0,
        y: rect.top + rect.height - RELEASE_BOTTOM_OFFSET,
    }
}

/// Side-effecting input surface. Events go into the page's own handlers,
/// which cannot be observed synchronously, hence no return values.
pub trait InputSynth {
    /// Move the paddle so its center sits at canvas-space `target_x`
    fn move_paddle(&mut self, target_x: f32);
    /// Dispatch a keydown for `key`
    fn press_key(&mut self, key: Key);
    /// Pointer-down near the bottom-center, then a Space keydown
    fn release_ball(&mut self);
}
