//! Authoritative-state simulation
//!
//! Everything here works on the optional JSON snapshot the page may expose.
//! This module must stay pure:
//! - No DOM or platform dependencies
//! - Stable iteration order (brick list order)
//! - Read-only access to the snapshot

pub mod collision;
pub mod state;
pub mod trace;

pub use collision::{circle_overlaps_rect, paddle_rebound, reflect_velocity};
pub use state::{BallSnapshot, Brick, BrickKind, GameState, PaddleSnapshot};
pub use trace::{ShotPlan, best_paddle_center, choose_target_brick, intercept_x, plan_shot, trace_rebound};
