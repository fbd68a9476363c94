//! Control loop working memory
//!
//! Everything the loop remembers between frames lives here, owned by the
//! `Pilot`. Reset wholesale on start, stop, and at each new round.

use rand::SeedableRng;
use rand_pcg::Pcg32;

use crate::vision::{PaddleSpan, Sample};

/// Where the loop is in its state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PilotPhase {
    /// Not running
    Idle,
    /// No round active; may press start
    WaitingForRound,
    /// Ball visible, paddle following it
    TrackingBall,
    /// No ball visible, paddle sweeping
    ScanningNoBall,
    /// Authoritative state reports the ball parked on the paddle
    BallStuck,
    /// Ball lost or wedged; a rescue fired this frame
    RescuePending,
}

/// Per-session temporal bookkeeping
#[derive(Debug, Clone)]
pub struct ControlState {
    /// Second most recent ball sample
    pub prev_ball: Option<Sample>,
    /// Most recent ball sample
    pub curr_ball: Option<Sample>,
    pub paddle_span: Option<PaddleSpan>,
    /// Mean x of the brick region
    pub brick_target_x: Option<f32>,

    pub last_sample_at: Option<f64>,
    pub last_region_at: Option<f64>,
    /// Last time a ball sample was obtained
    pub last_seen_at: Option<f64>,
    /// Last time the ball moved more than the stationary epsilon
    pub last_moved_at: Option<f64>,
    /// When the authoritative state first reported the ball stuck
    pub stuck_since: Option<f64>,
    pub last_rescue_at: Option<f64>,
    /// When the current round was first seen playing
    pub tracking_since: Option<f64>,
    /// Deadline for the delayed launch key after a start click
    pub pending_launch_at: Option<f64>,

    /// Scan-mode paddle position and direction (+1 / -1)
    pub scan_x: f32,
    pub scan_dir: f32,

    pub jitter: f32,
    pub last_jitter_at: Option<f64>,

    /// Frames processed, for throttled logging
    pub frame: u64,
    /// Jitter source
    pub rng: Pcg32,
}

impl ControlState {
    pub fn new(seed: u64) -> Self {
        Self {
            prev_ball: None,
            curr_ball: None,
            paddle_span: None,
            brick_target_x: None,
            last_sample_at: None,
            last_region_at: None,
            last_seen_at: None,
            last_moved_at: None,
            stuck_since: None,
            last_rescue_at: None,
            tracking_since: None,
            pending_launch_at: None,
            scan_x: 0.0,
            scan_dir: 1.0,
            jitter: 0.0,
            last_jitter_at: None,
            frame: 0,
            rng: Pcg32::seed_from_u64(seed),
        }
    }

    /// Forget everything tied to the current round. The frame counter and
    /// RNG stream carry over.
    pub fn reset_round(&mut self, canvas_width: f32) {
        let frame = self.frame;
        let rng = self.rng.clone();
        *self = Self {
            frame,
            rng,
            scan_x: canvas_width / 2.0,
            ..Self::new(0)
        };
    }

    /// True if `last` is unset or at least `interval` ago
    #[inline]
    pub fn due(last: Option<f64>, now_ms: f64, interval_ms: f64) -> bool {
        last.is_none_or(|t| now_ms - t >= interval_ms)
    }
}
