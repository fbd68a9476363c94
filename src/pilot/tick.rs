//! One control-loop iteration per animation frame
//!
//! Order each frame: stop conditions, canvas, delayed launch, play state,
//! then (only while a round runs) sampling, recovery and steering.

use rand::Rng;

use super::state::{ControlState, PilotPhase};
use super::{Directive, Status, StopReason};
use crate::classify::{ElementView, PlayStateClassifier, RoundPhase};
use crate::consts::*;
use crate::input::Key;
use crate::platform::{Control, FrameId, Host, Readout};
use crate::predict::predict_ball_x;
use crate::settings::PilotConfig;
use crate::sim::{GameState, plan_shot};
use crate::stats::{SessionStats, parse_balance, parse_counter};
use crate::vision::{PixelFrame, PositionSource, Sample, detect_brick_target_x};
use crate::{clamp_finite, fold_between};

/// The autopilot: owns configuration, bookkeeping and session stats
#[derive(Debug)]
pub struct Pilot {
    config: PilotConfig,
    state: ControlState,
    classifier: PlayStateClassifier,
    stats: SessionStats,
    phase: PilotPhase,
    running: bool,
    pending_frame: Option<FrameId>,
    /// Canvas size as of the last frame that found one
    canvas: Option<(u32, u32)>,
    last_status: Option<Status>,
    seed: u64,
}

impl Pilot {
    pub fn new(config: PilotConfig, seed: u64) -> Self {
        let config = config.sanitized();
        Self {
            classifier: PlayStateClassifier::new(config.timing.start_cooldown_ms),
            config,
            state: ControlState::new(seed),
            stats: SessionStats::default(),
            phase: PilotPhase::Idle,
            running: false,
            pending_frame: None,
            canvas: None,
            last_status: None,
            seed,
        }
    }

    pub fn config(&self) -> &PilotConfig {
        &self.config
    }

    /// Swap in new settings; takes effect on the next tick
    pub fn set_config(&mut self, config: PilotConfig) {
        self.config = config.sanitized();
        self.classifier
            .set_start_cooldown(self.config.timing.start_cooldown_ms);
    }

    pub fn state(&self) -> &ControlState {
        &self.state
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn phase(&self) -> PilotPhase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Begin a new session. Does nothing if already running.
    pub fn start<H: Host>(&mut self, host: &mut H) {
        if self.running {
            return;
        }
        self.running = true;
        self.phase = PilotPhase::WaitingForRound;
        self.stats = SessionStats::default();
        self.classifier = PlayStateClassifier::new(self.config.timing.start_cooldown_ms);
        self.state = ControlState::new(self.seed);
        self.last_status = None;
        self.canvas = None;

        match host.canvas_size() {
            Some(size) => self.canvas_found(size),
            None => log::warn!("Canvas not found, will keep looking"),
        }

        log::info!("Autopilot started");
        host.stats_changed(&self.stats);
    }

    /// Stop the session and cancel the scheduled frame.
    ///
    /// Returns false if the pilot was not running.
    pub fn stop<H: Host>(&mut self, host: &mut H, reason: StopReason) -> bool {
        if !self.running {
            return false;
        }
        self.running = false;
        self.phase = PilotPhase::Idle;
        if let Some(id) = self.pending_frame.take() {
            host.cancel_frame(id);
        }
        self.state.reset_round(0.0);

        log::info!("Autopilot stopped: {}", reason);
        let status = Status::Stopped(reason);
        host.report(&status);
        self.last_status = Some(status);
        true
    }

    /// The host scheduled the next frame under `id`
    pub fn frame_scheduled(&mut self, id: FrameId) {
        self.pending_frame = Some(id);
    }

    /// Run one iteration
    pub fn tick<H: Host>(&mut self, host: &mut H, now_ms: f64) -> Directive {
        // The frame we were scheduled under is the one running now
        self.pending_frame = None;

        if !self.running {
            return Directive::Halt;
        }

        if let Some(reason) = self.stop_condition(host, now_ms) {
            self.stop(host, reason);
            return Directive::Halt;
        }

        let log_now = self.state.frame % LOG_EVERY_FRAMES == 0;
        self.state.frame += 1;

        let Some((width, height)) = host.canvas_size().filter(|&(w, h)| w > 0 && h > 0) else {
            if log_now {
                log::warn!("Canvas not found");
            }
            self.set_status(host, Status::WaitingForCanvas);
            return Directive::Continue;
        };
        if self.canvas != Some((width, height)) {
            self.canvas_found((width, height));
        }

        if let Some(at) = self.state.pending_launch_at {
            if now_ms >= at {
                self.state.pending_launch_at = None;
                log::info!("Sending launch key");
                host.press_key(Key::Space);
                self.set_status(host, Status::Launching);
            }
        }

        let pause = host.probe(Control::Pause);
        let start = host.probe(Control::Start);
        match self.classifier.observe(pause.as_ref(), start.as_ref()) {
            RoundPhase::Playing => {}
            RoundPhase::Finished => {
                log::info!("Round finished");
                self.classifier.acknowledge_finish();
                self.state.reset_round(width as f32);
                self.wait_for_round(host, start.as_ref(), width, now_ms);
                return Directive::Continue;
            }
            RoundPhase::AwaitingStart => {
                self.wait_for_round(host, start.as_ref(), width, now_ms);
                return Directive::Continue;
            }
        }

        if self.state.tracking_since.is_none() {
            log::info!("Round in progress");
            self.state.tracking_since = Some(now_ms);
        }

        self.track(host, width, height, now_ms, log_now);
        self.update_counters(host);
        Directive::Continue
    }

    fn canvas_found(&mut self, (width, height): (u32, u32)) {
        log::info!("Canvas found: {}x{}", width, height);
        self.canvas = Some((width, height));
        self.state.scan_x = width as f32 / 2.0;
    }

    /// Game limit or wallet floor reached
    fn stop_condition<H: Host>(&self, host: &mut H, now_ms: f64) -> Option<StopReason> {
        let max = self.config.max_games;
        if max > 0 && self.stats.games >= max && !self.round_in_progress(now_ms) {
            return Some(StopReason::GameLimit(max));
        }

        let floor = self.config.min_balance;
        if floor > 0.0 {
            // An unreadable wallet is unknown, not empty
            let balance = host
                .read_text(Readout::Wallet)
                .as_deref()
                .and_then(parse_balance);
            if let Some(balance) = balance {
                if balance < floor {
                    return Some(StopReason::LowBalance { balance, floor });
                }
            }
        }
        None
    }

    /// The last started round may still be running
    fn round_in_progress(&self, now_ms: f64) -> bool {
        self.state.pending_launch_at.is_some()
            || self.state.tracking_since.is_some()
            || self
                .classifier
                .last_start_at()
                .is_some_and(|t| now_ms - t < self.config.timing.start_cooldown_ms)
    }

    fn under_game_limit(&self) -> bool {
        self.config.max_games == 0 || self.stats.games < self.config.max_games
    }

    fn wait_for_round<H: Host>(&mut self, host: &mut H, start: Option<&ElementView>, width: u32, now_ms: f64) {
        self.phase = PilotPhase::WaitingForRound;

        if self.config.auto_start
            && self.under_game_limit()
            && self.classifier.can_start_game(start, now_ms)
        {
            if host.click(Control::Start) {
                self.classifier.record_start(now_ms);
                self.stats.record_game();
                self.state.reset_round(width as f32);
                self.state.pending_launch_at = Some(now_ms + self.config.timing.launch_delay_ms);

                log::info!("Starting game {}", self.stats.games);
                host.stats_changed(&self.stats);
                self.set_status(host, Status::StartingRound(self.stats.games));
                return;
            }
            log::warn!("Start button could not be clicked");
        }

        self.set_status(host, Status::WaitingForRound);
    }

    fn track<H: Host>(&mut self, host: &mut H, width: u32, height: u32, now_ms: f64, log_now: bool) {
        let timing = self.config.timing;
        let snapshot = host.game_state();

        let sample_due = ControlState::due(self.state.last_sample_at, now_ms, timing.sample_interval_ms);
        let region_due =
            snapshot.is_none() && ControlState::due(self.state.last_region_at, now_ms, timing.region_interval_ms);

        let pixels = if (sample_due && snapshot.is_none()) || region_due {
            host.read_canvas()
        } else {
            None
        };
        let frame = pixels.as_deref().and_then(|data| PixelFrame::new(data, width, height));

        if sample_due {
            self.state.last_sample_at = Some(now_ms);
            let source: Option<&dyn PositionSource> = match (&snapshot, &frame) {
                (Some(state), _) => Some(state),
                (None, Some(frame)) => Some(frame),
                (None, None) => None,
            };
            if let Some(source) = source {
                self.observe_positions(source, now_ms);
            }
        }

        if region_due {
            self.state.last_region_at = Some(now_ms);
            if let Some(x) = frame.as_ref().and_then(detect_brick_target_x) {
                self.state.brick_target_x = Some(x);
            }
        }

        let (w, h) = (width as f32, height as f32);
        let recovery = self.recover(host, snapshot.as_ref(), h, now_ms);

        let (target, status) = if let Some(state) = &snapshot {
            let x = plan_shot(state, w).paddle_x;
            self.phase = PilotPhase::TrackingBall;
            (x, Status::Tracking { x })
        } else if self.ball_in_sight(now_ms) {
            let x = self.aim(w, h, now_ms);
            self.phase = PilotPhase::TrackingBall;
            (x, Status::Tracking { x })
        } else {
            let x = self.advance_scan(w);
            self.phase = PilotPhase::ScanningNoBall;
            (x, Status::Scanning { x })
        };

        host.move_paddle(target);
        if log_now {
            log::debug!("{}", status);
        }

        match recovery {
            Some((phase, status)) => {
                self.phase = phase;
                self.set_status(host, status);
            }
            None => self.set_status(host, status),
        }
    }

    fn observe_positions(&mut self, source: &dyn PositionSource, now_ms: f64) {
        if let Some(span) = source.paddle() {
            self.state.paddle_span = Some(span);
        }

        let Some(sample) = source.ball(now_ms) else {
            return;
        };
        // A ball reappearing after being lost is a new trajectory
        let prev = self.state.curr_ball.filter(|_| self.ball_in_sight(now_ms));
        let moved = prev.is_none_or(|p| {
            (sample.x - p.x).abs() > MOVE_EPSILON || (sample.y - p.y).abs() > MOVE_EPSILON
        });
        if moved {
            self.state.last_moved_at = Some(now_ms);
        }
        self.state.prev_ball = prev;
        self.state.curr_ball = Some(sample);
        self.state.last_seen_at = Some(now_ms);
    }

    /// Seen within the lost timeout
    fn ball_in_sight(&self, now_ms: f64) -> bool {
        self.state.curr_ball.is_some()
            && self
                .state
                .last_seen_at
                .is_some_and(|t| now_ms - t <= self.config.timing.lost_timeout_ms)
    }

    /// Launch a stuck ball, or release a lost or wedged one
    fn recover<H: Host>(
        &mut self,
        host: &mut H,
        snapshot: Option<&GameState>,
        height: f32,
        now_ms: f64,
    ) -> Option<(PilotPhase, Status)> {
        let timing = self.config.timing;

        let stuck = snapshot.is_some_and(|s| s.ball.stuck);
        if stuck {
            let since = *self.state.stuck_since.get_or_insert(now_ms);
            if now_ms - since > timing.stuck_dwell_ms {
                log::info!("Ball stuck for {:.0}ms, launching", now_ms - since);
                host.press_key(Key::Space);
                self.state.stuck_since = None;
                return Some((PilotPhase::BallStuck, Status::Unsticking));
            }
        } else {
            self.state.stuck_since = None;
        }

        // Ball still sits on the paddle until the delayed launch fires
        if self.state.pending_launch_at.is_some() {
            return None;
        }

        let seen_or_started = self.state.last_seen_at.or(self.state.tracking_since);
        let lost = seen_or_started.is_none_or(|t| now_ms - t > timing.lost_timeout_ms);
        let wedged = !lost
            && !stuck
            && self
                .state
                .curr_ball
                .is_some_and(|b| b.y >= height - WEDGE_ZONE)
            && self
                .state
                .last_moved_at
                .is_some_and(|t| now_ms - t > timing.wedged_timeout_ms);

        if !(lost || wedged) || !ControlState::due(self.state.last_rescue_at, now_ms, timing.rescue_cooldown_ms) {
            return None;
        }

        log::info!("Rescuing ball ({})", if lost { "lost" } else { "wedged" });
        host.release_ball();
        self.state.last_rescue_at = Some(now_ms);
        Some((PilotPhase::RescuePending, Status::Rescuing))
    }

    /// Paddle target from the last two pixel samples
    fn aim(&mut self, width: f32, height: f32, now_ms: f64) -> f32 {
        let Some(curr) = self.state.curr_ball else {
            return width / 2.0;
        };
        let paddle_y = height - PADDLE_STRIP_HEIGHT as f32 / 2.0;
        let predicted = match &self.state.prev_ball {
            Some(prev) => predict_ball_x(prev, &curr, paddle_y, width),
            None => fold_between(curr.x, 0.0, width),
        };
        let offset = self.aim_offset(&curr, height, now_ms);
        clamp_finite(predicted + offset, 0.0, width)
    }

    /// Jitter plus brick bias, bounded so the paddle still meets the ball
    fn aim_offset(&mut self, curr: &Sample, height: f32, now_ms: f64) -> f32 {
        let paddle_width = self
            .state
            .paddle_span
            .map_or(DEFAULT_PADDLE_WIDTH, |span| span.width);

        let descending = self.state.prev_ball.is_some_and(|p| curr.y > p.y);
        let jitter = if !descending {
            self.state.jitter = 0.0;
            self.state.last_jitter_at = None;
            0.0
        } else if curr.y < height * JITTER_ZONE_FRACTION
            || !ControlState::due(self.state.last_jitter_at, now_ms, JITTER_REROLL_MS)
        {
            self.state.jitter
        } else {
            let ratio = self.config.jitter_ratio();
            self.state.jitter = if ratio > 0.0 {
                let range = (paddle_width * ratio).max(JITTER_MIN_RANGE);
                self.state.rng.random_range(-range..=range)
            } else {
                0.0
            };
            self.state.last_jitter_at = Some(now_ms);
            self.state.jitter
        };

        let bias = self
            .state
            .brick_target_x
            .map_or(0.0, |bx| (bx - curr.x) * self.config.bias_weight());

        let limit = paddle_width * SAFE_OFFSET_FRACTION;
        (jitter + bias).clamp(-limit, limit)
    }

    /// Sweep the paddle back and forth while the ball is missing
    fn advance_scan(&mut self, width: f32) -> f32 {
        let margin = SCAN_EDGE_MARGIN.min(width / 2.0);
        let state = &mut self.state;
        state.scan_x += self.config.scan_speed * state.scan_dir;

        if state.scan_x >= width - margin {
            state.scan_x = width - margin;
            state.scan_dir = -1.0;
        } else if state.scan_x <= margin {
            state.scan_x = margin;
            state.scan_dir = 1.0;
        }
        state.scan_x
    }

    fn update_counters<H: Host>(&mut self, host: &mut H) {
        let bricks = host.read_text(Readout::Bricks).as_deref().and_then(parse_counter);
        let chests = host.read_text(Readout::Chests).as_deref().and_then(parse_counter);

        let mut changed = false;
        if let Some(n) = bricks {
            changed |= self.stats.observe_bricks(n);
        }
        if let Some(n) = chests {
            changed |= self.stats.observe_chests(n);
        }
        if changed {
            host.stats_changed(&self.stats);
        }
    }

    /// Report only when the status changes
    fn set_status<H: Host>(&mut self, host: &mut H, status: Status) {
        if self.last_status.as_ref() != Some(&status) {
            host.report(&status);
            self.last_status = Some(status);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::fake::FakeHost;
    use crate::settings::Timing;
    use crate::vision::tests::paint_rect;

    const W: u32 = 400;
    const H: u32 = 415;

    fn calm_config() -> PilotConfig {
        PilotConfig {
            jitter_scale: 0,
            brick_bias: 0,
            ..PilotConfig::default()
        }
    }

    fn started(config: PilotConfig, host: &mut FakeHost) -> Pilot {
        let mut pilot = Pilot::new(config, 7);
        pilot.start(host);
        pilot
    }

    /// Mid-gray brick band across rows 20..=60
    fn paint_bricks(host: &mut FakeHost, x0: u32, x1: u32) {
        if let Some(buf) = host.pixels.as_mut() {
            paint_rect(buf, W, (x0, 20), (x1, 60), [120, 120, 120, 255]);
        }
    }

    #[test]
    fn test_stop_is_idempotent() {
        let mut host = FakeHost::waiting(W, H);
        let mut pilot = started(calm_config(), &mut host);
        pilot.frame_scheduled(42);

        assert!(pilot.stop(&mut host, StopReason::User));
        assert!(!pilot.stop(&mut host, StopReason::User));
        assert_eq!(host.cancelled, vec![42]);
        assert_eq!(pilot.phase(), PilotPhase::Idle);
        assert_eq!(pilot.tick(&mut host, 0.0), Directive::Halt);

        let stops = host
            .statuses
            .iter()
            .filter(|s| matches!(s, Status::Stopped(_)))
            .count();
        assert_eq!(stops, 1);
    }

    #[test]
    fn test_start_twice_keeps_session() {
        let mut host = FakeHost::waiting(W, H);
        let mut pilot = started(calm_config(), &mut host);
        pilot.tick(&mut host, 0.0);
        assert_eq!(pilot.stats().games, 1);

        pilot.start(&mut host);
        assert_eq!(pilot.stats().games, 1);
    }

    #[test]
    fn test_auto_start_then_delayed_launch() {
        let mut host = FakeHost::waiting(W, H);
        let mut pilot = started(calm_config(), &mut host);

        assert_eq!(pilot.tick(&mut host, 0.0), Directive::Continue);
        assert_eq!(host.start_clicks, 1);
        assert_eq!(pilot.stats().games, 1);
        assert_eq!(host.last_status(), Some(&Status::StartingRound(1)));
        assert!(host.keys.is_empty());

        pilot.tick(&mut host, 1000.0);
        assert!(host.keys.is_empty());
        pilot.tick(&mut host, 1500.0);
        assert_eq!(host.keys, vec![Key::Space]);

        // Start still showing, but the cooldown holds
        pilot.tick(&mut host, 2999.0);
        assert_eq!(host.start_clicks, 1);
        pilot.tick(&mut host, 3000.0);
        assert_eq!(host.start_clicks, 2);
        assert_eq!(pilot.stats().games, 2);
    }

    #[test]
    fn test_new_start_cooldown_applies_immediately() {
        let mut host = FakeHost::waiting(W, H);
        let mut pilot = started(calm_config(), &mut host);

        pilot.tick(&mut host, 0.0);
        assert_eq!(host.start_clicks, 1);

        pilot.set_config(PilotConfig {
            timing: Timing {
                start_cooldown_ms: 500.0,
                ..Timing::default()
            },
            ..calm_config()
        });
        pilot.tick(&mut host, 2000.0);
        assert_eq!(host.start_clicks, 2);
    }

    #[test]
    fn test_no_auto_start_when_disabled() {
        let mut host = FakeHost::waiting(W, H);
        let config = PilotConfig {
            auto_start: false,
            ..calm_config()
        };
        let mut pilot = started(config, &mut host);

        pilot.tick(&mut host, 0.0);
        pilot.tick(&mut host, 5000.0);
        assert_eq!(host.start_clicks, 0);
        assert_eq!(pilot.phase(), PilotPhase::WaitingForRound);
        assert_eq!(host.last_status(), Some(&Status::WaitingForRound));
    }

    #[test]
    fn test_no_rescue_before_delayed_launch() {
        let mut host = FakeHost::waiting(W, H);
        let mut pilot = started(calm_config(), &mut host);

        pilot.tick(&mut host, 0.0);
        assert_eq!(host.start_clicks, 1);
        host.set_playing(true);

        // No ball in sight for over the lost timeout, but it has not launched yet
        pilot.tick(&mut host, 100.0);
        pilot.tick(&mut host, 1200.0);
        assert_eq!(host.releases, 0);
        assert!(host.keys.is_empty());
        assert_ne!(pilot.phase(), PilotPhase::RescuePending);

        pilot.tick(&mut host, 1500.0);
        assert_eq!(host.keys, vec![Key::Space]);
    }

    #[test]
    fn test_missing_canvas_keeps_retrying() {
        let mut host = FakeHost::waiting(W, H);
        host.canvas = None;
        let mut pilot = started(calm_config(), &mut host);

        assert_eq!(pilot.tick(&mut host, 0.0), Directive::Continue);
        assert_eq!(pilot.tick(&mut host, 16.0), Directive::Continue);
        assert_eq!(host.last_status(), Some(&Status::WaitingForCanvas));
        assert_eq!(host.start_clicks, 0);
        assert!(host.moves.is_empty());

        host.canvas = Some((W, H));
        pilot.tick(&mut host, 32.0);
        assert_eq!(host.start_clicks, 1);
    }

    #[test]
    fn test_rescue_lost_ball_once_per_cooldown() {
        let mut host = FakeHost::playing(W, H);
        let mut pilot = started(calm_config(), &mut host);

        pilot.tick(&mut host, 0.0);
        pilot.tick(&mut host, 1000.0);
        assert_eq!(host.releases, 0);

        pilot.tick(&mut host, 1001.0);
        assert_eq!(host.releases, 1);
        assert_eq!(pilot.phase(), PilotPhase::RescuePending);
        assert_eq!(host.last_status(), Some(&Status::Rescuing));

        pilot.tick(&mut host, 1101.0);
        assert_eq!(host.releases, 1);
        pilot.tick(&mut host, 2500.0);
        assert_eq!(host.releases, 1);
        pilot.tick(&mut host, 2501.0);
        assert_eq!(host.releases, 2);
    }

    #[test]
    fn test_rescue_wedged_ball() {
        let mut host = FakeHost::playing(W, H);
        host.draw_ball(200, H - 40);
        let mut pilot = started(calm_config(), &mut host);

        pilot.tick(&mut host, 0.0);
        pilot.tick(&mut host, 100.0);
        pilot.tick(&mut host, 900.0);
        assert_eq!(host.releases, 0);

        pilot.tick(&mut host, 1000.0);
        assert_eq!(host.releases, 1);
    }

    #[test]
    fn test_moving_ball_is_not_wedged() {
        let mut host = FakeHost::playing(W, H);
        let mut pilot = started(calm_config(), &mut host);

        for (i, t) in [0.0, 400.0, 800.0, 1200.0].into_iter().enumerate() {
            host.draw_ball(100 + 20 * i as u32, H - 40);
            pilot.tick(&mut host, t);
        }
        assert_eq!(host.releases, 0);
        assert_eq!(pilot.phase(), PilotPhase::TrackingBall);
    }

    #[test]
    fn test_scan_sweeps_and_reverses() {
        let mut host = FakeHost::playing(W, H);
        let mut pilot = started(calm_config(), &mut host);

        for i in 0..18 {
            pilot.tick(&mut host, i as f64 * 16.0);
        }
        assert_eq!(pilot.phase(), PilotPhase::ScanningNoBall);
        assert_eq!(host.moves[0], 208.0);
        assert_eq!(host.moves.last().copied(), Some(340.0));

        pilot.tick(&mut host, 18.0 * 16.0);
        assert_eq!(host.moves.last().copied(), Some(332.0));
        assert_eq!(host.last_status(), Some(&Status::Scanning { x: 332.0 }));
    }

    #[test]
    fn test_tracks_predicted_intercept() {
        let mut host = FakeHost::playing(W, H);
        let mut pilot = started(calm_config(), &mut host);

        host.draw_ball(100, 50);
        pilot.tick(&mut host, 0.0);
        assert_eq!(host.moves.last().copied(), Some(100.0));

        // Paddle line at 400 (strip center), bounces off the right wall
        host.draw_ball(110, 60);
        pilot.tick(&mut host, 100.0);
        let x = host.moves.last().copied().unwrap();
        assert!((x - 350.0).abs() < 1e-3, "got {x}");
        assert_eq!(pilot.phase(), PilotPhase::TrackingBall);
    }

    #[test]
    fn test_sampling_is_throttled() {
        let mut host = FakeHost::playing(W, H);
        let mut pilot = started(calm_config(), &mut host);

        pilot.tick(&mut host, 0.0);
        pilot.tick(&mut host, 16.0);
        pilot.tick(&mut host, 32.0);
        assert_eq!(host.canvas_reads, 1);
        pilot.tick(&mut host, 80.0);
        assert_eq!(host.canvas_reads, 2);
        assert_eq!(host.moves.len(), 4);
    }

    #[test]
    fn test_jitter_stays_within_safe_offset() {
        let mut host = FakeHost::playing(W, H);
        let config = PilotConfig {
            jitter_scale: 100,
            brick_bias: 0,
            ..PilotConfig::default()
        };
        let mut pilot = started(config, &mut host);

        // Descending through the lower part of the canvas
        for (i, y) in [260u32, 280, 300, 320, 340].into_iter().enumerate() {
            host.draw_ball(200, y);
            pilot.tick(&mut host, i as f64 * 300.0);
            let x = host.moves.last().copied().unwrap();
            let limit = DEFAULT_PADDLE_WIDTH * SAFE_OFFSET_FRACTION;
            assert!((x - 200.0).abs() <= limit + 1e-3, "offset too large: {x}");
        }
    }

    #[test]
    fn test_brick_bias_pulls_toward_region() {
        let mut host = FakeHost::playing(W, H);
        let config = PilotConfig {
            jitter_scale: 0,
            brick_bias: 30,
            ..PilotConfig::default()
        };
        let mut pilot = started(config, &mut host);

        host.draw_ball(200, 200);
        paint_bricks(&mut host, 300, 380);
        pilot.tick(&mut host, 0.0);
        assert_eq!(pilot.state().brick_target_x, Some(340.0));
        // 30% of the way from the ball toward the bricks
        let x = host.moves.last().copied().unwrap();
        assert!((x - 242.0).abs() < 1e-3, "got {x}");

        // Region is only re-read every 800ms
        host.draw_ball(200, 220);
        paint_bricks(&mut host, 20, 100);
        pilot.tick(&mut host, 400.0);
        assert_eq!(pilot.state().brick_target_x, Some(340.0));
        let x = host.moves.last().copied().unwrap();
        assert!((x - 242.0).abs() < 1e-3, "got {x}");

        host.draw_ball(200, 240);
        paint_bricks(&mut host, 20, 100);
        pilot.tick(&mut host, 800.0);
        assert_eq!(pilot.state().brick_target_x, Some(60.0));
        let x = host.moves.last().copied().unwrap();
        assert!((x - 158.0).abs() < 1e-3, "got {x}");
    }

    #[test]
    fn test_brick_bias_is_bounded() {
        let mut host = FakeHost::playing(W, H);
        let config = PilotConfig {
            jitter_scale: 0,
            brick_bias: 100,
            ..PilotConfig::default()
        };
        let mut pilot = started(config, &mut host);

        host.draw_ball(200, 200);
        paint_bricks(&mut host, 300, 380);
        pilot.tick(&mut host, 0.0);
        let x = host.moves.last().copied().unwrap();
        let limit = DEFAULT_PADDLE_WIDTH * SAFE_OFFSET_FRACTION;
        assert!((x - (200.0 + limit)).abs() < 1e-3, "got {x}");
    }

    #[test]
    fn test_authoritative_state_steers_paddle() {
        let state = GameState::from_json(
            r#"{
                "ball": {"x": 150, "y": 200, "vx": 1.5, "vy": 3, "r": 6, "stuck": false},
                "paddle": {"x": 160, "w": 80, "y": 380},
                "bricks": [
                    {"idx": 0, "x": 40, "y": 40, "w": 40, "h": 12, "t": "normal"},
                    {"idx": 1, "x": 300, "y": 60, "w": 40, "h": 12, "t": "key"}
                ],
                "keys": 0
            }"#,
        )
        .unwrap();
        let expected = plan_shot(&state, W as f32).paddle_x;

        let mut host = FakeHost::playing(W, H);
        host.state = Some(state);
        let mut pilot = started(calm_config(), &mut host);

        pilot.tick(&mut host, 0.0);
        assert_eq!(host.moves.last().copied(), Some(expected));
        assert_eq!(host.canvas_reads, 0);
        assert_eq!(pilot.state().curr_ball.map(|b| b.x), Some(150.0));
    }

    #[test]
    fn test_stuck_ball_launched_after_dwell() {
        let state = GameState::from_json(
            r#"{
                "ball": {"x": 200, "y": 370, "vx": 0, "vy": 0, "stuck": true},
                "paddle": {"x": 160, "w": 80, "y": 380}
            }"#,
        )
        .unwrap();
        let mut host = FakeHost::playing(W, H);
        host.state = Some(state);
        let mut pilot = started(calm_config(), &mut host);

        for t in [0.0, 1000.0, 2000.0] {
            pilot.tick(&mut host, t);
        }
        assert!(host.keys.is_empty());
        assert_eq!(host.releases, 0);

        pilot.tick(&mut host, 2001.0);
        assert_eq!(host.keys, vec![Key::Space]);
        assert_eq!(pilot.phase(), PilotPhase::BallStuck);

        // Dwell timer restarts after a launch
        pilot.tick(&mut host, 2100.0);
        assert_eq!(host.keys.len(), 1);
    }

    #[test]
    fn test_stops_at_game_limit_after_round() {
        let mut host = FakeHost::waiting(W, H);
        let config = PilotConfig {
            max_games: 1,
            ..calm_config()
        };
        let mut pilot = started(config, &mut host);

        pilot.tick(&mut host, 0.0);
        assert_eq!(host.start_clicks, 1);

        host.set_playing(true);
        assert_eq!(pilot.tick(&mut host, 100.0), Directive::Continue);
        assert_eq!(pilot.tick(&mut host, 2000.0), Directive::Continue);

        host.set_playing(false);
        assert_eq!(pilot.tick(&mut host, 5000.0), Directive::Continue);
        assert_eq!(host.start_clicks, 1);

        assert_eq!(pilot.tick(&mut host, 5016.0), Directive::Halt);
        assert!(!pilot.is_running());
        assert_eq!(
            host.last_status(),
            Some(&Status::Stopped(StopReason::GameLimit(1)))
        );
    }

    #[test]
    fn test_stops_below_wallet_floor() {
        let mut host = FakeHost::playing(W, H);
        let config = PilotConfig {
            min_balance: 100.0,
            ..calm_config()
        };
        let mut pilot = started(config, &mut host);

        // Unreadable wallet keeps going
        assert_eq!(pilot.tick(&mut host, 0.0), Directive::Continue);

        host.texts.insert(Readout::Wallet, "Balance: 42".into());
        assert_eq!(pilot.tick(&mut host, 16.0), Directive::Halt);
        assert_eq!(
            host.last_status(),
            Some(&Status::Stopped(StopReason::LowBalance {
                balance: 42.0,
                floor: 100.0
            }))
        );
    }

    #[test]
    fn test_counters_are_monotonic() {
        let mut host = FakeHost::playing(W, H);
        let mut pilot = started(calm_config(), &mut host);

        for (t, bricks) in [(0.0, "5"), (16.0, "3"), (32.0, "7")] {
            host.texts.insert(Readout::Bricks, bricks.into());
            pilot.tick(&mut host, t);
        }
        host.texts.insert(Readout::Chests, "2".into());
        pilot.tick(&mut host, 48.0);

        assert_eq!(pilot.stats().bricks, 7);
        assert_eq!(pilot.stats().chests, 2);
        assert_eq!(host.stats, Some(*pilot.stats()));
    }

    #[test]
    fn test_custom_timing_is_honored() {
        let mut host = FakeHost::playing(W, H);
        let config = PilotConfig {
            timing: Timing {
                lost_timeout_ms: 300.0,
                ..Timing::default()
            },
            ..calm_config()
        };
        let mut pilot = started(config, &mut host);

        pilot.tick(&mut host, 0.0);
        pilot.tick(&mut host, 301.0);
        assert_eq!(host.releases, 1);
    }
}
