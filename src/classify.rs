//! Play-state classification from the page's start/pause controls
//!
//! The page never tells us whether a round is running, so we infer it from
//! which controls a player could actually see and press.

use serde::{Deserialize, Serialize};

/// Minimum time between start clicks (ms) unless configured otherwise
pub const DEFAULT_START_COOLDOWN_MS: f64 = 3000.0;

/// Snapshot of everything that decides whether an element is visible
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementView {
    /// Computed `display`
    pub display: String,
    /// Computed `visibility`
    pub visibility: String,
    /// Computed `opacity`
    pub opacity: f64,
    /// Computed `pointer-events`
    pub pointer_events: String,
    /// Bounding client rect: left, top, width, height
    pub rect: (f64, f64, f64, f64),
    /// Viewport size: inner width, inner height
    pub viewport: (f64, f64),
    /// `disabled` property (buttons)
    pub disabled: bool,
}

impl ElementView {
    /// A plainly visible, enabled element at `rect`
    pub fn shown(rect: (f64, f64, f64, f64), viewport: (f64, f64)) -> Self {
        Self {
            display: "block".into(),
            visibility: "visible".into(),
            opacity: 1.0,
            pointer_events: "auto".into(),
            rect,
            viewport,
            disabled: false,
        }
    }

    /// Visible to, and clickable by, a real user
    pub fn is_visible(&self) -> bool {
        if self.display == "none" || self.visibility == "hidden" {
            return false;
        }
        let (left, top, width, height) = self.rect;
        if width == 0.0 || height == 0.0 {
            return false;
        }
        if self.opacity == 0.0 {
            return false;
        }
        let (inner_w, inner_h) = self.viewport;
        let in_viewport = left + width > 0.0 && top + height > 0.0 && left < inner_w && top < inner_h;
        if !in_viewport {
            return false;
        }
        self.pointer_events != "none"
    }
}

/// Visible helper that treats a missing element as invisible
#[inline]
pub fn is_visible(el: Option<&ElementView>) -> bool {
    el.is_some_and(ElementView::is_visible)
}

/// Where the page is in its round lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundPhase {
    AwaitingStart,
    Playing,
    /// Was playing since the last start, now is not
    Finished,
}

/// Classifies page state and remembers when we last pressed start
#[derive(Debug, Clone)]
pub struct PlayStateClassifier {
    start_cooldown_ms: f64,
    last_start_at: Option<f64>,
    saw_playing: bool,
}

impl Default for PlayStateClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_START_COOLDOWN_MS)
    }
}

impl PlayStateClassifier {
    pub fn new(start_cooldown_ms: f64) -> Self {
        Self {
            start_cooldown_ms,
            last_start_at: None,
            saw_playing: false,
        }
    }

    /// Pause is visible and start is either hidden or disabled.
    ///
    /// Both halves matter: some page states hide start while playing, others
    /// leave it on screen but disabled.
    pub fn is_game_playing(pause: Option<&ElementView>, start: Option<&ElementView>) -> bool {
        let pause_visible = is_visible(pause);
        let start_visible = is_visible(start);
        let start_disabled = start.is_some_and(|s| s.disabled);
        pause_visible && (!start_visible || start_disabled)
    }

    /// Start is pressable and the cooldown since our last click has passed
    pub fn can_start_game(&self, start: Option<&ElementView>, now_ms: f64) -> bool {
        if let Some(last) = self.last_start_at {
            if now_ms - last < self.start_cooldown_ms {
                return false;
            }
        }
        start.is_some_and(|s| !s.disabled && s.is_visible())
    }

    /// A round we saw running has ended
    pub fn is_game_finished(&self, pause: Option<&ElementView>, start: Option<&ElementView>) -> bool {
        self.saw_playing && !Self::is_game_playing(pause, start)
    }

    /// Classify and update the seen-playing latch
    pub fn observe(&mut self, pause: Option<&ElementView>, start: Option<&ElementView>) -> RoundPhase {
        if Self::is_game_playing(pause, start) {
            self.saw_playing = true;
            RoundPhase::Playing
        } else if self.saw_playing {
            RoundPhase::Finished
        } else {
            RoundPhase::AwaitingStart
        }
    }

    /// Forget the finished round so the next one can be detected
    pub fn acknowledge_finish(&mut self) {
        self.saw_playing = false;
    }

    /// Record a start click
    pub fn record_start(&mut self, now_ms: f64) {
        self.last_start_at = Some(now_ms);
        self.saw_playing = false;
    }

    pub fn last_start_at(&self) -> Option<f64> {
        self.last_start_at
    }

    /// Change the cooldown without forgetting the last click
    pub fn set_start_cooldown(&mut self, start_cooldown_ms: f64) {
        self.start_cooldown_ms = start_cooldown_ms;
    }
}
