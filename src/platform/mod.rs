//! Platform abstraction layer
//!
//! The control loop only talks to the page through these traits:
//! - Canvas pixels and control probing (`Page`)
//! - Synthetic input (`InputSynth`)
//! - Status notifications (`StatusSink`)
//! - Frame cancellation (`Host`)
//!
//! `web` binds them to the DOM on wasm32; tests use a scripted fake.

use crate::classify::ElementView;
use crate::input::InputSynth;
use crate::pilot::{Pilot, Status, StopReason};
use crate::settings::PilotConfig;
use crate::sim::GameState;
use crate::stats::SessionStats;

#[cfg(test)]
pub(crate) mod fake;
#[cfg(target_arch = "wasm32")]
pub mod web;

/// Handle of a scheduled animation frame
pub type FrameId = i32;

/// Page controls the loop presses or inspects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Control {
    Start,
    Pause,
}

/// Numeric displays the loop reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Readout {
    Bricks,
    Chests,
    Wallet,
}

/// Read access to the host page. Every lookup may fail transiently; a
/// `None` means "not there this frame", never an error.
pub trait Page {
    /// Intrinsic canvas size, locating the canvas first if needed
    fn canvas_size(&mut self) -> Option<(u32, u32)>;
    /// Full RGBA bitmap of the canvas, row-major
    fn read_canvas(&mut self) -> Option<Vec<u8>>;
    /// Visibility snapshot of a control
    fn probe(&mut self, control: Control) -> Option<ElementView>;
    /// Click a control; false if it could not be found
    fn click(&mut self, control: Control) -> bool;
    /// Text content of a numeric display
    fn read_text(&mut self, readout: Readout) -> Option<String>;
    /// Authoritative game state, when the page exposes one
    fn game_state(&mut self) -> Option<GameState>;
}

/// Where status changes go (panel, console, nothing)
pub trait StatusSink {
    fn report(&mut self, status: &Status);
    fn stats_changed(&mut self, _stats: &SessionStats) {}
}

/// Everything the control loop needs from its environment
pub trait Host: Page + InputSynth + StatusSink {
    /// Cancel a frame previously handed to the loop
    fn cancel_frame(&mut self, id: FrameId);
}

/// A status or stats notification rendered for the page
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    Status(String),
    /// Session stats as JSON
    Stats(String),
}

/// Notifications held until the pilot is no longer borrowed, so page
/// listeners can call back into the exports
#[derive(Debug, Default)]
pub struct Outbox(Vec<Notice>);

impl Outbox {
    pub fn drain(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.0)
    }
}

impl StatusSink for Outbox {
    fn report(&mut self, status: &Status) {
        self.0.push(Notice::Status(status.to_string()));
    }

    fn stats_changed(&mut self, stats: &SessionStats) {
        match serde_json::to_string(stats) {
            Ok(json) => self.0.push(Notice::Stats(json)),
            Err(e) => log::debug!("Stats not serializable: {}", e),
        }
    }
}

/// Control calls that arrived while the pilot was busy
#[derive(Debug, Default)]
pub struct Requests {
    stop: bool,
    config: Option<PilotConfig>,
}

impl Requests {
    pub fn request_stop(&mut self) {
        self.stop = true;
    }

    pub fn request_config(&mut self, config: PilotConfig) {
        self.config = Some(config);
    }

    pub fn is_empty(&self) -> bool {
        !self.stop && self.config.is_none()
    }

    /// Apply and clear everything queued. Returns the config that was
    /// applied so the host can follow it.
    pub fn apply<H: Host>(&mut self, pilot: &mut Pilot, host: &mut H) -> Option<PilotConfig> {
        let config = self.config.take();
        if let Some(config) = &config {
            pilot.set_config(config.clone());
        }
        if std::mem::take(&mut self.stop) {
            pilot.stop(host, StopReason::User);
        }
        config
    }
}
