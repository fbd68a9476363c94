//! The per-frame control loop
//!
//! One `Pilot` owns all temporal bookkeeping. The host calls `tick` once
//! per animation frame and re-schedules only while it returns
//! `Directive::Continue`, so the loop is single-threaded and never re-enters.

pub mod state;
pub mod tick;

use std::fmt;

pub use state::{ControlState, PilotPhase};
pub use tick::Pilot;

/// What the host should do after a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    /// Schedule another frame
    Continue,
    /// The loop has stopped; do not schedule
    Halt,
}

/// Why the loop stopped
#[derive(Debug, Clone, PartialEq)]
pub enum StopReason {
    /// Explicit stop from the user or panel
    User,
    /// Configured number of games played
    GameLimit(u32),
    /// Wallet below the configured floor
    LowBalance { balance: f64, floor: f64 },
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::User => write!(f, "stopped by user"),
            StopReason::GameLimit(n) => write!(f, "completed {} games", n),
            StopReason::LowBalance { balance, floor } => {
                write!(f, "balance {:.0} below floor {:.0}", balance, floor)
            }
        }
    }
}

/// Human-readable loop status, forwarded to whatever panel is listening
#[derive(Debug, Clone, PartialEq)]
pub enum Status {
    WaitingForCanvas,
    WaitingForRound,
    /// Start clicked; carries the game number
    StartingRound(u32),
    /// Delayed launch key sent
    Launching,
    Tracking { x: f32 },
    Scanning { x: f32 },
    /// Stuck ball launched
    Unsticking,
    /// Lost or wedged ball released
    Rescuing,
    Stopped(StopReason),
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::WaitingForCanvas => write!(f, "Waiting for canvas..."),
            Status::WaitingForRound => write!(f, "Waiting for game..."),
            Status::StartingRound(n) => write!(f, "Starting game {}...", n),
            Status::Launching => write!(f, "Launching ball"),
            Status::Tracking { x } => write!(f, "Tracking ball X:{}", x.round()),
            Status::Scanning { x } => write!(f, "Scanning X:{}", x.round()),
            Status::Unsticking => write!(f, "Launching stuck ball"),
            Status::Rescuing => write!(f, "Rescuing ball"),
            Status::Stopped(reason) => write!(f, "Stopped: {}", reason),
        }
    }
}
