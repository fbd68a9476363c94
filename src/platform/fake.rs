//! Scripted host for driving the control loop in tests

use std::collections::HashMap;

use super::{Control, FrameId, Host, Page, Readout, StatusSink};
use crate::classify::ElementView;
use crate::input::{InputSynth, Key};
use crate::pilot::Status;
use crate::sim::GameState;
use crate::stats::SessionStats;
use crate::vision::tests::{canvas, paint_rect};

const VIEWPORT: (f64, f64) = (1280.0, 720.0);

#[derive(Debug, Default)]
pub(crate) struct FakeHost {
    pub canvas: Option<(u32, u32)>,
    pub pixels: Option<Vec<u8>>,
    pub pause: Option<ElementView>,
    pub start: Option<ElementView>,
    pub texts: HashMap<Readout, String>,
    pub state: Option<GameState>,

    pub start_clicks: usize,
    pub canvas_reads: usize,
    pub moves: Vec<f32>,
    pub keys: Vec<Key>,
    pub releases: usize,
    pub cancelled: Vec<FrameId>,
    pub statuses: Vec<Status>,
    pub stats: Option<SessionStats>,
}

pub(crate) fn shown() -> ElementView {
    ElementView::shown((100.0, 600.0, 80.0, 30.0), VIEWPORT)
}

pub(crate) fn hidden() -> ElementView {
    ElementView {
        display: "none".into(),
        ..shown()
    }
}

impl FakeHost {
    /// Blank canvas with the start button up, no round running
    pub fn waiting(width: u32, height: u32) -> Self {
        Self {
            canvas: Some((width, height)),
            pixels: Some(canvas(width, height)),
            pause: Some(hidden()),
            start: Some(shown()),
            ..Self::default()
        }
    }

    /// Blank canvas with a round in progress
    pub fn playing(width: u32, height: u32) -> Self {
        let mut host = Self::waiting(width, height);
        host.set_playing(true);
        host
    }

    pub fn set_playing(&mut self, playing: bool) {
        if playing {
            self.pause = Some(shown());
            self.start = Some(hidden());
        } else {
            self.pause = Some(hidden());
            self.start = Some(shown());
        }
    }

    /// Redraw the canvas with a 5x5 white ball centered on (x, y)
    pub fn draw_ball(&mut self, x: u32, y: u32) {
        let (w, h) = self.canvas.unwrap_or((0, 0));
        let mut buf = canvas(w, h);
        paint_rect(&mut buf, w, (x - 2, y - 2), (x + 2, y + 2), [255, 255, 255, 255]);
        self.pixels = Some(buf);
    }

    pub fn last_status(&self) -> Option<&Status> {
        self.statuses.last()
    }
}

impl Page for FakeHost {
    fn canvas_size(&mut self) -> Option<(u32, u32)> {
        self.canvas
    }

    fn read_canvas(&mut self) -> Option<Vec<u8>> {
        self.canvas_reads += 1;
        self.pixels.clone()
    }

    fn probe(&mut self, control: Control) -> Option<ElementView> {
        match control {
            Control::Start => self.start.clone(),
            Control::Pause => self.pause.clone(),
        }
    }

    fn click(&mut self, control: Control) -> bool {
        match control {
            Control::Start if self.start.is_some() => {
                self.start_clicks += 1;
                true
            }
            Control::Pause if self.pause.is_some() => true,
            _ => false,
        }
    }

    fn read_text(&mut self, readout: Readout) -> Option<String> {
        self.texts.get(&readout).cloned()
    }

    fn game_state(&mut self) -> Option<GameState> {
        self.state.clone()
    }
}

impl InputSynth for FakeHost {
    fn move_paddle(&mut self, target_x: f32) {
        self.moves.push(target_x);
    }

    fn press_key(&mut self, key: Key) {
        self.keys.push(key);
    }

    fn release_ball(&mut self) {
        self.releases += 1;
    }
}

impl StatusSink for FakeHost {
    fn report(&mut self, status: &Status) {
        self.statuses.push(status.clone());
    }

    fn stats_changed(&mut self, stats: &SessionStats) {
        self.stats = Some(*stats);
    }
}

impl Host for FakeHost {
    fn cancel_frame(&mut self, id: FrameId) {
        self.cancelled.push(id);
    }
}
